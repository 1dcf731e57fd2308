use crate::codec::{DatReader, DatWriter};
use crate::error::{Error, Result};
use crate::version::Version;
use std::collections::HashMap;

/// The game's generic typed binary tree, used for the startup settings
/// embedded in save files and for the standalone `mod-settings.dat`.
///
/// Strings carry an empty flag on the wire, so the `String` variant keeps the
/// `Option` to re-encode absent strings bit-exactly. Dictionary keys are
/// unique; key order is not preserved across a round trip, only content.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyTree {
    None,
    Bool(bool),
    Number(f64),
    String(Option<String>),
    List(Vec<PropertyTree>),
    Dict(HashMap<String, PropertyTree>),
}

impl PropertyTree {
    /// Decodes one tree: a type tag, a discarded internal flag byte, then the
    /// tag-specific payload.
    pub fn read(r: &mut DatReader) -> Result<Self> {
        let tag = r.read_u8()?;
        r.skip(1)?; // internal flag, a format artifact
        match tag {
            0 => Ok(Self::None),
            1 => Ok(Self::Bool(r.read_bool()?)),
            2 => Ok(Self::Number(r.read_f64()?)),
            3 => Ok(Self::String(r.read_optional_string()?)),
            4 => {
                let len = r.read_u32()?;
                let mut list = Vec::with_capacity(len.min(1024) as usize);
                for _ in 0..len {
                    // Lists carry an (always empty) key before each child.
                    r.read_optional_string()?;
                    list.push(Self::read(r)?);
                }
                Ok(Self::List(list))
            }
            5 => {
                let len = r.read_u32()?;
                let mut dict = HashMap::with_capacity(len.min(1024) as usize);
                for _ in 0..len {
                    let key = r
                        .read_optional_string()?
                        .ok_or(Error::MalformedSettings("dictionary key is missing"))?;
                    dict.insert(key, Self::read(r)?);
                }
                Ok(Self::Dict(dict))
            }
            tag => Err(Error::UnknownPropertyTreeTag(tag)),
        }
    }

    /// Structural inverse of [`PropertyTree::read`]. Always emits zero for
    /// the internal flag and an empty key before each list child.
    pub fn write(&self, w: &mut DatWriter) {
        match self {
            Self::None => {
                w.write_u8(0);
                w.write_u8(0);
            }
            Self::Bool(value) => {
                w.write_u8(1);
                w.write_u8(0);
                w.write_bool(*value);
            }
            Self::Number(value) => {
                w.write_u8(2);
                w.write_u8(0);
                w.write_f64(*value);
            }
            Self::String(value) => {
                w.write_u8(3);
                w.write_u8(0);
                w.write_optional_string(value.as_deref());
            }
            Self::List(list) => {
                w.write_u8(4);
                w.write_u8(0);
                w.write_u32(list.len() as u32);
                for item in list {
                    w.write_optional_string(None);
                    item.write(w);
                }
            }
            Self::Dict(dict) => {
                w.write_u8(5);
                w.write_u8(0);
                w.write_u32(dict.len() as u32);
                for (key, value) in dict {
                    w.write_optional_string(Some(key));
                    value.write(w);
                }
            }
        }
    }

    pub fn as_dict(&self) -> Option<&HashMap<String, PropertyTree>> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut HashMap<String, PropertyTree>> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyTree> {
        self.as_dict().and_then(|dict| dict.get(key))
    }
}

/// The full persisted settings document: the writing game version plus one
/// settings tree, conventionally a dict with `startup`, `runtime-global`,
/// and `runtime-per-user` sub-dicts. Rewritten in full on save.
#[derive(Debug, Clone)]
pub struct ModSettings {
    pub map_version: Version,
    pub tree: PropertyTree,
}

impl ModSettings {
    /// An empty settings document for the given game version, with the three
    /// standard top-level dicts present but empty.
    pub fn empty(map_version: Version) -> Self {
        let mut tree = HashMap::new();
        for key in ["startup", "runtime-global", "runtime-per-user"] {
            tree.insert(key.to_string(), PropertyTree::Dict(HashMap::new()));
        }
        Self {
            map_version,
            tree: PropertyTree::Dict(tree),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = DatReader::new(bytes);
        let map_version = r.read_version_unoptimized()?;
        r.read_bool()?; // always-false flag
        let tree = PropertyTree::read(&mut r)?;
        Ok(Self { map_version, tree })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = DatWriter::new();
        w.write_version_unoptimized(&self.map_version);
        w.write_bool(false);
        self.tree.write(&mut w);
        w.into_bytes()
    }
}
