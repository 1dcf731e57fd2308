use crate::codec::DatReader;
use crate::error::{Error, Result};
use crate::ident::ModIdent;
use crate::property_tree::PropertyTree;
use crate::version::Version;
use flate2::read::ZlibDecoder;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// The parts of a save file the manager cares about: the mod set it was
/// created with and the startup settings embedded in its header.
#[derive(Debug)]
pub struct SaveFile {
    pub map_version: Version,
    pub mods: Vec<ModIdent>,
    pub startup_settings: PropertyTree,
}

impl SaveFile {
    pub fn read(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Locates `level.dat` or `level.dat0` inside the zip container (matched
    /// by basename, ignoring directory prefixes) and parses the header.
    /// `level.dat0` content is zlib-compressed and is inflated first.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let mut found: Option<(String, bool)> = None;
        for name in archive.file_names() {
            let basename = name.rsplit('/').next().unwrap_or(name);
            match basename {
                "level.dat" => {
                    found = Some((name.to_string(), false));
                    break;
                }
                "level.dat0" => {
                    found = Some((name.to_string(), true));
                    break;
                }
                _ => {}
            }
        }
        let (entry_name, compressed) = found.ok_or(Error::MissingLevelData)?;

        let mut entry = archive.by_name(&entry_name)?;
        let mut bytes = Vec::new();
        if compressed {
            ZlibDecoder::new(&mut entry).read_to_end(&mut bytes)?;
        } else {
            entry.read_to_end(&mut bytes)?;
        }

        Self::parse_level_data(&bytes)
    }

    /// Parses the fixed header sequence. Every field before the mod list is
    /// consumed only to advance the cursor; any failure is fatal to the call.
    pub fn parse_level_data(bytes: &[u8]) -> Result<Self> {
        let mut r = DatReader::new(bytes);

        let map_version = r.read_version_unoptimized()?;
        r.read_u8()?; // branch version
        r.read_string()?; // campaign name
        r.read_string()?; // level name
        r.read_string()?; // source mod name
        r.read_u8()?; // difficulty
        r.read_bool()?; // finished
        r.read_bool()?; // player won
        r.read_string()?; // next level
        r.read_bool()?; // can continue
        r.read_bool()?; // finished but continuing
        r.read_bool()?; // saving replay
        r.read_bool()?; // allow non-admin debug options
        r.read_version_optimized(true)?; // scenario version
        r.read_u8()?; // scenario branch version
        r.read_u8()?; // allowed commands

        let mod_count = r.read_u16_optimized()?;
        let mut mods = Vec::with_capacity(mod_count as usize);
        for _ in 0..mod_count {
            mods.push(r.read_mod_with_crc()?);
        }

        r.read_u32()?; // startup settings CRC
        let startup_settings = PropertyTree::read(&mut r)?;

        Ok(Self {
            map_version,
            mods,
            startup_settings,
        })
    }
}
