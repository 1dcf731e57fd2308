use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the core: codec, index, and manager operations.
///
/// Codec and index errors always propagate to the caller, since they indicate
/// corrupt or unreadable on-disk state. Per-dependency resolution failures
/// during expansion are collected instead (see `resolver`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid version format: {0:?}")]
    InvalidVersionFormat(String),
    #[error("input ended before the expected data")]
    TruncatedInput,
    #[error("unknown property tree tag: {0}")]
    UnknownPropertyTreeTag(u8),
    #[error("save file does not contain level.dat or level.dat0")]
    MissingLevelData,
    #[error("release filename does not match its info.json: {0}")]
    InvalidReleaseFilename(String),
    #[error("mod was not found in the local mods directory: {0}")]
    ModNotFoundLocal(String),
    #[error("no compatible release was found for {0}")]
    NoCompatibleRelease(String),
    #[error("mod is already disabled: {0}")]
    ModAlreadyDisabled(String),
    #[error("invalid game directory: {}", .0.display())]
    InvalidGameDirectory(PathBuf),
    #[error("{0} was not found on the mod portal")]
    ModNotFoundPortal(String),
    #[error("malformed mod settings: {0}")]
    MalformedSettings(&'static str),
    #[error("boolean field is neither 0 nor 1: {0}")]
    InvalidBool(u8),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("mod portal request failed: {0}")]
    Portal(#[from] Box<ureq::Error>),
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Error::Portal(Box::new(err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
