//! # Error taxonomy
//!
//! One `thiserror` enum covers every engine operation.  Following the
//! convention in `fs::dos3x::types::Error` and `fs::cpm::types::Error` of the
//! teacher codebase, each variant carries a short, user-facing message and no
//! payload beyond what is needed to explain the failure.

use std::fmt;

/// (track, sector) pair, used purely for error reporting; the canonical
/// representation lives in [`crate::geometry::TrackSector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr(pub u8, pub u8);

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track {} sector {}", self.0, self.1)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("address {0} is out of range for this image's geometry")]
    BadAddress(Addr),
    #[error("could not infer a consistent disk geometry from this image")]
    BadGeometry,
    #[error("sector chain is corrupt (self-link or out-of-bounds link) at {0}")]
    CorruptChain(Addr),
    #[error("no free sectors remain on this volume")]
    OutOfSpace,
    #[error("directory has no available slot for a new entry")]
    DirectoryFull,
    #[error("no matching directory entry was found")]
    NotFound,
    #[error("date field out of range: {0}")]
    DateOutOfRange(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
