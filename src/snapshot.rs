use std::io::ErrorKind;
use std::path::PathBuf;

use crate::errors::PulseError;
use crate::models::EntitySets;

/// Read side of the last-known-good snapshot. The file is written by the
/// external sync process after each successful live fetch; this core only
/// ever reads it.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `Ok(None)` when the file has never been written. A file that exists
    /// but does not parse is a hard error, not an empty snapshot.
    pub fn load(&self) -> Result<Option<EntitySets>, PulseError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PulseError::SnapshotIo(err)),
        };
        let sets = serde_json::from_str(&raw).map_err(PulseError::SnapshotParse)?;
        Ok(Some(sets))
    }
}
