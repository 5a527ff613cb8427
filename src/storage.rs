//! Session store: the persisted `SessionRecord` under the user cache dir.
//!
//! Holds at most one record; every save replaces it wholesale. Writes go to a
//! sibling temp file first and are renamed into place, so a crash or a
//! concurrent reader never observes a partially-written record.

use crate::error::{EngineError, Result};
use crate::model::SessionRecord;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Load the stored session, if any.
///
/// Absence is not an error. A record that exists but cannot be parsed is
/// `CorruptState`: callers map it to "no session" after logging a warning, so
/// a damaged store never blocks a fresh launch.
pub fn load_session(cache_file: &Path) -> Result<Option<SessionRecord>> {
    let data = match std::fs::read_to_string(cache_file) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(EngineError::CorruptState {
                source: anyhow::Error::new(e)
                    .context(format!("failed to read {}", cache_file.display())),
            })
        }
    };

    let record: SessionRecord = serde_json::from_str(&data)
        .with_context(|| format!("invalid session record in {}", cache_file.display()))
        .map_err(|source| EngineError::CorruptState { source })?;

    Ok(Some(record.normalized()))
}

/// Replace the stored session with `record`.
///
/// Atomic with respect to readers: serialize, write to a uniquely-named temp
/// file in the same directory, then rename over the target.
pub fn save_session(cache_file: &Path, record: &SessionRecord) -> Result<()> {
    let dir = cache_file.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|source| EngineError::PersistError { source })?;

    let json = serde_json::to_string_pretty(record).map_err(|e| EngineError::PersistError {
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    // Temp file must live in the target directory: rename is only atomic
    // within one filesystem.
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|source| EngineError::PersistError { source })?;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|source| EngineError::PersistError { source })?;
    tmp.persist(cache_file)
        .map_err(|e| EngineError::PersistError { source: e.error })?;

    Ok(())
}
