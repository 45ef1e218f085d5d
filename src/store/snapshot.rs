//! JSON snapshot files.
//!
//! A snapshot file is one JSON object with the collection names as keys:
//!
//! ```json
//! { "schools": [], "rounds": [], "scores": [], "drawState": {}, "debateState": {} }
//! ```

use std::path::Path;

use tracing::{debug, info};

use super::{MemoryStore, Snapshot, TournamentStore};
use crate::error::StoreError;

/// Reads a snapshot file.
///
/// # Errors
///
/// Returns [`StoreError::Io`] when the file cannot be read and
/// [`StoreError::Malformed`] when it is not a valid snapshot.
pub fn load(path: &Path) -> Result<Snapshot, StoreError> {
    let raw = std::fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| StoreError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(
        path = %path.display(),
        schools = snapshot.schools.len(),
        rounds = snapshot.rounds.len(),
        scores = snapshot.scores.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

/// Writes a snapshot file, replacing it atomically.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] on failure.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    info!(path = %path.display(), scores = snapshot.scores.len(), "saved snapshot");
    Ok(())
}

/// Loads a snapshot file into a fresh [`MemoryStore`].
///
/// # Errors
///
/// See [`load`].
pub fn open(path: &Path) -> Result<MemoryStore, StoreError> {
    load(path).map(MemoryStore::new)
}

/// Writes the current contents of a store to `path`.
///
/// # Errors
///
/// See [`save`].
pub async fn persist(store: &dyn TournamentStore, path: &Path) -> Result<(), StoreError> {
    let snapshot = store.snapshot().await?;
    save(path, &snapshot)
}
