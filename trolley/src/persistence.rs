//! Durable snapshots of the store state.
//!
//! The store serializes its persisted projection into an opaque blob under a
//! fixed namespace key after every change, and reads it back once at startup
//! to seed initial state before any remote call completes. The blob carries
//! a format version so a layout change is detected instead of misread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Namespace key the store snapshots itself under.
pub const SNAPSHOT_KEY: &str = "shopping-lists.blob";

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// An opaque key-to-blob store. The blob layout is the store's business, not
/// the backend's.
#[allow(async_fn_in_trait)]
pub trait SnapshotStore {
    async fn save(&self, key: &str, blob: Vec<u8>) -> Result<(), SnapshotError>;

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError>;
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    state: T,
}

pub(crate) fn encode<T: Serialize>(state: &T) -> Result<Vec<u8>, SnapshotError> {
    let envelope = Envelope {
        version: SNAPSHOT_VERSION,
        state,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode a snapshot blob, or `None` if it is unreadable or from another
/// format version. A bad blob is logged and discarded; startup continues
/// from an empty collection.
pub(crate) fn decode<T: DeserializeOwned>(blob: &[u8]) -> Option<T> {
    let envelope: Envelope<serde_json::Value> = serde_json::from_slice(blob)
        .inspect_err(|e| log::error!("Discarding unreadable snapshot: {e}"))
        .ok()?;
    if envelope.version != SNAPSHOT_VERSION {
        log::error!(
            "Discarding snapshot with version {}, expected {SNAPSHOT_VERSION}",
            envelope.version
        );
        return None;
    }
    serde_json::from_value(envelope.state)
        .inspect_err(|e| log::error!("Discarding snapshot with malformed state: {e}"))
        .ok()
}

/// In-memory blobs. Clones share the same backing map, so a caller can keep
/// a handle to a store it handed off.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    blobs: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.borrow().get(key).cloned()
    }

    pub fn put(&self, key: &str, blob: Vec<u8>) {
        self.blobs.borrow_mut().insert(key.to_string(), blob);
    }
}

impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, key: &str, blob: Vec<u8>) -> Result<(), SnapshotError> {
        self.blobs.borrow_mut().insert(key.to_string(), blob);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError> {
        Ok(self.blobs.borrow().get(key).cloned())
    }
}

/// Blob files under a directory, one file per key.
pub struct DirSnapshotStore {
    root: PathBuf,
}

impl DirSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SnapshotStore for DirSnapshotStore {
    async fn save(&self, key: &str, blob: Vec<u8>) -> Result<(), SnapshotError> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.root.join(key), blob)?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError> {
        match std::fs::read(self.root.join(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn envelope_round_trips() {
        let blob = encode(&vec!["a".to_string(), "b".to_string()]).unwrap();
        let decoded: Vec<String> = decode(&blob).unwrap();
        assert_eq!(decoded, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn garbage_blob_is_discarded() {
        assert_eq!(decode::<Vec<String>>(b"not json at all"), None);
    }

    #[test]
    fn version_mismatch_is_discarded() {
        let blob = serde_json::to_vec(&serde_json::json!({
            "version": SNAPSHOT_VERSION + 1,
            "state": ["a"],
        }))
        .unwrap();
        assert_eq!(decode::<Vec<String>>(&blob), None);
    }

    #[test]
    fn dir_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirSnapshotStore::new(dir.path());

        assert!(block_on(store.load(SNAPSHOT_KEY)).unwrap().is_none());
        block_on(store.save(SNAPSHOT_KEY, b"blob".to_vec())).unwrap();
        assert_eq!(
            block_on(store.load(SNAPSHOT_KEY)).unwrap(),
            Some(b"blob".to_vec())
        );
    }
}
