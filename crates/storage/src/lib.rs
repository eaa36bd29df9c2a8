//! Snapshot persistence: a report stored under a random public key in an
//! external blob namespace, retrievable by relative path or absolute URL.

pub mod blob;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use webaudit_core::{AuditError, Report};

pub use blob::BlobStore;
pub use memory::MemoryStore;

/// Where a snapshot ended up.
#[derive(Debug, Clone)]
pub struct SavedSnapshot {
    pub path: String,
    pub url: String,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, report: &Report) -> Result<SavedSnapshot, AuditError>;

    /// Fetch a snapshot by relative path or absolute URL. `Ok(None)` means
    /// the store answered but has no such object.
    async fn load(&self, path_or_url: &str) -> Result<Option<Value>, AuditError>;
}

/// Legacy share links carried a bare id; try `<id>.json` first, then the id
/// itself. First hit wins.
pub async fn load_legacy(
    store: &dyn SnapshotStore,
    id: &str,
) -> Result<Option<Value>, AuditError> {
    let with_ext = format!("{id}.json");
    if let Some(found) = store.load(&with_ext).await? {
        return Ok(Some(found));
    }
    store.load(id).await
}

/// Shareable widget URL referencing a stored snapshot.
pub fn share_url(share_base: &str, path: &str) -> String {
    format!("{share_base}?blob={}", urlencoding::encode(path))
}
