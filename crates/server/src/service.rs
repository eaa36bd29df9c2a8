use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use webaudit_cache::ReportCache;
use webaudit_core::{AppConfig, AuditError, Report};
use webaudit_engine::normalize::{normalize_key, normalize_target};
use webaudit_engine::Auditor;
use webaudit_storage::{load_legacy, share_url, BlobStore, MemoryStore, SnapshotStore};

/// Cache lookup → orchestrator → scorer → optional snapshot, behind one
/// handle the HTTP surface and the CLI share.
pub struct AuditService {
    auditor: Auditor,
    cache: ReportCache,
    store: Arc<dyn SnapshotStore>,
    share_base: Option<String>,
}

impl AuditService {
    pub fn new(config: &AppConfig) -> Result<Self, AuditError> {
        let store: Arc<dyn SnapshotStore> = match (&config.blob.read_write_token, &config.blob.public_base) {
            (Some(token), Some(base)) => Arc::new(BlobStore::new(token, base)?),
            _ => {
                debug!("no blob store configured, snapshots are process-local");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self {
            auditor: Auditor::new(config)?,
            cache: ReportCache::with_ttl_ms(config.audit.cache_ttl_ms),
            store,
            share_base: config.share.base.clone(),
        })
    }

    /// Run (or replay) one audit. Snapshot mode bypasses the cache in both
    /// directions; blocked and timed-out reports are never cached.
    pub async fn audit(
        &self,
        url: &str,
        nocache: bool,
        snapshot: bool,
    ) -> Result<Report, AuditError> {
        let target = normalize_target(url)?;
        let key = normalize_key(&target);

        if !snapshot && !nocache {
            if let Some(hit) = self.cache.get(&key) {
                let mut payload = hit.payload;
                payload.cached = Some(true);
                payload.cache_age_ms = Some(hit.age.as_millis() as u64);
                return Ok(payload);
            }
        }

        let mut report = self.auditor.run(url).await?;

        if snapshot {
            let saved = self.store.save(&report).await?;
            if let Some(base) = &self.share_base {
                report.share_url = Some(share_url(base, &saved.path));
            }
            report.share_blob_url = Some(saved.url);
            report.share_blob_path = Some(saved.path);
        } else if !report.is_blocked() && !report.is_timeout() {
            self.cache.set(&key, report.clone());
        }
        Ok(report)
    }

    /// Load a stored snapshot by blob path/URL or legacy id and mark it.
    pub async fn load_snapshot(
        &self,
        blob: Option<&str>,
        legacy_id: Option<&str>,
    ) -> Result<Value, AuditError> {
        let (found, attempted) = if let Some(blob) = blob {
            (self.store.load(blob).await?, vec![blob.to_string()])
        } else if let Some(id) = legacy_id {
            (
                load_legacy(self.store.as_ref(), id).await?,
                vec![format!("{id}.json"), id.to_string()],
            )
        } else {
            return Err(AuditError::InvalidUrl("no snapshot reference".to_string()));
        };

        match found {
            Some(mut payload) => {
                if let Value::Object(map) = &mut payload {
                    map.insert("fromSnapshot".to_string(), Value::Bool(true));
                }
                Ok(payload)
            }
            None => Err(AuditError::SnapshotMissing(attempted)),
        }
    }
}
