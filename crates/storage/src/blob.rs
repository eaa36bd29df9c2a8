use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use webaudit_core::{AuditError, Report};

use crate::{SavedSnapshot, SnapshotStore};

const STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot store over an HTTP blob namespace: bearer-authenticated PUT,
/// public GET. Keys are random, so writes are idempotent per key.
pub struct BlobStore {
    client: reqwest::Client,
    token: String,
    public_base: Url,
}

impl BlobStore {
    pub fn new(token: impl Into<String>, public_base: &str) -> Result<Self, AuditError> {
        let public_base = Url::parse(public_base)
            .map_err(|e| AuditError::Config(format!("blob public base: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(STORE_TIMEOUT)
            .build()
            .map_err(|e| AuditError::Config(e.to_string()))?;
        Ok(Self {
            client,
            token: token.into(),
            public_base,
        })
    }

    fn random_path() -> String {
        let mut rng = rand::thread_rng();
        format!("audits/{:016x}{:016x}.json", rng.next_u64(), rng.next_u64())
    }

    fn resolve(&self, path_or_url: &str) -> Result<Url, AuditError> {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            Url::parse(path_or_url).map_err(|e| AuditError::Storage(e.to_string()))
        } else {
            self.public_base
                .join(path_or_url.trim_start_matches('/'))
                .map_err(|e| AuditError::Storage(e.to_string()))
        }
    }
}

#[async_trait]
impl SnapshotStore for BlobStore {
    async fn save(&self, report: &Report) -> Result<SavedSnapshot, AuditError> {
        let path = Self::random_path();
        let url = self.resolve(&path)?;
        let body = serde_json::to_vec(report).map_err(|e| AuditError::Storage(e.to_string()))?;

        let resp = self
            .client
            .put(url.clone())
            .bearer_auth(&self.token)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AuditError::Storage(format!(
                "blob PUT {} returned {}",
                url,
                resp.status()
            )));
        }
        info!(path, "snapshot stored");
        Ok(SavedSnapshot {
            path,
            url: url.to_string(),
        })
    }

    async fn load(&self, path_or_url: &str) -> Result<Option<Value>, AuditError> {
        let url = self.resolve(path_or_url)?;
        debug!(%url, "snapshot load");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AuditError::Storage(format!(
                "blob GET {} returned {}",
                url,
                resp.status()
            )));
        }
        let payload = resp
            .json::<Value>()
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_paths_live_under_audits() {
        let path = BlobStore::random_path();
        assert!(path.starts_with("audits/"));
        assert!(path.ends_with(".json"));
        assert_ne!(path, BlobStore::random_path());
    }

    #[test]
    fn resolve_joins_relative_paths_onto_the_base() {
        let store = BlobStore::new("token", "https://blob.example.com/ns/").unwrap();
        let url = store.resolve("audits/abc.json").unwrap();
        assert_eq!(url.as_str(), "https://blob.example.com/ns/audits/abc.json");

        let absolute = store.resolve("https://elsewhere.example.com/x.json").unwrap();
        assert_eq!(absolute.as_str(), "https://elsewhere.example.com/x.json");
    }
}
