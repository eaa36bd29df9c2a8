use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("upstream unreachable: {0}")]
    Upstream(String),

    #[error("snapshot not found: tried {0:?}")]
    SnapshotMissing(Vec<String>),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
