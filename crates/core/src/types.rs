use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome bucket for a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Locked,
}

/// Measured value attached to a finding (a score, a byte count, a flag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckValue {
    Number(f64),
    Flag(bool),
}

/// One classified probe outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub id: String,
    pub label: String,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CheckValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl Check {
    pub fn new(id: &str, label: &str, status: CheckStatus) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            status,
            details: None,
            value: None,
            locked: None,
        }
    }

    pub fn pass(id: &str, label: &str) -> Self {
        Self::new(id, label, CheckStatus::Pass)
    }

    pub fn warn(id: &str, label: &str) -> Self {
        Self::new(id, label, CheckStatus::Warn)
    }

    pub fn fail(id: &str, label: &str) -> Self {
        Self::new(id, label, CheckStatus::Fail)
    }

    /// Placeholder for a finding that intentionally defers computation.
    pub fn locked(id: &str, label: &str) -> Self {
        let mut check = Self::new(id, label, CheckStatus::Locked);
        check.locked = Some(true);
        check
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_number(mut self, value: f64) -> Self {
        self.value = Some(CheckValue::Number(value));
        self
    }

    pub fn with_flag(mut self, value: bool) -> Self {
        self.value = Some(CheckValue::Flag(value));
        self
    }
}

/// Per-probe wall-clock timing, attached to reports when diagnostics are on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagEntry {
    pub probe: String,
    pub ms: u64,
}

/// The audit result: one entry per applicable check id plus page metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub ok: bool,
    pub url: String,
    pub normalized_url: String,
    pub final_url: String,
    /// 0 only on the timeout path.
    pub fetched_status: u16,
    pub timing_ms: u64,
    pub title: String,
    pub meta_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    pub checks: Vec<Check>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_age_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_blob_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_blob_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(
        default,
        rename = "_diag",
        skip_serializing_if = "Option::is_none"
    )]
    pub diag: Option<Vec<DiagEntry>>,
}

impl Report {
    pub fn is_blocked(&self) -> bool {
        self.blocked.unwrap_or(false)
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout.unwrap_or(false)
    }

    pub fn check(&self, id: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let check = Check::pass("viewport", "Viewport").with_flag(true);
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["status"], "pass");
        assert_eq!(json["value"], true);
        assert!(json.get("locked").is_none());
    }

    #[test]
    fn locked_check_carries_flag() {
        let check = Check::locked("compression", "Compression");
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["status"], "locked");
        assert_eq!(json["locked"], true);
    }

    #[test]
    fn report_renames_to_camel_case() {
        let report = Report {
            ok: true,
            url: "https://example.com".into(),
            normalized_url: "https://example.com/".into(),
            final_url: "https://example.com/".into(),
            fetched_status: 200,
            timing_ms: 321,
            title: "t".into(),
            meta_description: String::new(),
            speed: None,
            score: Some(84),
            checks: vec![],
            blocked: None,
            timeout: None,
            cached: None,
            cache_age_ms: None,
            share_blob_path: None,
            share_blob_url: None,
            share_url: None,
            generated_at: Utc::now(),
            diag: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fetchedStatus"], 200);
        assert_eq!(json["normalizedUrl"], "https://example.com/");
        assert!(json.get("blocked").is_none());
        assert!(json.get("_diag").is_none());
    }
}
