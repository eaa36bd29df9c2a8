use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub psi: PsiConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub share: ShareConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    /// Wall-clock ceiling for one whole audit, in milliseconds.
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,
    /// Discretionary outbound sub-requests allowed per audit.
    #[serde(default = "default_sub_request_quota")]
    pub sub_request_quota: u32,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Attach per-probe timings to responses.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PsiConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BlobConfig {
    pub read_write_token: Option<String>,
    pub public_base: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ShareConfig {
    pub base: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            budget_ms: default_budget_ms(),
            sub_request_quota: default_sub_request_quota(),
            cache_ttl_ms: default_cache_ttl_ms(),
            debug: false,
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_budget_ms() -> u64 {
    8_500
}

fn default_sub_request_quota() -> u32 {
    8
}

fn default_cache_ttl_ms() -> u64 {
    90_000
}

impl AppConfig {
    /// Environment variables win over whatever the TOML file said.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LISTEN_ADDR") {
            if !v.is_empty() {
                self.server.listen = v;
            }
        }
        if let Some(ms) = parse_env_u64("AUDIT_BUDGET_MS") {
            self.audit.budget_ms = ms;
        }
        if let Some(ms) = parse_env_u64("AUDIT_CACHE_TTL_MS") {
            self.audit.cache_ttl_ms = ms;
        }
        if let Ok(v) = std::env::var("PSI_API_KEY") {
            if !v.is_empty() {
                self.psi.api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("DEBUG_AUDIT") {
            self.audit.debug = v == "1";
        }
        if let Ok(v) = std::env::var("BLOB_READ_WRITE_TOKEN") {
            if !v.is_empty() {
                self.blob.read_write_token = Some(v);
            }
        }
        if let Ok(v) = std::env::var("BLOB_PUBLIC_BASE") {
            if !v.is_empty() {
                self.blob.public_base = Some(v);
            }
        }
        if let Ok(v) = std::env::var("SHARE_BASE") {
            if !v.is_empty() {
                self.share.base = Some(v);
            }
        }
    }
}

fn parse_env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.parse::<u64>().ok().filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.audit.budget_ms, 8_500);
        assert_eq!(config.audit.cache_ttl_ms, 90_000);
        assert_eq!(config.audit.sub_request_quota, 8);
        assert!(!config.audit.debug);
        assert!(config.psi.api_key.is_none());
    }

    #[test]
    fn partial_toml_fills_the_rest() {
        let config: AppConfig = toml::from_str(
            r#"
            [audit]
            budget_ms = 4000

            [share]
            base = "https://widget.example.com/audit"
            "#,
        )
        .unwrap();
        assert_eq!(config.audit.budget_ms, 4_000);
        assert_eq!(config.audit.cache_ttl_ms, 90_000);
        assert_eq!(config.share.base.as_deref(), Some("https://widget.example.com/audit"));
    }
}
