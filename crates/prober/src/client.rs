use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::{Method, Response};
use thiserror::Error;
use tracing::debug;

use crate::headers::HeaderProfile;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REDIRECTS: usize = 10;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("client build error: {0}")]
    Build(String),
}

impl ProbeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout)
    }

    /// Transient failures are worth one more attempt; HTTP statuses never are.
    pub fn is_transient(&self) -> bool {
        match self {
            ProbeError::Timeout => true,
            ProbeError::Network(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("connection reset")
                    || msg.contains("connection refused")
                    || msg.contains("connection closed")
                    || msg.contains("broken pipe")
                    || msg.contains("dns")
                    || msg.contains("failed to lookup")
                    || msg.contains("unreachable")
                    || msg.contains("timed out")
            }
            ProbeError::Build(_) => false,
        }
    }
}

fn classify(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout
    } else {
        ProbeError::Network(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMode {
    #[default]
    Follow,
    Manual,
}

#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub profile: HeaderProfile,
    pub redirect: RedirectMode,
}

impl ProbeOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            profile: HeaderProfile::Default,
            redirect: RedirectMode::Follow,
        }
    }

    pub fn browser(mut self) -> Self {
        self.profile = HeaderProfile::Browser;
        self
    }

    pub fn manual_redirect(mut self) -> Self {
        self.redirect = RedirectMode::Manual;
        self
    }
}

/// One-shot fetch primitive. Per-request deadlines are supplied by the
/// caller; the prober never outlives the audit budget on its own.
pub struct Prober {
    follow: reqwest::Client,
    manual: reqwest::Client,
}

impl Prober {
    pub fn new() -> Result<Self, ProbeError> {
        let follow = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProbeError::Build(e.to_string()))?;
        let manual = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProbeError::Build(e.to_string()))?;
        Ok(Self { follow, manual })
    }

    pub async fn fetch(
        &self,
        url: &str,
        method: Method,
        opts: &ProbeOptions,
    ) -> Result<Response, ProbeError> {
        let client = match opts.redirect {
            RedirectMode::Follow => &self.follow,
            RedirectMode::Manual => &self.manual,
        };
        debug!(url, %method, timeout_ms = opts.timeout.as_millis() as u64, "probe");
        let req = client
            .request(method, url)
            .timeout(opts.timeout)
            .header("cache-control", "no-store");
        opts.profile.apply(req).send().await.map_err(classify)
    }

    pub async fn get(&self, url: &str, opts: &ProbeOptions) -> Result<Response, ProbeError> {
        self.fetch(url, Method::GET, opts).await
    }

    /// HEAD first; fall back to GET when HEAD is unavailable (error, 405/501)
    /// or, when asked, on any non-2xx/3xx answer.
    pub async fn head_then_get(
        &self,
        url: &str,
        opts: &ProbeOptions,
        fallback_on_non_ok: bool,
    ) -> Result<Response, ProbeError> {
        match self.fetch(url, Method::HEAD, opts).await {
            Ok(resp) => {
                let status = resp.status();
                let head_unsupported = status.as_u16() == 405 || status.as_u16() == 501;
                let non_ok = !(status.is_success() || status.is_redirection());
                if head_unsupported || (fallback_on_non_ok && non_ok) {
                    self.fetch(url, Method::GET, opts).await
                } else {
                    Ok(resp)
                }
            }
            Err(err) => {
                debug!(url, error = %err, "HEAD failed, retrying as GET");
                self.fetch(url, Method::GET, opts).await
            }
        }
    }
}

/// Retry `op` on aborts and transient network failures only, with linear
/// backoff plus up to 250 ms of uniform jitter between attempts.
pub async fn retry<T, F, Fut>(
    op: F,
    tries: u32,
    base_delay: Duration,
) -> Result<T, ProbeError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, ProbeError>>,
{
    let tries = tries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < tries && err.is_transient() => {
                let jitter = rand::thread_rng().gen_range(0..250u64);
                let delay = base_delay * attempt + Duration::from_millis(jitter);
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying probe");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn transient_classification_matches_network_family() {
        assert!(ProbeError::Timeout.is_transient());
        assert!(ProbeError::Network("Connection reset by peer".into()).is_transient());
        assert!(ProbeError::Network("failed to lookup address information".into()).is_transient());
        assert!(ProbeError::Network("Network unreachable".into()).is_transient());
        assert!(!ProbeError::Network("tls handshake eof".into()).is_transient());
        assert!(!ProbeError::Build("bad".into()).is_transient());
    }

    #[tokio::test]
    async fn retry_recovers_from_one_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = retry(
            |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ProbeError::Timeout)
                    } else {
                        Ok(42u32)
                    }
                }
            },
            2,
            Duration::from_millis(1),
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_gives_up_on_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = retry(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProbeError::Network("tls handshake eof".into())) }
            },
            3,
            Duration::from_millis(1),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_exhausts_tries_on_repeated_timeouts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = retry(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProbeError::Timeout) }
            },
            2,
            Duration::from_millis(1),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
