use std::time::Duration;

use tracing::debug;
use url::Url;

use webaudit_prober::{ProbeOptions, Prober};

const PSI_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// PageSpeed performance score for `target`, 0-100. Any failure (HTTP,
/// timeout, shape) yields None and the check is simply omitted.
pub async fn fetch_psi_score(
    prober: &Prober,
    api_key: &str,
    target: &str,
    timeout: Duration,
) -> Option<u32> {
    let endpoint = Url::parse_with_params(
        PSI_ENDPOINT,
        &[
            ("url", target),
            ("category", "performance"),
            ("strategy", "mobile"),
            ("key", api_key),
        ],
    )
    .ok()?;

    let resp = prober
        .get(endpoint.as_str(), &ProbeOptions::new(timeout))
        .await
        .ok()?;
    if !resp.status().is_success() {
        debug!(status = resp.status().as_u16(), "PSI request rejected");
        return None;
    }
    let body: serde_json::Value = serde_json::from_str(&resp.text().await.ok()?).ok()?;
    parse_score(&body)
}

fn parse_score(body: &serde_json::Value) -> Option<u32> {
    let raw = body
        .get("lighthouseResult")?
        .get("categories")?
        .get("performance")?
        .get("score")?
        .as_f64()?;
    Some((raw * 100.0).round().clamp(0.0, 100.0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_is_scaled_and_rounded() {
        let body = json!({
            "lighthouseResult": { "categories": { "performance": { "score": 0.875 } } }
        });
        assert_eq!(parse_score(&body), Some(88));
    }

    #[test]
    fn malformed_payload_is_none() {
        assert_eq!(parse_score(&json!({})), None);
        assert_eq!(
            parse_score(&json!({"lighthouseResult": {"categories": {}}})),
            None
        );
        assert_eq!(
            parse_score(&json!({"lighthouseResult": {"categories": {"performance": {"score": "bad"}}}})),
            None
        );
    }
}
