use url::Url;

use webaudit_core::AuditError;

/// Turn raw user input into an absolute http(s) URL, defaulting to https.
pub fn normalize_target(raw: &str) -> Result<Url, AuditError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuditError::InvalidUrl("empty input".to_string()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate)
        .map_err(|e| AuditError::InvalidUrl(format!("{trimmed}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AuditError::InvalidUrl(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(AuditError::InvalidUrl(format!("{trimmed}: no host")));
    }
    Ok(url)
}

/// Cache key: lowercased host, no query or fragment, no trailing slashes.
pub fn normalize_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    let port = url
        .port()
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    let path = url.path().trim_end_matches('/');
    format!("{}://{}{}{}", url.scheme(), host, port, path)
}

/// Equality used by the canonical-tag check: ignores query, fragment,
/// trailing slashes, and host case.
pub fn urls_equivalent(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str().map(|h| h.to_ascii_lowercase()) == b.host_str().map(|h| h.to_ascii_lowercase())
        && a.port_or_known_default() == b.port_or_known_default()
        && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

/// The www↔non-www counterpart of a host, when one makes sense.
pub fn flip_www(host: &str) -> Option<String> {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }
    if let Some(rest) = host.strip_prefix("www.") {
        (!rest.is_empty()).then(|| rest.to_string())
    } else if host.contains('.') {
        Some(format!("www.{host}"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domains_get_https() {
        let url = normalize_target("example.com/path").unwrap();
        assert_eq!(url.as_str(), "https://example.com/path");
    }

    #[test]
    fn explicit_http_is_kept() {
        let url = normalize_target(" http://example.com ").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn junk_is_rejected() {
        assert!(normalize_target("").is_err());
        assert!(normalize_target("ftp://example.com").is_err());
        assert!(normalize_target("https://").is_err());
    }

    #[test]
    fn key_drops_query_fragment_and_trailing_slash() {
        let url = Url::parse("https://EXAMPLE.com/Path/?utm=1#frag").unwrap();
        assert_eq!(normalize_key(&url), "https://example.com/Path");
    }

    #[test]
    fn key_is_idempotent() {
        let url = Url::parse("https://Example.com/a/b///?q=1").unwrap();
        let key = normalize_key(&url);
        let again = normalize_key(&Url::parse(&key).unwrap());
        assert_eq!(key, again);
    }

    #[test]
    fn key_of_root_has_no_trailing_slash() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(normalize_key(&url), "https://example.com");
    }

    #[test]
    fn equivalence_ignores_query_fragment_slash_and_host_case() {
        let a = Url::parse("https://Example.com/page/?ref=x#top").unwrap();
        let b = Url::parse("https://example.com/page").unwrap();
        assert!(urls_equivalent(&a, &b));

        let c = Url::parse("http://example.com/page").unwrap();
        assert!(!urls_equivalent(&b, &c));

        let d = Url::parse("https://example.com/other").unwrap();
        assert!(!urls_equivalent(&b, &d));
    }

    #[test]
    fn www_flipping() {
        assert_eq!(flip_www("www.example.com").as_deref(), Some("example.com"));
        assert_eq!(flip_www("example.com").as_deref(), Some("www.example.com"));
        assert_eq!(flip_www("127.0.0.1"), None);
        assert_eq!(flip_www("localhost"), None);
    }
}
