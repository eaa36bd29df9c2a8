use once_cell::sync::Lazy;
use regex::Regex;

static LOC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").unwrap());

/// All `<loc>` values from a urlset or sitemapindex document, trimmed.
pub fn locs(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .filter_map(|cap| {
            let value = cap.get(1)?.as_str().trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect()
}

/// Gzipped sitemaps are reported, never parsed.
pub fn looks_gzipped(url: &str, content_type: Option<&str>) -> bool {
    if url.split(&['?', '#'][..]).next().unwrap_or(url).ends_with(".gz") {
        return true;
    }
    content_type
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("application/gzip") || ct.contains("application/x-gzip")
        })
        .unwrap_or(false)
}
