use url::Url;

use webaudit_core::{Check, CheckStatus};
use webaudit_parser::ImgTag;

use crate::normalize::urls_equivalent;

/// The closed set of finding identifiers.
pub mod id {
    pub const SITEMAP: &str = "sitemap";
    pub const ROBOTS: &str = "robots";
    pub const FAVICON: &str = "favicon";
    pub const OPENGRAPH: &str = "opengraph";
    pub const CANONICAL: &str = "canonical";
    pub const NOINDEX: &str = "noindex";
    pub const META_ROBOTS: &str = "meta-robots";
    pub const META_DESCRIPTION: &str = "meta-description";
    pub const TITLE_LENGTH: &str = "title-length";
    pub const VIEWPORT: &str = "viewport";
    pub const WWW_CANONICAL: &str = "www-canonical";
    pub const IMG_ALT: &str = "img-alt";
    pub const STRUCTURED_DATA: &str = "structured-data";
    pub const H1_STRUCTURE: &str = "h1-structure";
    pub const LLMS: &str = "llms";
    pub const TIMEOUT: &str = "timeout";
    pub const PSI: &str = "psi";
    pub const TTFB: &str = "ttfb";
    pub const IMG_MODERN: &str = "img-modern";
    pub const IMG_SIZE: &str = "img-size";
    pub const IMG_LAZY: &str = "img-lazy";
    pub const COMPRESSION: &str = "compression";
    pub const BLOCKED: &str = "blocked";
    pub const HTTP: &str = "http";
    pub const HTTPS_REDIRECT: &str = "https-redirect";
    pub const MIXED_CONTENT: &str = "mixed-content";
    pub const SECURITY_HEADERS: &str = "security-headers";
}

/// Findings that intentionally defer computation, present in every report.
pub const LOCKED_IDS: &[&str] = &[
    id::MIXED_CONTENT,
    id::SECURITY_HEADERS,
    id::HTTPS_REDIRECT,
    id::COMPRESSION,
    id::STRUCTURED_DATA,
    id::H1_STRUCTURE,
    id::LLMS,
];

pub fn label(check_id: &str) -> &'static str {
    match check_id {
        id::SITEMAP => "Sitemap",
        id::ROBOTS => "Robots.txt",
        id::FAVICON => "Favicon",
        id::OPENGRAPH => "Open Graph tags",
        id::CANONICAL => "Canonical tag",
        id::NOINDEX => "Indexable",
        id::META_ROBOTS => "Robots directives",
        id::META_DESCRIPTION => "Meta description",
        id::TITLE_LENGTH => "Title length",
        id::VIEWPORT => "Mobile viewport",
        id::WWW_CANONICAL => "WWW redirect",
        id::IMG_ALT => "Image alt text",
        id::STRUCTURED_DATA => "Structured data",
        id::H1_STRUCTURE => "Heading structure",
        id::LLMS => "llms.txt",
        id::TIMEOUT => "Timed out",
        id::PSI => "PageSpeed score",
        id::TTFB => "Time to first byte",
        id::IMG_MODERN => "Modern image formats",
        id::IMG_SIZE => "Image weight",
        id::IMG_LAZY => "Lazy loading",
        id::COMPRESSION => "Compression",
        id::BLOCKED => "Access blocked",
        id::HTTP => "HTTP status",
        id::HTTPS_REDIRECT => "HTTPS redirect",
        id::MIXED_CONTENT => "Mixed content",
        id::SECURITY_HEADERS => "Security headers",
        _ => "Check",
    }
}

pub fn locked_placeholders() -> Vec<Check> {
    LOCKED_IDS
        .iter()
        .map(|&locked_id| Check::locked(locked_id, label(locked_id)))
        .collect()
}

pub fn http_check(status: u16) -> Check {
    if status < 400 {
        Check::pass(id::HTTP, label(id::HTTP))
            .with_details(format!("Page responded with HTTP {status}"))
            .with_number(status as f64)
    } else {
        Check::fail(id::HTTP, label(id::HTTP))
            .with_details(format!("Page responded with HTTP {status}"))
            .with_number(status as f64)
    }
}

pub fn ttfb_check(timing_ms: u64) -> Check {
    let check = if timing_ms < 1_500 {
        Check::pass(id::TTFB, label(id::TTFB))
    } else {
        Check::warn(id::TTFB, label(id::TTFB))
    };
    check
        .with_details(format!("First byte after {timing_ms} ms"))
        .with_number(timing_ms as f64)
}

pub fn title_check(title: &str) -> Check {
    let len = title.chars().count();
    if len == 0 {
        return Check::fail(id::TITLE_LENGTH, label(id::TITLE_LENGTH))
            .with_details("No <title> found");
    }
    let check = if (15..=60).contains(&len) {
        Check::pass(id::TITLE_LENGTH, label(id::TITLE_LENGTH))
    } else {
        Check::warn(id::TITLE_LENGTH, label(id::TITLE_LENGTH))
    };
    check
        .with_details(format!("Title is {len} characters (ideal 15\u{2013}60)"))
        .with_number(len as f64)
}

pub fn meta_description_check(description: Option<&str>) -> Check {
    let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Check::fail(id::META_DESCRIPTION, label(id::META_DESCRIPTION))
            .with_details("No meta description found");
    };
    let len = description.chars().count();
    let check = if (50..=160).contains(&len) {
        Check::pass(id::META_DESCRIPTION, label(id::META_DESCRIPTION))
    } else {
        Check::warn(id::META_DESCRIPTION, label(id::META_DESCRIPTION))
    };
    check
        .with_details(format!("Description is {len} characters (ideal 50\u{2013}160)"))
        .with_number(len as f64)
}

pub fn viewport_check(present: bool) -> Check {
    if present {
        Check::pass(id::VIEWPORT, label(id::VIEWPORT)).with_details("Viewport meta tag present")
    } else {
        Check::fail(id::VIEWPORT, label(id::VIEWPORT)).with_details("No viewport meta tag")
    }
}

pub fn canonical_check(canonicals: &[String], final_url: &Url) -> Check {
    if canonicals.is_empty() {
        return Check::fail(id::CANONICAL, label(id::CANONICAL))
            .with_details("No canonical link found");
    }
    if canonicals.len() > 1 {
        return Check::warn(id::CANONICAL, label(id::CANONICAL)).with_details(format!(
            "{} canonical links found; keep exactly one",
            canonicals.len()
        ));
    }
    match final_url.join(&canonicals[0]) {
        Ok(resolved) if urls_equivalent(&resolved, final_url) => {
            Check::pass(id::CANONICAL, label(id::CANONICAL))
                .with_details(format!("Canonical matches {final_url}"))
        }
        Ok(resolved) => Check::warn(id::CANONICAL, label(id::CANONICAL))
            .with_details(format!("Canonical points at {resolved}, page is {final_url}")),
        Err(_) => Check::warn(id::CANONICAL, label(id::CANONICAL))
            .with_details(format!("Canonical href does not resolve: {}", canonicals[0])),
    }
}

/// Sources consulted for indexability directives.
pub struct RobotsDirectives<'a> {
    pub meta_robots: Option<&'a str>,
    pub meta_googlebot: Option<&'a str>,
    pub meta_bingbot: Option<&'a str>,
    pub x_robots_tag: Option<&'a str>,
}

impl RobotsDirectives<'_> {
    fn sources(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("meta robots", self.meta_robots),
            ("meta googlebot", self.meta_googlebot),
            ("meta bingbot", self.meta_bingbot),
            ("x-robots-tag", self.x_robots_tag),
        ]
    }

    fn noindex_source(&self) -> Option<&'static str> {
        self.sources().into_iter().find_map(|(name, value)| {
            let value = value?.to_ascii_lowercase();
            (value.contains("noindex") || directive_list_contains_none(&value)).then_some(name)
        })
    }

    fn present(&self) -> Vec<String> {
        self.sources()
            .into_iter()
            .filter_map(|(name, value)| {
                let value = value?.trim();
                (!value.is_empty()).then(|| format!("{name}: {value}"))
            })
            .collect()
    }
}

/// `none` must match as a directive token, not as a substring of e.g.
/// `nonexistent`.
fn directive_list_contains_none(value: &str) -> bool {
    value
        .split(&[',', ' '][..])
        .any(|token| token.trim() == "none")
}

pub fn noindex_checks(directives: &RobotsDirectives<'_>) -> (Check, Check) {
    let noindex = match directives.noindex_source() {
        Some(source) => Check::fail(id::NOINDEX, label(id::NOINDEX))
            .with_details(format!("Page is excluded from indexing via {source}")),
        None => Check::pass(id::NOINDEX, label(id::NOINDEX))
            .with_details("No noindex directive found"),
    };

    let present = directives.present();
    let meta_robots = if present.is_empty() {
        Check::pass(id::META_ROBOTS, label(id::META_ROBOTS))
            .with_details("No robots directives present")
    } else if directives.noindex_source().is_some() {
        Check::warn(id::META_ROBOTS, label(id::META_ROBOTS))
            .with_details(present.join("; "))
    } else {
        Check::pass(id::META_ROBOTS, label(id::META_ROBOTS))
            .with_details(present.join("; "))
    };
    (noindex, meta_robots)
}

pub fn img_alt_check(images: &[ImgTag]) -> Check {
    if images.is_empty() {
        return Check::pass(id::IMG_ALT, label(id::IMG_ALT)).with_details("No images found");
    }
    let with_alt = images
        .iter()
        .filter(|img| img.alt.as_deref().map(|a| !a.trim().is_empty()).unwrap_or(false))
        .count();
    let ratio = with_alt as f64 / images.len() as f64;
    let status = if ratio >= 0.90 {
        CheckStatus::Pass
    } else if ratio >= 0.60 {
        CheckStatus::Warn
    } else {
        CheckStatus::Fail
    };
    Check::new(id::IMG_ALT, label(id::IMG_ALT), status)
        .with_details(format!(
            "{with_alt} of {} images have alt text",
            images.len()
        ))
        .with_number((ratio * 100.0).round())
}

pub fn img_modern_check(images: &[ImgTag]) -> Check {
    if images.is_empty() {
        return Check::warn(id::IMG_MODERN, label(id::IMG_MODERN)).with_details("No images found");
    }
    let modern = images
        .iter()
        .filter_map(|img| img.src.as_deref())
        .filter(|src| {
            let src = src.to_ascii_lowercase();
            src.contains(".avif") || src.contains(".webp")
        })
        .count();
    if modern > 0 {
        Check::pass(id::IMG_MODERN, label(id::IMG_MODERN))
            .with_details(format!("{modern} images use AVIF/WebP"))
            .with_number(modern as f64)
    } else {
        Check::warn(id::IMG_MODERN, label(id::IMG_MODERN))
            .with_details("No AVIF/WebP images found")
    }
}

pub fn img_lazy_check(images: &[ImgTag]) -> Check {
    if images.is_empty() {
        return Check::warn(id::IMG_LAZY, label(id::IMG_LAZY)).with_details("No images found");
    }
    let lazy = images
        .iter()
        .filter(|img| img.loading.as_deref() == Some("lazy"))
        .count();
    if lazy > 0 {
        Check::pass(id::IMG_LAZY, label(id::IMG_LAZY))
            .with_details(format!("{lazy} images load lazily"))
            .with_number(lazy as f64)
    } else {
        Check::warn(id::IMG_LAZY, label(id::IMG_LAZY)).with_details("No loading=\"lazy\" images")
    }
}

/// Classify the sampled image HEADs. `oversized` counts bodies over 300 KB.
pub fn img_size_check(oversized: usize, probed: usize) -> Check {
    let status = match oversized {
        0 => CheckStatus::Pass,
        1..=2 => CheckStatus::Warn,
        _ => CheckStatus::Fail,
    };
    Check::new(id::IMG_SIZE, label(id::IMG_SIZE), status)
        .with_details(format!("{oversized} of {probed} sampled images exceed 300 KB"))
        .with_number(oversized as f64)
}

pub fn opengraph_check(
    og_title: Option<&str>,
    og_image: Option<&str>,
    any_og_tag: bool,
    image_loads: Option<bool>,
) -> Check {
    let has_title = og_title.map(|t| !t.trim().is_empty()).unwrap_or(false);
    let has_image = og_image.map(|i| !i.trim().is_empty()).unwrap_or(false);
    if has_title && has_image && image_loads != Some(false) {
        Check::pass(id::OPENGRAPH, label(id::OPENGRAPH))
            .with_details("og:title and og:image present")
    } else if any_og_tag {
        let details = if has_image && image_loads == Some(false) {
            "og:image does not load"
        } else {
            "Only some Open Graph tags present"
        };
        Check::warn(id::OPENGRAPH, label(id::OPENGRAPH)).with_details(details)
    } else {
        Check::fail(id::OPENGRAPH, label(id::OPENGRAPH)).with_details("No Open Graph tags found")
    }
}

pub fn favicon_check(loads: Option<bool>) -> Check {
    match loads {
        Some(true) => Check::pass(id::FAVICON, label(id::FAVICON)).with_details("Favicon loads"),
        Some(false) => {
            Check::warn(id::FAVICON, label(id::FAVICON)).with_details("Favicon did not load")
        }
        None => Check::fail(id::FAVICON, label(id::FAVICON)).with_details("Unknown"),
    }
}

pub enum RobotsOutcome {
    Found { disallows_all: bool },
    NotFound,
    Unknown,
}

pub fn robots_check(outcome: &RobotsOutcome) -> Check {
    match outcome {
        RobotsOutcome::Found { disallows_all: false } => {
            Check::pass(id::ROBOTS, label(id::ROBOTS)).with_details("robots.txt found")
        }
        RobotsOutcome::Found { disallows_all: true } => {
            Check::fail(id::ROBOTS, label(id::ROBOTS))
                .with_details("robots.txt disallows all crawling")
        }
        RobotsOutcome::NotFound => {
            Check::warn(id::ROBOTS, label(id::ROBOTS)).with_details("No robots.txt found")
        }
        RobotsOutcome::Unknown => {
            Check::warn(id::ROBOTS, label(id::ROBOTS)).with_details("Unknown")
        }
    }
}

pub enum SitemapOutcome {
    Verified { url: String, sampled: String },
    Unverified { url: String, reason: String },
    Gzipped { url: String },
    NotFound,
}

pub fn sitemap_check(outcome: &SitemapOutcome) -> Check {
    match outcome {
        SitemapOutcome::Verified { url, sampled } => {
            Check::pass(id::SITEMAP, label(id::SITEMAP))
                .with_details(format!("{url} verified via {sampled}"))
        }
        SitemapOutcome::Unverified { url, reason } => {
            Check::warn(id::SITEMAP, label(id::SITEMAP))
                .with_details(format!("{url}: {reason}"))
        }
        SitemapOutcome::Gzipped { url } => Check::warn(id::SITEMAP, label(id::SITEMAP))
            .with_details(format!("Gzipped sitemap at {url}; contents not verified")),
        SitemapOutcome::NotFound => {
            Check::fail(id::SITEMAP, label(id::SITEMAP)).with_details("No sitemap found")
        }
    }
}

pub enum VariantOutcome {
    GoodRedirect { variant_host: String, status: u16 },
    NoRedirect { variant_host: String, detail: String },
    NotApplicable,
    Unknown,
}

pub fn www_check(outcome: &VariantOutcome) -> Check {
    match outcome {
        VariantOutcome::GoodRedirect { variant_host, status } => {
            Check::pass(id::WWW_CANONICAL, label(id::WWW_CANONICAL))
                .with_details(format!("{variant_host} redirects here (HTTP {status})"))
        }
        VariantOutcome::NoRedirect { variant_host, detail } => {
            Check::warn(id::WWW_CANONICAL, label(id::WWW_CANONICAL))
                .with_details(format!("{variant_host}: {detail}"))
        }
        VariantOutcome::NotApplicable => {
            Check::warn(id::WWW_CANONICAL, label(id::WWW_CANONICAL))
                .with_details("Not applicable for this host")
        }
        VariantOutcome::Unknown => {
            Check::warn(id::WWW_CANONICAL, label(id::WWW_CANONICAL)).with_details("Unknown")
        }
    }
}

pub fn psi_check(score: u32) -> Check {
    let check = if score >= 70 {
        Check::pass(id::PSI, label(id::PSI))
    } else {
        Check::warn(id::PSI, label(id::PSI))
    };
    check
        .with_details(format!("PageSpeed performance score {score}/100"))
        .with_number(score as f64)
}

pub fn blocked_check(status: u16) -> Check {
    Check::fail(id::BLOCKED, label(id::BLOCKED))
        .with_details(format!("Origin refused automated access (HTTP {status})"))
        .with_number(status as f64)
}

pub fn timeout_check(budget_ms: u64) -> Check {
    Check::warn(id::TIMEOUT, label(id::TIMEOUT))
        .with_details(format!("Page did not respond within {budget_ms} ms"))
}
