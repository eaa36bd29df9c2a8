use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Method;
use tracing::{debug, info, warn};
use url::Url;

use webaudit_core::{AppConfig, AuditError, Check, DiagEntry, Report};
use webaudit_parser as parser;
use webaudit_parser::ImgTag;
use webaudit_prober::{retry, ProbeOptions, Prober};

use crate::budget::{
    Budget, ASSET_TIMEOUT_MS, PAGE_TIMEOUT_MS, PSI_TIMEOUT_MS, SMALL_TIMEOUT_MS,
};
use crate::checks::{self, RobotsDirectives, RobotsOutcome, SitemapOutcome, VariantOutcome};
use crate::normalize::{flip_www, normalize_target};
use crate::psi::fetch_psi_score;
use crate::score::overall_score;

/// Statuses that mean "the origin refuses automated access".
const BLOCK_STATUSES: [u16; 3] = [401, 403, 429];

const WELL_KNOWN_SITEMAP_PATHS: [&str; 4] = [
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/wp-sitemap.xml",
];

/// Sitemap URLs verified per audit.
const SITEMAP_SAMPLES: usize = 1;
/// Image HEAD probes per audit.
const IMAGE_HEADS: usize = 2;
/// HEAD-probed images above this are flagged.
const MAX_IMAGE_BYTES: u64 = 300_000;

const PAGE_RETRIES: u32 = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(400);

/// PSI is skipped outright when less than this remains.
const PSI_MIN_REMAINING_MS: u64 = 2_000;

struct Diag {
    enabled: bool,
    entries: Vec<DiagEntry>,
}

impl Diag {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Vec::new(),
        }
    }

    fn rec(&mut self, probe: &str, started: Instant) {
        if self.enabled {
            self.entries.push(DiagEntry {
                probe: probe.to_string(),
                ms: started.elapsed().as_millis() as u64,
            });
        }
    }

    fn into_entries(self) -> Option<Vec<DiagEntry>> {
        self.enabled.then_some(self.entries)
    }
}

fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Runs one audit end to end: page fetch, degraded paths, probe fan-out,
/// classification, scoring.
pub struct Auditor {
    prober: Prober,
    budget_ms: u64,
    quota: u32,
    psi_api_key: Option<String>,
    debug: bool,
}

impl Auditor {
    pub fn new(config: &AppConfig) -> Result<Self, AuditError> {
        Ok(Self {
            prober: Prober::new().map_err(|e| AuditError::Config(e.to_string()))?,
            budget_ms: config.audit.budget_ms,
            quota: config.audit.sub_request_quota,
            psi_api_key: config.psi.api_key.clone(),
            debug: config.audit.debug,
        })
    }

    pub async fn run(&self, raw_url: &str) -> Result<Report, AuditError> {
        let target = normalize_target(raw_url)?;
        let normalized = target.to_string();
        let budget = Budget::start(self.budget_ms, self.quota);
        let mut diag = Diag::new(self.debug);
        info!(url = %normalized, "audit start");

        let page_started = Instant::now();
        let page_result = retry(
            |_| async {
                self.prober
                    .fetch(
                        normalized.as_str(),
                        Method::GET,
                        &ProbeOptions::new(budget.within(PAGE_TIMEOUT_MS)),
                    )
                    .await
            },
            PAGE_RETRIES,
            RETRY_BASE_DELAY,
        )
        .await;
        diag.rec("page", page_started);

        let mut resp = match page_result {
            Ok(resp) => resp,
            Err(err) if err.is_timeout() => {
                return Ok(self.timeout_report(raw_url, &target, &budget, diag).await);
            }
            Err(err) => return Err(AuditError::Upstream(err.to_string())),
        };

        let mut status = resp.status().as_u16();
        if BLOCK_STATUSES.contains(&status) {
            debug!(status, "block status, retrying with browser headers");
            let retry_started = Instant::now();
            let opts = ProbeOptions::new(budget.within(PAGE_TIMEOUT_MS / 2)).browser();
            let second = self
                .prober
                .fetch(normalized.as_str(), Method::GET, &opts)
                .await;
            diag.rec("page-retry", retry_started);
            match second {
                Ok(second) if !BLOCK_STATUSES.contains(&second.status().as_u16()) => {
                    resp = second;
                    status = resp.status().as_u16();
                }
                Ok(second) => {
                    let status = second.status().as_u16();
                    return Ok(self
                        .blocked_report(raw_url, &target, status, &budget, diag)
                        .await);
                }
                Err(_) => {
                    return Ok(self
                        .blocked_report(raw_url, &target, status, &budget, diag)
                        .await);
                }
            }
        }

        let timing_ms = budget.elapsed_ms();
        let final_url = resp.url().clone();
        let x_robots_tag = {
            let values: Vec<String> = resp
                .headers()
                .get_all("x-robots-tag")
                .iter()
                .filter_map(|v| v.to_str().ok().map(str::to_string))
                .collect();
            (!values.is_empty()).then(|| values.join(", "))
        };

        let body = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(url = %normalized, error = %err, "body read failed, auditing headers only");
                Default::default()
            }
        };
        let html = parser::decode_body(&body);
        let page = parser::parse_page(&html);
        let origin = origin_of(&final_url);

        let mut checks: Vec<Check> = Vec::new();
        checks.push(checks::http_check(status));
        checks.push(checks::ttfb_check(timing_ms));

        // Open Graph, with one GET to confirm the og:image actually loads.
        let og_started = Instant::now();
        let og_title = page.property("og:title").map(str::to_string);
        let og_image = page.property("og:image").map(str::to_string);
        let any_og_tag = og_title.is_some()
            || og_image.is_some()
            || page.property("og:description").is_some()
            || page.property("og:url").is_some();
        let og_image_loads = match og_image.as_deref() {
            Some(src) => self.probe_image_loads(src, &final_url, &budget).await,
            None => None,
        };
        diag.rec("og-image", og_started);
        checks.push(checks::opengraph_check(
            og_title.as_deref(),
            og_image.as_deref(),
            any_og_tag,
            og_image_loads,
        ));

        let favicon_started = Instant::now();
        let favicon_loads = self
            .probe_favicon(page.icon_href.as_deref(), &final_url, &budget)
            .await;
        diag.rec("favicon", favicon_started);
        checks.push(checks::favicon_check(favicon_loads));

        let robots_started = Instant::now();
        let (robots_outcome, advertised_sitemaps) = self.probe_robots(&origin, &budget).await;
        diag.rec("robots", robots_started);
        checks.push(checks::robots_check(&robots_outcome));

        let sitemap_started = Instant::now();
        let sitemap_outcome = self
            .probe_sitemap(&origin, &advertised_sitemaps, &budget)
            .await;
        diag.rec("sitemap", sitemap_started);
        checks.push(checks::sitemap_check(&sitemap_outcome));

        let variant_started = Instant::now();
        let variant_outcome = self.probe_www_variant(&final_url, &budget).await;
        diag.rec("www-variant", variant_started);
        checks.push(checks::www_check(&variant_outcome));

        checks.push(checks::canonical_check(&page.canonicals, &final_url));

        let directives = RobotsDirectives {
            meta_robots: page.meta("robots"),
            meta_googlebot: page.meta("googlebot"),
            meta_bingbot: page.meta("bingbot"),
            x_robots_tag: x_robots_tag.as_deref(),
        };
        let (noindex, meta_robots) = checks::noindex_checks(&directives);
        checks.push(noindex);
        checks.push(meta_robots);

        checks.push(checks::meta_description_check(page.meta("description")));
        checks.push(checks::title_check(&page.title));
        checks.push(checks::viewport_check(page.meta("viewport").is_some()));

        checks.push(checks::img_alt_check(&page.images));
        checks.push(checks::img_modern_check(&page.images));
        checks.push(checks::img_lazy_check(&page.images));

        let img_size_started = Instant::now();
        if let Some((oversized, probed)) = self
            .probe_image_sizes(&page.images, &final_url, &budget)
            .await
        {
            checks.push(checks::img_size_check(oversized, probed));
        }
        diag.rec("img-size", img_size_started);

        let psi_started = Instant::now();
        let speed = self.probe_psi(final_url.as_str(), &budget).await;
        diag.rec("psi", psi_started);
        if let Some(score) = speed {
            checks.push(checks::psi_check(score));
        }

        checks.extend(checks::locked_placeholders());
        let score = overall_score(&checks);
        info!(url = %normalized, score, timing_ms, "audit complete");

        Ok(Report {
            ok: true,
            url: raw_url.trim().to_string(),
            normalized_url: normalized,
            final_url: final_url.to_string(),
            fetched_status: status,
            timing_ms,
            title: page.title.clone(),
            meta_description: page.meta("description").unwrap_or_default().to_string(),
            speed,
            score: Some(score),
            checks,
            blocked: None,
            timeout: None,
            cached: None,
            cache_age_ms: None,
            share_blob_path: None,
            share_blob_url: None,
            share_url: None,
            generated_at: Utc::now(),
            diag: diag.into_entries(),
        })
    }

    /// The origin never answered the page fetch in time. Still worth probing
    /// the cheap infrastructure endpoints with whatever budget remains.
    async fn timeout_report(
        &self,
        raw_url: &str,
        target: &Url,
        budget: &Budget,
        mut diag: Diag,
    ) -> Report {
        warn!(url = %target, "page fetch timed out, degrading");
        let origin = origin_of(target);
        let mut checks = vec![checks::timeout_check(budget.overall_ms())];

        let favicon_started = Instant::now();
        let favicon_loads = self.probe_favicon(None, &origin, budget).await;
        diag.rec("favicon", favicon_started);
        checks.push(checks::favicon_check(favicon_loads));

        let robots_started = Instant::now();
        let (robots_outcome, advertised) = self.probe_robots(&origin, budget).await;
        diag.rec("robots", robots_started);
        checks.push(checks::robots_check(&robots_outcome));

        let sweep_started = Instant::now();
        let sitemap_outcome = self.sitemap_head_sweep(&origin, &advertised, budget).await;
        diag.rec("sitemap-sweep", sweep_started);
        checks.push(checks::sitemap_check(&sitemap_outcome));

        let psi_started = Instant::now();
        let speed = self.probe_psi(target.as_str(), budget).await;
        diag.rec("psi", psi_started);
        if let Some(score) = speed {
            checks.push(checks::psi_check(score));
        }

        checks.extend(checks::locked_placeholders());

        Report {
            ok: true,
            url: raw_url.trim().to_string(),
            normalized_url: target.to_string(),
            final_url: target.to_string(),
            fetched_status: 0,
            timing_ms: budget.overall_ms(),
            title: String::new(),
            meta_description: String::new(),
            speed,
            score: None,
            checks,
            blocked: None,
            timeout: Some(true),
            cached: None,
            cache_age_ms: None,
            share_blob_path: None,
            share_blob_url: None,
            share_url: None,
            generated_at: Utc::now(),
            diag: diag.into_entries(),
        }
    }

    /// Both the default and the browser-header attempt got a block status.
    async fn blocked_report(
        &self,
        raw_url: &str,
        target: &Url,
        status: u16,
        budget: &Budget,
        mut diag: Diag,
    ) -> Report {
        warn!(url = %target, status, "origin blocked the audit");
        let origin = origin_of(target);
        let mut checks = vec![checks::blocked_check(status)];

        let robots_started = Instant::now();
        let (robots_outcome, advertised) = self.probe_robots(&origin, budget).await;
        diag.rec("robots", robots_started);
        checks.push(checks::robots_check(&robots_outcome));

        let sweep_started = Instant::now();
        let sitemap_outcome = self.sitemap_head_sweep(&origin, &advertised, budget).await;
        diag.rec("sitemap-sweep", sweep_started);
        checks.push(checks::sitemap_check(&sitemap_outcome));

        let favicon_started = Instant::now();
        let favicon_loads = self.probe_favicon(None, &origin, budget).await;
        diag.rec("favicon", favicon_started);
        checks.push(checks::favicon_check(favicon_loads));

        checks.extend(checks::locked_placeholders());

        Report {
            ok: true,
            url: raw_url.trim().to_string(),
            normalized_url: target.to_string(),
            final_url: target.to_string(),
            fetched_status: status,
            timing_ms: budget.elapsed_ms(),
            title: String::new(),
            meta_description: String::new(),
            speed: None,
            score: None,
            checks,
            blocked: Some(true),
            timeout: None,
            cached: None,
            cache_age_ms: None,
            share_blob_path: None,
            share_blob_url: None,
            share_url: None,
            generated_at: Utc::now(),
            diag: diag.into_entries(),
        }
    }

    /// GET the og:image; None when the probe could not run at all.
    async fn probe_image_loads(&self, src: &str, base: &Url, budget: &Budget) -> Option<bool> {
        let url = base.join(src).ok()?;
        if !is_http(&url) {
            return None;
        }
        if !budget.spend(1) {
            debug!("og:image probe skipped, quota exhausted");
            return None;
        }
        match self
            .prober
            .get(url.as_str(), &ProbeOptions::new(budget.within(ASSET_TIMEOUT_MS)))
            .await
        {
            Ok(resp) => Some(resp.status().is_success()),
            Err(_) => Some(false),
        }
    }

    async fn probe_favicon(
        &self,
        icon_href: Option<&str>,
        base: &Url,
        budget: &Budget,
    ) -> Option<bool> {
        let href = icon_href.unwrap_or("/favicon.ico");
        let url = base.join(href).ok()?;
        if !is_http(&url) {
            return None;
        }
        let opts = ProbeOptions::new(budget.within(ASSET_TIMEOUT_MS));
        match self.prober.head_then_get(url.as_str(), &opts, true).await {
            Ok(resp) => Some(resp.status().is_success()),
            Err(_) => Some(false),
        }
    }

    async fn probe_robots(&self, origin: &Url, budget: &Budget) -> (RobotsOutcome, Vec<String>) {
        let Ok(url) = origin.join("/robots.txt") else {
            return (RobotsOutcome::Unknown, Vec::new());
        };
        let opts = ProbeOptions::new(budget.within(SMALL_TIMEOUT_MS));
        match self.prober.get(url.as_str(), &opts).await {
            Ok(resp) if resp.status().is_success() => {
                let text = resp.text().await.unwrap_or_default();
                let advertised = parser::robots_sitemaps(&text);
                let outcome = RobotsOutcome::Found {
                    disallows_all: parser::robots_disallows_all(&text),
                };
                (outcome, advertised)
            }
            Ok(_) => (RobotsOutcome::NotFound, Vec::new()),
            Err(err) => {
                debug!(error = %err, "robots probe failed");
                (RobotsOutcome::Unknown, Vec::new())
            }
        }
    }

    fn sitemap_candidates(&self, origin: &Url, advertised: &[String]) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        let mut push = |url: Url| {
            let url = url.to_string();
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        };
        // Robots-advertised sitemaps take priority over the well-known paths.
        for raw in advertised {
            if let Ok(resolved) = origin.join(raw) {
                if is_http(&resolved) {
                    push(resolved);
                }
            }
        }
        for path in WELL_KNOWN_SITEMAP_PATHS {
            if let Ok(resolved) = origin.join(path) {
                push(resolved);
            }
        }
        candidates
    }

    /// Full sitemap discovery: find one, refuse gzip, parse `<loc>`s, sample.
    async fn probe_sitemap(
        &self,
        origin: &Url,
        advertised: &[String],
        budget: &Budget,
    ) -> SitemapOutcome {
        for candidate in self.sitemap_candidates(origin, advertised) {
            let opts = ProbeOptions::new(budget.within(SMALL_TIMEOUT_MS));
            let Ok(resp) = self.prober.head_then_get(&candidate, &opts, true).await else {
                continue;
            };
            if !resp.status().is_success() {
                continue;
            }
            let content_type = resp
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if parser::looks_gzipped(&candidate, content_type.as_deref()) {
                return SitemapOutcome::Gzipped { url: candidate };
            }

            let xml = match self
                .prober
                .get(&candidate, &ProbeOptions::new(budget.within(PAGE_TIMEOUT_MS)))
                .await
            {
                Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
                _ => {
                    return SitemapOutcome::Unverified {
                        url: candidate,
                        reason: "sitemap body could not be fetched".to_string(),
                    }
                }
            };
            let locs = parser::locs(&xml);
            if locs.is_empty() {
                return SitemapOutcome::Unverified {
                    url: candidate,
                    reason: "no <loc> entries found".to_string(),
                };
            }

            for sample in locs.iter().take(SITEMAP_SAMPLES) {
                if !budget.spend(1) {
                    return SitemapOutcome::Unverified {
                        url: candidate,
                        reason: "quota exhausted before sampling".to_string(),
                    };
                }
                let opts = ProbeOptions::new(budget.within(ASSET_TIMEOUT_MS));
                if let Ok(resp) = self.prober.head_then_get(sample, &opts, true).await {
                    if resp.status().is_success() {
                        return SitemapOutcome::Verified {
                            url: candidate,
                            sampled: sample.clone(),
                        };
                    }
                }
            }
            return SitemapOutcome::Unverified {
                url: candidate,
                reason: "sampled URL did not load".to_string(),
            };
        }
        SitemapOutcome::NotFound
    }

    /// Existence-only sweep used on the degraded paths.
    async fn sitemap_head_sweep(
        &self,
        origin: &Url,
        advertised: &[String],
        budget: &Budget,
    ) -> SitemapOutcome {
        for candidate in self.sitemap_candidates(origin, advertised) {
            let opts = ProbeOptions::new(budget.within(SMALL_TIMEOUT_MS));
            if let Ok(resp) = self.prober.head_then_get(&candidate, &opts, true).await {
                if resp.status().is_success() {
                    return SitemapOutcome::Unverified {
                        url: candidate,
                        reason: "found; content not verified".to_string(),
                    };
                }
            }
        }
        SitemapOutcome::NotFound
    }

    async fn probe_www_variant(&self, final_url: &Url, budget: &Budget) -> VariantOutcome {
        let Some(host) = final_url.host_str() else {
            return VariantOutcome::NotApplicable;
        };
        let canonical_host = host.to_ascii_lowercase();
        let Some(variant_host) = flip_www(&canonical_host) else {
            return VariantOutcome::NotApplicable;
        };
        let mut variant = origin_of(final_url);
        if variant.set_host(Some(&variant_host)).is_err() {
            return VariantOutcome::NotApplicable;
        }
        if !budget.spend(1) {
            return VariantOutcome::Unknown;
        }

        let opts = ProbeOptions::new(budget.within(SMALL_TIMEOUT_MS)).manual_redirect();
        match self.prober.fetch(variant.as_str(), Method::GET, &opts).await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if !matches!(status, 301 | 302 | 307 | 308) {
                    return VariantOutcome::NoRedirect {
                        variant_host,
                        detail: format!("answered HTTP {status} without redirecting"),
                    };
                }
                let location_host = resp
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|loc| variant.join(loc).ok())
                    .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));
                if location_host.as_deref() == Some(canonical_host.as_str()) {
                    VariantOutcome::GoodRedirect {
                        variant_host,
                        status,
                    }
                } else {
                    VariantOutcome::NoRedirect {
                        variant_host,
                        detail: format!("redirects elsewhere (HTTP {status})"),
                    }
                }
            }
            Err(err) => VariantOutcome::NoRedirect {
                variant_host,
                detail: format!("did not answer ({err})"),
            },
        }
    }

    /// HEAD up to IMAGE_HEADS image srcs; None when nothing was probed.
    async fn probe_image_sizes(
        &self,
        images: &[ImgTag],
        base: &Url,
        budget: &Budget,
    ) -> Option<(usize, usize)> {
        let candidates: Vec<Url> = images
            .iter()
            .filter_map(|img| img.src.as_deref())
            .filter_map(|src| base.join(src).ok())
            .filter(is_http)
            .take(IMAGE_HEADS)
            .collect();

        let mut probed = 0;
        let mut oversized = 0;
        for url in candidates {
            if !budget.spend(1) {
                break;
            }
            let opts = ProbeOptions::new(budget.within(ASSET_TIMEOUT_MS));
            let Ok(resp) = self.prober.fetch(url.as_str(), Method::HEAD, &opts).await else {
                continue;
            };
            probed += 1;
            let length = resp
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            if length.map(|n| n > MAX_IMAGE_BYTES).unwrap_or(false) {
                oversized += 1;
            }
        }
        (probed > 0).then_some((oversized, probed))
    }

    async fn probe_psi(&self, target: &str, budget: &Budget) -> Option<u32> {
        let key = self.psi_api_key.as_deref()?;
        if budget.time_left_ms() < PSI_MIN_REMAINING_MS || !budget.spend(1) {
            return None;
        }
        fetch_psi_score(&self.prober, key, target, budget.within(PSI_TIMEOUT_MS)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_path_query_and_fragment() {
        let url = Url::parse("https://example.com/deep/page?q=1#frag").unwrap();
        assert_eq!(origin_of(&url).as_str(), "https://example.com/");
    }

    #[test]
    fn sitemap_candidates_prefer_robots_and_dedupe() {
        let config = AppConfig::default();
        let auditor = Auditor::new(&config).unwrap();
        let origin = Url::parse("https://example.com/").unwrap();
        let advertised = vec![
            "https://example.com/custom-map.xml".to_string(),
            "https://example.com/sitemap.xml".to_string(),
        ];
        let candidates = auditor.sitemap_candidates(&origin, &advertised);
        assert_eq!(candidates[0], "https://example.com/custom-map.xml");
        assert_eq!(candidates[1], "https://example.com/sitemap.xml");
        // The well-known list follows, minus the duplicate.
        assert_eq!(
            candidates.iter().filter(|c| c.ends_with("/sitemap.xml")).count(),
            1
        );
        assert!(candidates.contains(&"https://example.com/wp-sitemap.xml".to_string()));
    }
}
