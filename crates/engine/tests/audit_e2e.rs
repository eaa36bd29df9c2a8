//! Orchestrator scenarios against a local mock origin.

use std::collections::HashSet;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webaudit_core::{AppConfig, Check, CheckStatus, Report};
use webaudit_engine::Auditor;

const LOCKED_IDS: [&str; 7] = [
    "mixed-content",
    "security-headers",
    "https-redirect",
    "compression",
    "structured-data",
    "h1-structure",
    "llms",
];

fn config() -> AppConfig {
    AppConfig::default()
}

fn check<'a>(report: &'a Report, id: &str) -> &'a Check {
    report
        .check(id)
        .unwrap_or_else(|| panic!("missing check {id}"))
}

fn assert_no_duplicate_ids(report: &Report) {
    let mut seen = HashSet::new();
    for c in &report.checks {
        assert!(seen.insert(c.id.clone()), "duplicate check id {}", c.id);
    }
}

fn assert_locked_placeholders(report: &Report) {
    for id in LOCKED_IDS {
        let c = check(report, id);
        assert_eq!(c.status, CheckStatus::Locked, "{id} should be locked");
        assert_eq!(c.locked, Some(true));
    }
}

fn healthy_html(base: &str) -> String {
    let description = "This is a demonstration landing page with a meta description long enough to sit comfortably inside the recommended range.";
    assert!(description.len() >= 50 && description.len() <= 160);
    format!(
        r#"<html><head>
            <title>Hello World Site</title>
            <meta name="description" content="{description}">
            <meta name="viewport" content="width=device-width, initial-scale=1">
            <link rel="canonical" href="{base}/">
            <link rel="icon" href="/favicon.ico">
            <meta property="og:title" content="Hello World Site">
            <meta property="og:image" content="{base}/og.png">
        </head><body>
            <h1>Hello</h1>
            <img src="/hero.webp" alt="hero image" loading="lazy">
        </body></html>"#
    )
}

async fn mount_healthy(server: &MockServer) {
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(healthy_html(&base)),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow:\n"),
        )
        .mount(server)
        .await;
    // Sitemap and assets answer any method so HEAD probes hit them too.
    Mock::given(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(format!(
                    "<?xml version=\"1.0\"?><urlset><url><loc>{base}/about</loc></url></urlset>"
                )),
        )
        .mount(server)
        .await;
    Mock::given(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_string("about"))
        .mount(server)
        .await;
    Mock::given(path("/og.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 128]))
        .mount(server)
        .await;
    Mock::given(path("/favicon.ico"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
        .mount(server)
        .await;
    Mock::given(path("/hero.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
        .mount(server)
        .await;
}

#[tokio::test]
async fn healthy_site_passes_the_core_checks() {
    let server = MockServer::start().await;
    mount_healthy(&server).await;

    let auditor = Auditor::new(&config()).unwrap();
    let report = auditor.run(&server.uri()).await.unwrap();

    assert!(report.ok);
    assert_eq!(report.fetched_status, 200);
    assert_eq!(report.title, "Hello World Site");
    assert!(report.blocked.is_none());
    assert!(report.timeout.is_none());

    for id in [
        "http",
        "title-length",
        "meta-description",
        "viewport",
        "canonical",
        "robots",
        "sitemap",
        "noindex",
        "favicon",
        "opengraph",
        "img-alt",
        "img-modern",
        "img-lazy",
        "img-size",
    ] {
        assert_eq!(
            check(&report, id).status,
            CheckStatus::Pass,
            "{id} should pass: {:?}",
            check(&report, id).details
        );
    }
    // Local addresses have no www counterpart.
    assert_eq!(check(&report, "www-canonical").status, CheckStatus::Warn);

    assert!(report.score.unwrap() >= 80, "score {:?}", report.score);
    assert_no_duplicate_ids(&report);
    assert_locked_placeholders(&report);
    assert!(report.check("psi").is_none());
    assert!(report.check("blocked").is_none());
    assert!(report.check("timeout").is_none());
}

#[tokio::test]
async fn noindex_page_scores_zero() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><head>
                        <title>Hello World Site</title>
                        <meta name="robots" content="noindex">
                        <link rel="canonical" href="{base}/">
                    </head><body></body></html>"#
                )),
        )
        .mount(&server)
        .await;

    let auditor = Auditor::new(&config()).unwrap();
    let report = auditor.run(&server.uri()).await.unwrap();

    assert_eq!(check(&report, "noindex").status, CheckStatus::Fail);
    assert_eq!(check(&report, "meta-robots").status, CheckStatus::Warn);
    assert_eq!(report.score, Some(0));
}

#[tokio::test]
async fn waf_block_degrades_to_a_blocked_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let auditor = Auditor::new(&config()).unwrap();
    let report = auditor.run(&server.uri()).await.unwrap();

    assert!(report.ok);
    assert_eq!(report.blocked, Some(true));
    assert_eq!(report.fetched_status, 403);
    assert!(report.score.is_none());

    assert_eq!(check(&report, "blocked").status, CheckStatus::Fail);
    assert!(report.check("http").is_none());
    assert!(report.check("ttfb").is_none());
    // Best-effort infrastructure findings are still present.
    assert!(report.check("robots").is_some());
    assert!(report.check("sitemap").is_some());
    assert!(report.check("favicon").is_some());
    assert_locked_placeholders(&report);
    assert_no_duplicate_ids(&report);

    // Both the default and the browser-header attempt were made.
    let requests = server.received_requests().await.unwrap();
    let page_hits = requests
        .iter()
        .filter(|r| r.url.path() == "/" && r.method.to_string() == "GET")
        .count();
    assert_eq!(page_hits, 2);
}

#[tokio::test]
async fn slow_origin_degrades_to_a_timeout_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(8))
                .set_body_string("late"),
        )
        .mount(&server)
        .await;
    Mock::given(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut config = config();
    config.audit.budget_ms = 1_200;
    let auditor = Auditor::new(&config).unwrap();
    let report = auditor.run(&server.uri()).await.unwrap();

    assert!(report.ok);
    assert_eq!(report.timeout, Some(true));
    assert_eq!(report.fetched_status, 0);
    assert_eq!(report.timing_ms, 1_200);
    assert_eq!(report.title, "");
    assert_eq!(report.meta_description, "");
    assert!(report.score.is_none());

    assert_eq!(check(&report, "timeout").status, CheckStatus::Warn);
    assert!(report.check("http").is_none());
    assert!(report.check("robots").is_some());
    assert!(report.check("sitemap").is_some());
    assert!(report.check("favicon").is_some());
    assert_locked_placeholders(&report);
    assert_no_duplicate_ids(&report);
}

#[tokio::test]
async fn gzipped_sitemap_is_reported_not_parsed() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><head><title>Hello World Site</title>
                        <link rel="canonical" href="{base}/"></head><body></body></html>"#
                )),
        )
        .mount(&server)
        .await;
    Mock::given(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/gzip")
                .set_body_bytes(vec![0x1f, 0x8b, 0x08, 0x00]),
        )
        .mount(&server)
        .await;

    let auditor = Auditor::new(&config()).unwrap();
    let report = auditor.run(&server.uri()).await.unwrap();

    let sitemap = check(&report, "sitemap");
    assert_eq!(sitemap.status, CheckStatus::Warn);
    let details = sitemap.details.as_deref().unwrap();
    assert!(details.contains("Gzipped"), "details: {details}");
    assert!(details.contains("/sitemap.xml"), "details: {details}");

    // The gzip body must never have been fetched a second time for parsing.
    let requests = server.received_requests().await.unwrap();
    let sitemap_gets = requests
        .iter()
        .filter(|r| r.url.path() == "/sitemap.xml" && r.method.to_string() == "GET")
        .count();
    assert!(sitemap_gets <= 1, "gzipped sitemap fetched {sitemap_gets} times");
}

#[tokio::test]
async fn multiple_canonicals_warn_without_capping() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><head><title>Hello World Site</title>
                        <link rel="canonical" href="{base}/">
                        <link rel="canonical" href="{base}/alt">
                    </head><body></body></html>"#
                )),
        )
        .mount(&server)
        .await;

    let auditor = Auditor::new(&config()).unwrap();
    let report = auditor.run(&server.uri()).await.unwrap();

    let canonical = check(&report, "canonical");
    assert_eq!(canonical.status, CheckStatus::Warn);
    assert!(canonical.details.as_deref().unwrap().contains("2 canonical"));
}
