use webaudit_core::{Check, CheckStatus};

use crate::checks::id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Seo,
    Performance,
    Security,
}

const CATEGORY_WEIGHTS: [(Category, f64); 3] = [
    (Category::Seo, 0.55),
    (Category::Performance, 0.35),
    (Category::Security, 0.10),
];

/// Categories never score below this; one bad finding should dent the
/// overall number, not zero it through the harmonic mean.
const CATEGORY_FLOOR: f64 = 0.05;

fn category(check_id: &str) -> Option<Category> {
    match check_id {
        id::SITEMAP
        | id::ROBOTS
        | id::WWW_CANONICAL
        | id::CANONICAL
        | id::NOINDEX
        | id::META_ROBOTS
        | id::META_DESCRIPTION
        | id::TITLE_LENGTH
        | id::VIEWPORT
        | id::IMG_ALT
        | id::OPENGRAPH
        | id::FAVICON
        | id::STRUCTURED_DATA
        | id::H1_STRUCTURE
        | id::LLMS => Some(Category::Seo),
        id::PSI | id::TTFB | id::IMG_SIZE | id::IMG_MODERN | id::IMG_LAZY | id::COMPRESSION => {
            Some(Category::Performance)
        }
        id::HTTP | id::HTTPS_REDIRECT | id::MIXED_CONTENT | id::SECURITY_HEADERS => {
            Some(Category::Security)
        }
        _ => None,
    }
}

fn weight(check_id: &str) -> f64 {
    match check_id {
        id::SITEMAP => 2.2,
        id::CANONICAL => 2.0,
        id::ROBOTS => 1.6,
        id::WWW_CANONICAL => 1.2,
        id::NOINDEX => 5.0,
        id::META_ROBOTS => 1.0,
        id::IMG_ALT => 1.2,
        id::VIEWPORT => 1.1,
        id::META_DESCRIPTION => 0.8,
        id::TITLE_LENGTH => 0.8,
        id::OPENGRAPH => 0.5,
        id::FAVICON => 0.3,
        id::PSI => 2.4,
        id::TTFB => 1.4,
        id::IMG_SIZE => 1.2,
        id::IMG_MODERN => 0.8,
        id::IMG_LAZY => 0.6,
        id::HTTP => 2.0,
        id::HTTPS_REDIRECT => 1.8,
        id::MIXED_CONTENT => 1.8,
        id::SECURITY_HEADERS => 1.0,
        id::COMPRESSION => 1.2,
        id::STRUCTURED_DATA => 1.4,
        _ => 1.0,
    }
}

fn status_value(status: CheckStatus) -> f64 {
    match status {
        CheckStatus::Pass => 1.0,
        CheckStatus::Warn => 0.5,
        CheckStatus::Fail => 0.0,
        CheckStatus::Locked => 0.0,
    }
}

fn is_live(check: &Check) -> bool {
    check.status != CheckStatus::Locked
        && check.locked != Some(true)
        && check.id != id::BLOCKED
        && check.id != id::TIMEOUT
}

/// Weighted harmonic mean over per-category weighted scores, then the hard
/// gates, in order.
pub fn overall_score(checks: &[Check]) -> u32 {
    let mut sums: Vec<(Category, f64, f64)> = CATEGORY_WEIGHTS
        .iter()
        .map(|(cat, _)| (*cat, 0.0, 0.0))
        .collect();

    for check in checks.iter().filter(|c| is_live(c)) {
        let Some(cat) = category(&check.id) else {
            continue;
        };
        let w = weight(&check.id);
        let v = status_value(check.status);
        for entry in sums.iter_mut() {
            if entry.0 == cat {
                entry.1 += w * v;
                entry.2 += w;
            }
        }
    }

    let mut weight_total = 0.0;
    let mut weighted_reciprocal = 0.0;
    for (cat, cat_weight) in CATEGORY_WEIGHTS {
        let Some((_, wv, w)) = sums.iter().find(|(c, _, _)| *c == cat) else {
            continue;
        };
        if *w <= 0.0 {
            continue;
        }
        let score = (wv / w).clamp(CATEGORY_FLOOR, 1.0);
        weight_total += cat_weight;
        weighted_reciprocal += cat_weight / score;
    }

    if weighted_reciprocal <= 0.0 {
        return 0;
    }
    let mut score = ((weight_total / weighted_reciprocal) * 100.0).round() as i64;

    let failed = |check_id: &str| {
        checks
            .iter()
            .any(|c| c.id == check_id && c.status == CheckStatus::Fail)
    };
    if failed(id::NOINDEX) {
        return 0;
    }
    if failed(id::HTTP) {
        score = score.min(40);
    }
    if failed(id::CANONICAL) {
        score = score.min(65);
    }
    if failed(id::SITEMAP) || failed(id::ROBOTS) {
        score = score.min(80);
    }
    score.clamp(0, 100) as u32
}
