//! Line-oriented robots.txt reading, limited to what the audit needs:
//! whether the wildcard agent is fully disallowed, and advertised sitemaps.

/// True when the `*` user-agent group contains a bare `Disallow: /`.
pub fn robots_disallows_all(robots: &str) -> bool {
    let mut in_wildcard_group = false;
    let mut seen_rule_since_agents = false;

    for raw in robots.lines() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim().to_ascii_lowercase();
        let value = value.trim();

        match field.as_str() {
            "user-agent" => {
                // A user-agent line after rules starts a new group.
                if seen_rule_since_agents {
                    in_wildcard_group = false;
                    seen_rule_since_agents = false;
                }
                if value == "*" {
                    in_wildcard_group = true;
                }
            }
            "disallow" => {
                seen_rule_since_agents = true;
                if in_wildcard_group && value == "/" {
                    return true;
                }
            }
            "allow" | "crawl-delay" => {
                seen_rule_since_agents = true;
            }
            _ => {}
        }
    }
    false
}

/// Values of every `Sitemap:` line, in order.
pub fn robots_sitemaps(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|raw| {
            let line = raw.split('#').next().unwrap_or("").trim();
            let (field, value) = line.split_once(':')?;
            if field.trim().eq_ignore_ascii_case("sitemap") {
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            } else {
                None
            }
        })
        .collect()
}
