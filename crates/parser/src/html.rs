use std::collections::HashMap;

use scraper::{Html, Selector};

/// Only the first 40 image tags are considered per page.
const MAX_IMG_TAGS: usize = 40;
/// Only the first 5 JSON-LD blocks are kept.
const MAX_JSON_LD_BLOCKS: usize = 5;

/// One `<img>` tag, reduced to the attributes the audit cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct ImgTag {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub loading: Option<String>,
}

/// Everything the audit reads from a landing page, extracted in one parse.
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    pub title: String,
    /// First-match-wins `<meta name=…>` contents, names lowercased.
    pub meta_by_name: HashMap<String, String>,
    /// First-match-wins `<meta property=…>` contents, properties lowercased.
    pub meta_by_property: HashMap<String, String>,
    /// All canonical link hrefs, in document order.
    pub canonicals: Vec<String>,
    pub icon_href: Option<String>,
    pub images: Vec<ImgTag>,
    pub json_ld: Vec<String>,
}

impl PageExtract {
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta_by_name.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn property(&self, property: &str) -> Option<&str> {
        self.meta_by_property
            .get(&property.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Parse a page once and pull out every field the audit needs.
pub fn parse_page(html: &str) -> PageExtract {
    let document = Html::parse_document(html);

    let mut meta_by_name = HashMap::new();
    let mut meta_by_property = HashMap::new();
    if let Some(sel) = selector("meta") {
        for el in document.select(&sel) {
            let Some(content) = el.value().attr("content") else {
                continue;
            };
            if let Some(name) = el.value().attr("name") {
                meta_by_name
                    .entry(name.trim().to_ascii_lowercase())
                    .or_insert_with(|| content.to_string());
            }
            if let Some(property) = el.value().attr("property") {
                meta_by_property
                    .entry(property.trim().to_ascii_lowercase())
                    .or_insert_with(|| content.to_string());
            }
        }
    }

    PageExtract {
        title: title_in(&document),
        meta_by_name,
        meta_by_property,
        canonicals: canonical_links_in(&document),
        icon_href: icon_href_in(&document),
        images: img_tags_in(&document),
        json_ld: json_ld_blocks_in(&document),
    }
}

/// First `<title>` text, trimmed. Empty string when absent.
pub fn title(html: &str) -> String {
    title_in(&Html::parse_document(html))
}

/// First `<meta name=…>` content for the given name, case-insensitive.
pub fn meta_by_name(html: &str, name: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_meta_attr(&document, "name", name)
}

/// First `<meta property=…>` content for the given property, case-insensitive.
pub fn meta_by_property(html: &str, property: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_meta_attr(&document, "property", property)
}

/// All `<link rel=canonical>` hrefs in document order, duplicates preserved.
pub fn canonical_links(html: &str) -> Vec<String> {
    canonical_links_in(&Html::parse_document(html))
}

/// First `<link rel=…icon…>` href, if any.
pub fn icon_href(html: &str) -> Option<String> {
    icon_href_in(&Html::parse_document(html))
}

/// First 40 `<img>` tags.
pub fn img_tags(html: &str) -> Vec<ImgTag> {
    img_tags_in(&Html::parse_document(html))
}

/// Raw bodies of the first 5 `<script type=application/ld+json>` blocks.
pub fn json_ld_blocks(html: &str) -> Vec<String> {
    json_ld_blocks_in(&Html::parse_document(html))
}

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

fn title_in(document: &Html) -> String {
    selector("title")
        .and_then(|s| document.select(&s).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn first_meta_attr(document: &Html, attr: &str, wanted: &str) -> Option<String> {
    let sel = selector("meta")?;
    document.select(&sel).find_map(|el| {
        let key = el.value().attr(attr)?;
        if key.trim().eq_ignore_ascii_case(wanted) {
            el.value().attr("content").map(|c| c.to_string())
        } else {
            None
        }
    })
}

fn rel_contains(el: &scraper::ElementRef<'_>, token: &str) -> bool {
    el.value()
        .attr("rel")
        .map(|rel| {
            rel.split_whitespace()
                .any(|part| part.to_ascii_lowercase().contains(token))
        })
        .unwrap_or(false)
}

fn canonical_links_in(document: &Html) -> Vec<String> {
    let Some(sel) = selector("link") else {
        return vec![];
    };
    document
        .select(&sel)
        .filter(|el| rel_contains(el, "canonical"))
        .filter_map(|el| el.value().attr("href").map(|h| h.trim().to_string()))
        .filter(|href| !href.is_empty())
        .collect()
}

fn icon_href_in(document: &Html) -> Option<String> {
    let sel = selector("link")?;
    document
        .select(&sel)
        .filter(|el| rel_contains(el, "icon"))
        .find_map(|el| el.value().attr("href").map(|h| h.trim().to_string()))
        .filter(|href| !href.is_empty())
}

fn img_tags_in(document: &Html) -> Vec<ImgTag> {
    let Some(sel) = selector("img") else {
        return vec![];
    };
    document
        .select(&sel)
        .take(MAX_IMG_TAGS)
        .map(|el| ImgTag {
            src: el.value().attr("src").map(|s| s.trim().to_string()),
            alt: el.value().attr("alt").map(|s| s.to_string()),
            loading: el.value().attr("loading").map(|s| s.trim().to_ascii_lowercase()),
        })
        .collect()
}

fn json_ld_blocks_in(document: &Html) -> Vec<String> {
    let Some(sel) = selector("script") else {
        return vec![];
    };
    document
        .select(&sel)
        .filter(|el| {
            el.value()
                .attr("type")
                .map(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
                .unwrap_or(false)
        })
        .take(MAX_JSON_LD_BLOCKS)
        .map(|el| el.text().collect::<String>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_first_and_trimmed() {
        let html = "<html><head><TITLE>  Hello World \n</TITLE><title>second</title></head></html>";
        assert_eq!(title(html), "Hello World");
    }

    #[test]
    fn missing_title_is_empty() {
        assert_eq!(title("<html><body>no head</body></html>"), "");
    }

    #[test]
    fn meta_matching_is_case_insensitive_and_quote_agnostic() {
        let html = r#"<meta NAME=Description content='a page'>"#;
        assert_eq!(meta_by_name(html, "description").as_deref(), Some("a page"));

        let html = r#"<meta property="OG:TITLE" content="My Site">"#;
        assert_eq!(meta_by_property(html, "og:title").as_deref(), Some("My Site"));
    }

    #[test]
    fn meta_first_match_wins() {
        let html = r#"
            <meta name="description" content="first">
            <meta name="description" content="second">
        "#;
        assert_eq!(meta_by_name(html, "description").as_deref(), Some("first"));
    }

    #[test]
    fn canonical_links_keep_order_and_duplicates() {
        let html = r#"
            <link rel="canonical" href="https://a.example/">
            <link REL="Canonical" href=https://b.example/>
        "#;
        assert_eq!(
            canonical_links(html),
            vec!["https://a.example/".to_string(), "https://b.example/".to_string()]
        );
    }

    #[test]
    fn icon_first_match_wins_across_rel_variants() {
        let html = r#"
            <link rel="shortcut icon" href="/fav.ico">
            <link rel="icon" href="/other.png">
        "#;
        assert_eq!(icon_href(html).as_deref(), Some("/fav.ico"));
    }

    #[test]
    fn img_tags_truncate_at_forty() {
        let mut html = String::from("<body>");
        for i in 0..50 {
            html.push_str(&format!("<img src=\"/i{i}.png\" alt=\"pic {i}\">"));
        }
        html.push_str("</body>");
        let imgs = img_tags(&html);
        assert_eq!(imgs.len(), 40);
        assert_eq!(imgs[0].src.as_deref(), Some("/i0.png"));
        assert_eq!(imgs[0].alt.as_deref(), Some("pic 0"));
    }

    #[test]
    fn img_loading_attr_is_lowercased() {
        let imgs = img_tags(r#"<img src="a.webp" loading="LAZY">"#);
        assert_eq!(imgs[0].loading.as_deref(), Some("lazy"));
    }

    #[test]
    fn json_ld_blocks_truncate_at_five() {
        let mut html = String::new();
        for i in 0..7 {
            html.push_str(&format!(
                r#"<script type="application/ld+json">{{"n":{i}}}</script>"#
            ));
        }
        html.push_str(r#"<script type="text/javascript">ignored()</script>"#);
        let blocks = json_ld_blocks(&html);
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0], r#"{"n":0}"#);
    }

    #[test]
    fn parse_page_aggregates_everything() {
        let html = r#"
            <html><head>
              <title>Aggregate</title>
              <meta name="viewport" content="width=device-width">
              <meta property="og:image" content="https://cdn.example/og.png">
              <link rel="canonical" href="https://example.com/page">
              <link rel="icon" href="/favicon.svg">
            </head><body><img src="/hero.avif" alt="" loading="lazy"></body></html>
        "#;
        let page = parse_page(html);
        assert_eq!(page.title, "Aggregate");
        assert_eq!(page.meta("viewport"), Some("width=device-width"));
        assert_eq!(page.property("og:image"), Some("https://cdn.example/og.png"));
        assert_eq!(page.canonicals, vec!["https://example.com/page".to_string()]);
        assert_eq!(page.icon_href.as_deref(), Some("/favicon.svg"));
        assert_eq!(page.images.len(), 1);
        assert!(page.json_ld.is_empty());
    }
}
