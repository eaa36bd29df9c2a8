pub mod html;
pub mod robots;
pub mod sitemap;

pub use html::{
    canonical_links, icon_href, img_tags, json_ld_blocks, meta_by_name, meta_by_property,
    parse_page, title, ImgTag, PageExtract,
};
pub use robots::{robots_disallows_all, robots_sitemaps};
pub use sitemap::{locs, looks_gzipped};

/// Max bytes to parse (5 MB). Larger bodies are truncated before parsing.
pub const MAX_PARSE_SIZE: usize = 5 * 1024 * 1024;

/// Decode a response body for parsing, truncating oversized payloads.
pub fn decode_body(body: &[u8]) -> String {
    let slice = if body.len() > MAX_PARSE_SIZE {
        &body[..MAX_PARSE_SIZE]
    } else {
        body
    };
    String::from_utf8_lossy(slice).into_owned()
}
