use reqwest::RequestBuilder;

/// Identifies the auditor honestly on the default profile.
pub const DEFAULT_UA: &str = "Mozilla/5.0 (compatible; WebauditBot/0.1; +https://webaudit.dev/bot)";

/// A current desktop Chrome UA for origins that reject minimal clients.
pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Outbound header profile. `Browser` is used on WAF retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderProfile {
    #[default]
    Default,
    Browser,
}

impl HeaderProfile {
    pub fn apply(self, req: RequestBuilder) -> RequestBuilder {
        match self {
            HeaderProfile::Default => req
                .header("user-agent", DEFAULT_UA)
                .header("accept", "*/*"),
            HeaderProfile::Browser => req
                .header("user-agent", BROWSER_UA)
                .header(
                    "accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
                )
                .header("accept-language", "en-US,en;q=0.9")
                .header(
                    "sec-ch-ua",
                    "\"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"",
                )
                .header("sec-ch-ua-mobile", "?0")
                .header("sec-ch-ua-platform", "\"Windows\"")
                .header("sec-fetch-dest", "document")
                .header("sec-fetch-mode", "navigate")
                .header("sec-fetch-site", "cross-site")
                .header("sec-fetch-user", "?1")
                .header("upgrade-insecure-requests", "1")
                .header("referer", "https://www.google.com/"),
        }
    }
}
