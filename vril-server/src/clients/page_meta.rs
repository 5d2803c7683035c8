//! Page metadata scraper
//!
//! Fetches an arbitrary article URL and pulls the `<title>` text and the
//! meta description out of the response body. Articles are saved even
//! when the page is unreachable, so every failure path here collapses to
//! `None` and the caller falls back to the URL itself as the title.

use crate::text;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

const USER_AGENT: &str = "vril-tracker/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_TITLE_CHARS: usize = 200;

/// Scraped page metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
}

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"))
}

fn description_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?is)<meta[^>]*name\s*=\s*["']description["'][^>]*content\s*=\s*["']([^"']*)["']"#,
        )
        .expect("valid regex")
    })
}

/// Metadata scraping client
#[derive(Debug, Clone)]
pub struct PageMetaClient {
    http_client: reqwest::Client,
    max_title_chars: usize,
}

impl PageMetaClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            max_title_chars: MAX_TITLE_CHARS,
        })
    }

    /// Override the title character budget
    pub fn with_max_title_chars(mut self, max_title_chars: usize) -> Self {
        self.max_title_chars = max_title_chars;
        self
    }

    /// Fetch a page and extract its title/description
    ///
    /// Returns `None` when the page is unreachable, non-200, or has no
    /// usable `<title>` tag.
    pub async fn fetch_page_meta(&self, url: &str) -> Option<PageMeta> {
        let response = match self.http_client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to fetch article page");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "Article page returned non-200");
            return None;
        }

        let html = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to read article page body");
                return None;
            }
        };

        let title = extract_title(&html, self.max_title_chars)?;
        let description = extract_description(&html).unwrap_or_default();

        Some(PageMeta { title, description })
    }
}

/// Pull the first non-empty `<title>` text out of an HTML document
fn extract_title(html: &str, max_chars: usize) -> Option<String> {
    for capture in title_regex().captures_iter(html) {
        let raw = capture.get(1)?.as_str();
        let decoded = text::decode_entities(raw);
        let cleaned = decoded.split_whitespace().collect::<Vec<_>>().join(" ");

        if !cleaned.is_empty() {
            return Some(text::truncate_with_ellipsis(&cleaned, max_chars));
        }
    }

    None
}

/// Pull the meta description, when one exists
fn extract_description(html: &str) -> Option<String> {
    let capture = description_regex().captures(html)?;
    let decoded = text::decode_entities(capture.get(1)?.as_str());
    let cleaned = decoded.trim().to_string();

    (!cleaned.is_empty()).then_some(cleaned)
}
