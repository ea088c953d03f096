//! Blocking HTTP transport behind the [`Fetch`] contract.
//!
//! The site gates real content behind a cookie set by inline JavaScript on
//! the landing page, so a fresh client must bake its cookies once before
//! scraping.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tracing::{debug, info};
use url::Url;

use crate::document::{Document, Fetch, Query};
use crate::error::{ScrapeError, ScrapeResult};
use crate::locale::Locale;

/// Cookie assignment inside the landing page's init script.
static INIT_COOKIE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"setTimeout\(function\(\)\{document\.cookie="([^"]+)""#)
        .expect("init cookie pattern")
});

/// Cookie-carrying blocking client bound to one locale's site.
pub struct HttpFetcher {
    client: Client,
    jar: Arc<Jar>,
    base: Url,
}

impl HttpFetcher {
    pub fn new(locale: &Locale) -> ScrapeResult<Self> {
        let base = Url::parse(&locale.base_url())
            .map_err(|e| ScrapeError::http(locale.base_url(), e.to_string()))?;

        let jar = Arc::new(Jar::default());
        // the locale cookies steer server-side rendering
        jar.add_cookie_str(&format!("SiteForCur={}", locale.country), &base);
        jar.add_cookie_str(&format!("cur={}", locale.currency), &base);
        jar.add_cookie_str(&format!("website#lang={}", locale.long_lang), &base);

        let mut headers = HeaderMap::new();
        let accept = format!("{},{};q=0.9", locale.long_lang, locale.short_lang);
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&accept)
                .map_err(|e| ScrapeError::http(base.as_str(), e.to_string()))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(base.as_str())
                .map_err(|e| ScrapeError::http(base.as_str(), e.to_string()))?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .gzip(true)
            .default_headers(headers)
            .build()
            .map_err(|e| ScrapeError::http(base.as_str(), e.to_string()))?;

        Ok(Self { client, jar, base })
    }

    fn get(&self, path: &str, query: &Query) -> ScrapeResult<String> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ScrapeError::http(path, e.to_string()))?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .query(&query.pairs())
            .send()
            .map_err(|e| ScrapeError::http(url.as_str(), e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::http(
                url.as_str(),
                format!("status {status}"),
            ));
        }
        response
            .text()
            .map_err(|e| ScrapeError::http(url.as_str(), e.to_string()))
    }

    /// Fetch a landing page and adopt the cookies its init script would set.
    /// Without them every later request is served the landing page again.
    pub fn bake_cookies(&self, landing_path: &str) -> ScrapeResult<()> {
        let body = self.get(landing_path, &Query::new())?;
        let mut baked = 0;
        for caps in INIT_COOKIE_RE.captures_iter(&body) {
            self.jar.add_cookie_str(&caps[1], &self.base);
            baked += 1;
        }
        info!(baked, "baked init cookies");
        Ok(())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, path: &str, query: &Query) -> ScrapeResult<Document> {
        Ok(Document::parse(&self.get(path, query)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_cookie_pattern_extracts_the_assignment() {
        let body = r#"<script>setTimeout(function(){document.cookie="ak_bmsc=tok123; path=/";},10);</script>"#;
        let caps = INIT_COOKIE_RE.captures(body).unwrap();
        assert_eq!(&caps[1], "ak_bmsc=tok123; path=/");
    }

    #[test]
    fn fetcher_builds_for_any_locale() {
        assert!(HttpFetcher::new(&Locale::default()).is_ok());
        assert!(HttpFetcher::new(&Locale::new("DE", "de")).is_ok());
    }
}
