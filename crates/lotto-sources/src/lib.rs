//! Upstream result sites.
//!
//! Each site is a [`ScrapedSource`]: one GET with a browser-like user agent, the
//! page reduced to visible text, then one anchored pattern for the whole result.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use lotto_core::{domain::LottoResult, errors::Error, lotto::source::LottoSource, Result};

pub mod html;
pub mod lottery_co_th;
pub mod sanook;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Turns a page's visible text into a result, or `None` if the layout did not match.
pub type PageParser = fn(&str) -> Option<LottoResult>;

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::External(format!("http client build failed: {e}")))
}

/// Compile a page pattern. Bounded gaps over `.` need more than the default size limit.
pub(crate) fn page_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .size_limit(64 * (1 << 20))
        .build()
        .expect("valid page regex")
}

pub struct ScrapedSource {
    name: &'static str,
    url: String,
    http: reqwest::Client,
    parse: PageParser,
}

impl ScrapedSource {
    pub fn new(
        name: &'static str,
        url: impl Into<String>,
        http: reqwest::Client,
        parse: PageParser,
    ) -> Self {
        Self {
            name,
            url: url.into(),
            http,
            parse,
        }
    }
}

#[async_trait]
impl LottoSource for ScrapedSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self) -> Result<LottoResult> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::fetch(self.name, format!("request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::fetch(self.name, format!("http status {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::fetch(self.name, format!("body read error: {e}")))?;

        let text = html::visible_text(&body);
        debug!(source = self.name, chars = text.chars().count(), "page text extracted");

        (self.parse)(&text).ok_or_else(|| Error::fetch(self.name, "result pattern did not match"))
    }
}

/// The production sources in priority order.
pub fn default_sources(http: reqwest::Client) -> Vec<Arc<dyn LottoSource>> {
    vec![
        Arc::new(ScrapedSource::new(
            lottery_co_th::NAME,
            lottery_co_th::URL,
            http.clone(),
            lottery_co_th::parse,
        )),
        Arc::new(ScrapedSource::new(
            sanook::NAME,
            sanook::URL,
            http,
            sanook::parse,
        )),
    ]
}
