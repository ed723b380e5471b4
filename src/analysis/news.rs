use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use tracing::{debug, warn};

use crate::{config::NewsConfig, error::UpstreamError};

const PROVIDER: &str = "duckduckgo";
const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsSnippet {
    pub title: String,
    pub body: String,
    pub source_url: String,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub region: String,
    /// Recency bucket: `d`, `w`, `m` or `y`.
    pub timelimit: String,
    pub max_results: usize,
}

/// Text search capability.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<NewsSnippet>, UpstreamError>;
}

pub struct NewsRetriever {
    provider: Arc<dyn SearchProvider>,
    config: NewsConfig,
    timeout: Duration,
}

impl NewsRetriever {
    pub fn new(provider: Arc<dyn SearchProvider>, config: NewsConfig, timeout: Duration) -> Self {
        Self {
            provider,
            config,
            timeout,
        }
    }

    pub fn query_for(&self, sector: &str) -> SearchQuery {
        SearchQuery {
            text: format!(
                "latest market trends trade opportunities {sector} sector India investment news"
            ),
            region: self.config.region.clone(),
            timelimit: self.config.timelimit.clone(),
            max_results: self.config.max_results,
        }
    }

    pub async fn try_fetch(&self, sector: &str) -> Result<Vec<NewsSnippet>, UpstreamError> {
        let query = self.query_for(sector);
        let mut snippets = tokio::time::timeout(self.timeout, self.provider.search(&query))
            .await
            .map_err(|_| UpstreamError::Timeout {
                provider: PROVIDER,
                secs: self.timeout.as_secs(),
            })??;

        if snippets.is_empty() {
            return Err(UpstreamError::Empty { provider: PROVIDER });
        }
        snippets.truncate(self.config.max_results);
        Ok(snippets)
    }

    /// "No snippets" is a valid outcome: every search failure ends here as
    /// an empty list.
    pub async fn fetch(&self, sector: &str) -> Vec<NewsSnippet> {
        match self.try_fetch(sector).await {
            Ok(snippets) => {
                debug!(sector = %sector, count = snippets.len(), "news retrieved");
                snippets
            }
            Err(e) => {
                warn!(sector = %sector, error = %e, "news search failed; continuing without market data");
                Vec::new()
            }
        }
    }
}

/// DuckDuckGo's HTML endpoint, scraped for result titles, snippets and
/// target links.
pub struct DuckDuckGoSearch {
    http: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_endpoint(http, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<NewsSnippet>, UpstreamError> {
        let res = self
            .http
            .post(&self.endpoint)
            .form(&[
                ("q", query.text.as_str()),
                ("kl", query.region.as_str()),
                ("df", query.timelimit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        let html = res.text().await.map_err(|e| UpstreamError::Malformed {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let mut results = parse_results(&html);
        results.truncate(query.max_results);
        Ok(results)
    }
}

lazy_static! {
    static ref RESULT_LINK_RE: Regex =
        Regex::new(r#"(?s)class="result__a"[^>]*?href="([^"]+)"[^>]*>(.*?)</a>"#).unwrap();
    static ref RESULT_SNIPPET_RE: Regex =
        Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</a>"#).unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref SPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Each result's snippet is looked up between its own title link and the
/// next one, so a result without a snippet leaves its neighbours intact.
/// Sponsored results are skipped.
pub(crate) fn parse_results(html: &str) -> Vec<NewsSnippet> {
    let links: Vec<_> = RESULT_LINK_RE.captures_iter(html).collect();

    links
        .iter()
        .enumerate()
        .filter_map(|(i, link)| {
            let href = decode_entities(&link[1]);
            if is_ad_link(&href) {
                return None;
            }
            let block_start = link.get(0)?.end();
            let block_end = links
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |m| m.start());
            let body = RESULT_SNIPPET_RE
                .captures(&html[block_start..block_end])
                .map(|snippet| clean_text(&snippet[1]))
                .unwrap_or_default();

            let title = clean_text(&link[2]);
            let source_url = resolve_link(&href)?;
            (!title.is_empty()).then_some(NewsSnippet {
                title,
                body,
                source_url,
            })
        })
        .collect()
}

/// Sponsored results link through `duckduckgo.com/y.js`.
fn is_ad_link(href: &str) -> bool {
    href.contains("duckduckgo.com/y.js")
}

fn clean_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, "");
    let decoded = decode_entities(&stripped);
    SPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Result links point at a `/l/?uddg=<target>` redirect; unwrap it.
fn resolve_link(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_owned()
    };
    let url = Url::parse(&absolute).ok()?;
    let target = url
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned());
    Some(target.unwrap_or(absolute))
}
