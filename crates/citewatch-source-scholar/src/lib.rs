// # Google Scholar Count Source
//
// This crate provides a Google Scholar based CountSource for citewatch.
//
// ## Lookup
//
// - By id: fetches `/citations?user={id}` and reads the "Cited by" table
// - By name: searches `/citations?view_op=search_authors&mauthors={name}`,
//   takes the first hit's profile id, then fetches that profile
//
// Name lookups take whatever Scholar ranks first. Homonyms are common;
// configure an id when it matters.
//
// ## Blocking
//
// Scholar has no API and throttles scrapers aggressively. Throttling shows
// up as HTTP 429/403, a redirect to `/sorry/`, or a CAPTCHA page served
// with status 200. All of these are reported as `FetchError::RateLimited`
// and the engine simply tries again next cycle.

use citewatch_core::config::AuthorSelector;
use citewatch_core::error::FetchError;
use citewatch_core::traits::{CountSource, Observation};

use reqwest::{StatusCode, Url};
use scraper::{Html, Selector};
use std::time::Duration;

/// Public Scholar endpoint
pub const DEFAULT_BASE_URL: &str = "https://scholar.google.com";

/// Request timeout for a single page
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Scholar serves a stripped page to unknown agents
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Markers of Scholar's bot-check pages
const BLOCK_MARKERS: &[&str] = &["gs_captcha", "unusual traffic", "id=\"captcha-form\""];

/// Google Scholar count source
pub struct ScholarSource {
    /// Base URL, without trailing slash
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl ScholarSource {
    /// Create a source against the public Scholar site
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a source against a custom base URL (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Base URL in use
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one `/citations` page and classify HTTP-level failures
    async fn get_page(&self, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let url = format!("{}/citations", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::network(format!("Request to {} timed out", url))
                } else {
                    FetchError::network(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if response.url().path().starts_with("/sorry") {
            return Err(FetchError::rate_limited(format!(
                "Redirected to bot check: {}",
                response.url()
            )));
        }

        match status {
            StatusCode::NOT_FOUND => {
                return Err(FetchError::not_found(format!("Scholar returned {}", status)));
            }
            StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => {
                return Err(FetchError::rate_limited(format!("Scholar returned {}", status)));
            }
            s if !s.is_success() => {
                return Err(FetchError::network(format!("HTTP error: {}", s)));
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(format!("Failed to read response: {}", e)))?;

        if looks_blocked(&body) {
            return Err(FetchError::rate_limited("Scholar served a CAPTCHA page"));
        }

        Ok(body)
    }

    /// Fetch a profile by id
    async fn fetch_profile(&self, user_id: &str) -> Result<Observation, FetchError> {
        tracing::debug!("Fetching Scholar profile {}", user_id);
        let body = self.get_page(&[("user", user_id), ("hl", "en")]).await?;
        parse_profile(&body)
    }

    /// Search by name and return the first hit's profile id
    async fn search_profile_id(&self, name: &str) -> Result<String, FetchError> {
        tracing::debug!("Searching Scholar authors for {:?}", name);
        let body = self
            .get_page(&[
                ("view_op", "search_authors"),
                ("mauthors", name),
                ("hl", "en"),
            ])
            .await?;

        match parse_first_search_hit(&body, &self.base_url)? {
            Some(user_id) => {
                tracing::debug!("Using first search result {} for {:?}", user_id, name);
                Ok(user_id)
            }
            None => Err(FetchError::not_found(format!("No author matches {:?}", name))),
        }
    }
}

impl Default for ScholarSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CountSource for ScholarSource {
    async fn fetch(&self, selector: &AuthorSelector) -> Result<Observation, FetchError> {
        match selector {
            AuthorSelector::Id(id) => {
                tracing::info!("Looking up Scholar profile by ID: {}", id);
                self.fetch_profile(id).await
            }
            AuthorSelector::Name(name) => {
                tracing::info!("Searching Scholar for author by name: {}", name);
                let user_id = self.search_profile_id(name).await?;
                self.fetch_profile(&user_id).await
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "scholar"
    }
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::parse(format!("Bad selector {}: {}", css, e)))
}

/// Whether a 200 page is really a bot check
fn looks_blocked(body: &str) -> bool {
    BLOCK_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Read the display name and total citations from a profile page
fn parse_profile(html: &str) -> Result<Observation, FetchError> {
    let doc = Html::parse_document(html);

    let name = doc
        .select(&selector("#gsc_prf_in")?)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .filter(|n| !n.is_empty());

    // First "All" cell of the Cited by / h-index / i10-index table
    let cell = doc
        .select(&selector("#gsc_rsb_st td.gsc_rsb_std")?)
        .next()
        .map(|c| c.text().collect::<String>());

    let Some(cell) = cell else {
        return Err(match name {
            Some(name) => FetchError::parse(format!("No citation table on profile of {}", name)),
            None => FetchError::parse("Page is not a Scholar profile"),
        });
    };

    let citations = parse_count(&cell)
        .ok_or_else(|| FetchError::parse(format!("Citation cell is not a number: {:?}", cell.trim())))?;

    let observation = Observation::new(citations);
    Ok(match name {
        Some(name) => observation.with_author_name(name),
        None => observation,
    })
}

/// Parse a count such as "12,345"
fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Extract the profile id of the first author search hit
///
/// Returns `Ok(None)` when the page has no hits.
fn parse_first_search_hit(html: &str, base_url: &str) -> Result<Option<String>, FetchError> {
    let doc = Html::parse_document(html);

    let Some(href) = doc
        .select(&selector(".gs_ai_name a")?)
        .next()
        .and_then(|a| a.value().attr("href"))
    else {
        return Ok(None);
    };

    let base = Url::parse(base_url)
        .map_err(|e| FetchError::parse(format!("Invalid base URL {}: {}", base_url, e)))?;
    let link = base
        .join(href)
        .map_err(|e| FetchError::parse(format!("Invalid profile link {:?}: {}", href, e)))?;

    let user_id = link
        .query_pairs()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| FetchError::parse(format!("Profile link has no user id: {:?}", href)))?;

    Ok(Some(user_id))
}
