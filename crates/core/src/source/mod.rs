pub mod ebay;
pub mod google_shopping;
pub mod mock;

use crate::config::{Settings, SourceMode};
use crate::domain::deal::{Deal, Platform};
use crate::error::ScoutError;
use crate::price;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use scraper::{ElementRef, Selector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on candidates considered per source and search.
pub const MAX_CANDIDATES_PER_SOURCE: usize = 5;

/// Unvalidated fields scraped from one listing card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListing {
    pub title: Option<String>,
    pub price_text: Option<String>,
    pub link: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Retrieval of raw listings from one marketplace.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch_listings(
        &self,
        query: &str,
        max_price: Option<f64>,
    ) -> anyhow::Result<Vec<RawListing>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    MissingTitle,
    MissingLink,
    UnparseablePrice { price_text: String },
    AboveCeiling { price: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    Accepted(Deal),
    Dropped(DropReason),
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub platform: Platform,
    pub deals: Vec<Deal>,
    pub dropped: Vec<DropReason>,
    pub error: Option<ScoutError>,
}

impl SearchOutcome {
    fn unavailable(platform: Platform, detail: String) -> Self {
        tracing::warn!(%platform, error = %detail, "source unavailable; continuing without it");
        Self {
            platform,
            deals: Vec::new(),
            dropped: Vec::new(),
            error: Some(ScoutError::SourceUnavailable { platform, detail }),
        }
    }

    pub(crate) fn panicked(platform: Platform, detail: String) -> Self {
        Self::unavailable(platform, format!("search task aborted: {detail}"))
    }

    pub fn is_unavailable(&self) -> bool {
        self.error.is_some()
    }

    pub fn unparseable_count(&self) -> usize {
        self.dropped
            .iter()
            .filter(|d| matches!(d, DropReason::UnparseablePrice { .. }))
            .count()
    }
}

/// One marketplace behind a failure boundary: whatever goes wrong inside the
/// source becomes an empty, annotated outcome.
#[derive(Clone)]
pub struct SourceAdapter {
    source: Arc<dyn ListingSource>,
    timeout: Duration,
}

impl SourceAdapter {
    pub fn new(source: impl ListingSource + 'static, timeout: Duration) -> Self {
        Self {
            source: Arc::new(source),
            timeout,
        }
    }

    pub fn platform(&self) -> Platform {
        self.source.platform()
    }

    pub async fn search(&self, query: &str, max_price: Option<f64>) -> SearchOutcome {
        let platform = self.platform();
        let fetched =
            tokio::time::timeout(self.timeout, self.source.fetch_listings(query, max_price)).await;

        let raw = match fetched {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => return SearchOutcome::unavailable(platform, format!("{err:#}")),
            Err(_) => {
                return SearchOutcome::unavailable(
                    platform,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                )
            }
        };

        let mut deals = Vec::new();
        let mut dropped = Vec::new();
        for listing in raw.into_iter().take(MAX_CANDIDATES_PER_SOURCE) {
            match classify(platform, listing, max_price) {
                CandidateOutcome::Accepted(deal) => deals.push(deal),
                CandidateOutcome::Dropped(reason) => dropped.push(reason),
            }
        }

        tracing::debug!(
            %platform,
            accepted = deals.len(),
            dropped = dropped.len(),
            "source search finished"
        );

        SearchOutcome {
            platform,
            deals,
            dropped,
            error: None,
        }
    }
}

pub fn classify(platform: Platform, listing: RawListing, max_price: Option<f64>) -> CandidateOutcome {
    let title = match listing.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return CandidateOutcome::Dropped(DropReason::MissingTitle),
    };

    let url = match listing.link.as_deref().map(str::trim) {
        Some(link) if is_absolute_http(link) => link.to_string(),
        _ => return CandidateOutcome::Dropped(DropReason::MissingLink),
    };

    let price_text = listing.price_text.unwrap_or_default();
    let Some(price) = price::parse(&price_text) else {
        return CandidateOutcome::Dropped(DropReason::UnparseablePrice { price_text });
    };

    if let Some(max) = max_price {
        if price > max {
            return CandidateOutcome::Dropped(DropReason::AboveCeiling { price });
        }
    }

    CandidateOutcome::Accepted(Deal {
        title,
        price,
        url,
        store: platform.store_name().to_string(),
        platform,
    })
}

fn is_absolute_http(link: &str) -> bool {
    reqwest::Url::parse(link)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Resolves a possibly relative href against the page it was scraped from.
pub(crate) fn resolve_link(base: &reqwest::Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(|u| u.to_string())
}

pub(crate) fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("invalid selector {css}: {e}"))
}

/// Whitespace-collapsed text of the first match inside `scope`.
pub(crate) fn first_text(scope: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope
        .select(sel)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
}

pub(crate) fn http_client(timeout: Duration, user_agent: &str) -> anyhow::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .context("failed to build source http client")
}

pub(crate) async fn fetch_html(
    http: &reqwest::Client,
    url: reqwest::Url,
) -> anyhow::Result<String> {
    let res = http
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;

    let status = res.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {status} for {url}");
    }

    res.text().await.context("failed to read source response body")
}

/// Registered adapters in merge order.
pub fn adapters_from_settings(settings: &Settings) -> anyhow::Result<Vec<SourceAdapter>> {
    let timeout = settings.source_timeout();
    let adapters = match settings.source_mode {
        SourceMode::Live => vec![
            SourceAdapter::new(google_shopping::GoogleShoppingSource::from_settings(settings)?, timeout),
            SourceAdapter::new(ebay::EbaySource::from_settings(settings)?, timeout),
        ],
        SourceMode::Mock => vec![
            SourceAdapter::new(mock::MockSource::google_shopping(), timeout),
            SourceAdapter::new(mock::MockSource::ebay(), timeout),
        ],
    };
    Ok(adapters)
}
