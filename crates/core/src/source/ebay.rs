use crate::config::Settings;
use crate::domain::deal::Platform;
use crate::source::{
    fetch_html, first_text, http_client, resolve_link, selector, ListingSource, RawListing,
};
use anyhow::Context;
use scraper::Html;
use std::collections::BTreeMap;
use std::time::Duration;

const SEARCH_PATH: &str = "/sch/i.html";

// eBay renders a hidden template card first in every result list.
const PLACEHOLDER_TITLE: &str = "Shop on eBay";

#[derive(Debug, Clone)]
pub struct EbaySource {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl EbaySource {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("invalid eBay base url: {base_url}"))?;
        Ok(Self {
            http: http_client(timeout, user_agent)?,
            base_url,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            &settings.ebay_base_url,
            settings.source_timeout(),
            &settings.user_agent,
        )
    }

    fn search_url(&self, query: &str, max_price: Option<f64>) -> anyhow::Result<reqwest::Url> {
        let mut url = self
            .base_url
            .join(SEARCH_PATH)
            .context("failed to build eBay search url")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("_nkw", query);
            if let Some(max) = max_price {
                pairs.append_pair("_udhi", &max.to_string());
            }
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ListingSource for EbaySource {
    fn platform(&self) -> Platform {
        Platform::Ebay
    }

    async fn fetch_listings(
        &self,
        query: &str,
        max_price: Option<f64>,
    ) -> anyhow::Result<Vec<RawListing>> {
        let url = self.search_url(query, max_price)?;
        let html = fetch_html(&self.http, url.clone()).await?;
        parse_listings(&html, &url)
    }
}

pub fn parse_listings(html: &str, page_url: &reqwest::Url) -> anyhow::Result<Vec<RawListing>> {
    let card = selector("li.s-item")?;
    let title = selector(".s-item__title")?;
    let price = selector(".s-item__price")?;
    let link = selector("a.s-item__link")?;
    let shipping = selector(".s-item__shipping")?;

    let document = Html::parse_document(html);
    let mut out = Vec::new();
    for item in document.select(&card) {
        let title_text = first_text(&item, &title);
        if title_text.as_deref() == Some(PLACEHOLDER_TITLE) {
            continue;
        }

        let mut metadata = BTreeMap::new();
        if let Some(s) = first_text(&item, &shipping) {
            metadata.insert("shipping".to_string(), s);
        }

        out.push(RawListing {
            title: title_text,
            price_text: first_text(&item, &price),
            link: item
                .select(&link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| resolve_link(page_url, href)),
            metadata,
        });
    }

    Ok(out)
}
