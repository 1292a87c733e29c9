use crate::config::Settings;
use crate::domain::deal::Platform;
use crate::source::{
    fetch_html, first_text, http_client, resolve_link, selector, ListingSource, RawListing,
};
use anyhow::Context;
use scraper::Html;
use std::collections::BTreeMap;
use std::time::Duration;

const SEARCH_PATH: &str = "/search";

#[derive(Debug, Clone)]
pub struct GoogleShoppingSource {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl GoogleShoppingSource {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("invalid Google Shopping base url: {base_url}"))?;
        Ok(Self {
            http: http_client(timeout, user_agent)?,
            base_url,
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            &settings.google_shopping_base_url,
            settings.source_timeout(),
            &settings.user_agent,
        )
    }

    fn search_url(&self, query: &str, max_price: Option<f64>) -> anyhow::Result<reqwest::Url> {
        let mut url = self
            .base_url
            .join(SEARCH_PATH)
            .context("failed to build Google Shopping search url")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("tbm", "shop");
            pairs.append_pair("q", query);
            if let Some(max) = max_price {
                pairs.append_pair("tbs", &format!("mr:1,price:1,ppr_max:{max}"));
            }
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ListingSource for GoogleShoppingSource {
    fn platform(&self) -> Platform {
        Platform::GoogleShopping
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
    let card = selector(".sh-dgr__content")?;
    let title = selector("h3")?;
    let price = selector("span.a8Pemb")?;
    let link = selector("a[href]")?;
    let merchant = selector(".aULzUe")?;

    let document = Html::parse_document(html);
    let out = document
        .select(&card)
        .map(|item| {
            let mut metadata = BTreeMap::new();
            if let Some(m) = first_text(&item, &merchant) {
                metadata.insert("merchant".to_string(), m);
            }

            RawListing {
                title: first_text(&item, &title),
                price_text: first_text(&item, &price),
                link: item
                    .select(&link)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .and_then(|href| resolve_link(page_url, href)),
                metadata,
            }
        })
        .collect();

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const RESULTS_HTML: &str = r#"
        <div class="sh-pr__product-results">
          <div class="sh-dgr__content">
            <a href="/shopping/product/123?q=vista"><h3 class="tAxDx">UPPAbaby Vista V2</h3></a>
            <span class="a8Pemb OFFNJ">$899.99</span>
            <div class="aULzUe IuHnof">Target</div>
          </div>
          <div class="sh-dgr__content">
            <a href="https://www.babylist.com/gp/uppababy-vista"><h3>Vista V2 Stroller - Gwen</h3></a>
            <span class="a8Pemb">$749.00</span>
          </div>
        </div>
    "#;

    #[test]
    fn parses_cards_and_resolves_relative_links() {
        let page = reqwest::Url::parse("https://www.google.com/search?tbm=shop&q=vista").unwrap();
        let listings = parse_listings(RESULTS_HTML, &page).unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].title.as_deref(), Some("UPPAbaby Vista V2"));
        assert_eq!(listings[0].price_text.as_deref(), Some("$899.99"));
        assert_eq!(
            listings[0].link.as_deref(),
            Some("https://www.google.com/shopping/product/123?q=vista")
        );
        assert_eq!(
            listings[0].metadata.get("merchant").map(String::as_str),
            Some("Target")
        );
        assert!(listings[1].metadata.is_empty());
    }

    #[test]
    fn unrelated_markup_yields_no_listings() {
        let page = reqwest::Url::parse("https://www.google.com/search").unwrap();
        let listings = parse_listings("<html><body><p>captcha</p></body></html>", &page).unwrap();
        assert!(listings.is_empty());
    }

    #[tokio::test]
    async fn requests_shopping_vertical() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search")
                    .query_param("tbm", "shop")
                    .query_param("q", "Nuna Pipa");
                then.status(200).body(RESULTS_HTML);
            })
            .await;

        let source = GoogleShoppingSource::new(&server.base_url(), Duration::from_secs(5), "scout-test").unwrap();
        let listings = source.fetch_listings("Nuna Pipa", None).await.unwrap();

        page.assert_async().await;
        assert_eq!(listings.len(), 2);
        assert!(listings[0]
            .link
            .as_deref()
            .unwrap()
            .starts_with(&server.base_url()));
    }
}
