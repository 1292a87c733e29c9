use crate::domain::deal::Platform;
use crate::source::{ListingSource, RawListing};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Behavior {
    Fixtures(Vec<(String, String)>),
    Fail(String),
}

/// Fixture-backed source used in `mock` mode and in tests.
#[derive(Debug, Clone)]
pub struct MockSource {
    platform: Platform,
    behavior: Behavior,
}

impl MockSource {
    pub fn new(platform: Platform, fixtures: &[(&str, &str)]) -> Self {
        let fixtures = fixtures
            .iter()
            .map(|(label, price)| (label.to_string(), price.to_string()))
            .collect();
        Self {
            platform,
            behavior: Behavior::Fixtures(fixtures),
        }
    }

    pub fn with_prices(platform: Platform, prices: &[&str]) -> Self {
        let fixtures = prices
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("Listing {}", i + 1), p.to_string()))
            .collect();
        Self {
            platform,
            behavior: Behavior::Fixtures(fixtures),
        }
    }

    pub fn failing(platform: Platform, detail: &str) -> Self {
        Self {
            platform,
            behavior: Behavior::Fail(detail.to_string()),
        }
    }

    pub fn google_shopping() -> Self {
        Self::new(
            Platform::GoogleShopping,
            &[("Premium Deal", "$149.99"), ("Budget Option", "$99.99")],
        )
    }

    pub fn ebay() -> Self {
        Self::new(
            Platform::Ebay,
            &[("Seller: BuyItNow", "$129.99"), ("Auction", "$89.99")],
        )
    }
}

fn search_url(platform: Platform, query: &str) -> anyhow::Result<reqwest::Url> {
    let url = match platform {
        Platform::Ebay => {
            reqwest::Url::parse_with_params("https://www.ebay.com/sch/i.html", &[("_nkw", query)])?
        }
        Platform::GoogleShopping => {
            reqwest::Url::parse_with_params("https://www.google.com/search", &[("q", query)])?
        }
    };
    Ok(url)
}

#[async_trait::async_trait]
impl ListingSource for MockSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_listings(
        &self,
        query: &str,
        _max_price: Option<f64>,
    ) -> anyhow::Result<Vec<RawListing>> {
        let fixtures = match &self.behavior {
            Behavior::Fixtures(f) => f,
            Behavior::Fail(detail) => anyhow::bail!("{detail}"),
        };

        let link = search_url(self.platform, query)?.to_string();
        Ok(fixtures
            .iter()
            .map(|(label, price)| RawListing {
                title: Some(format!("{}: {query} - {label}", self.platform.store_name())),
                price_text: Some(price.clone()),
                link: Some(link.clone()),
                metadata: BTreeMap::new(),
            })
            .collect())
    }
}
