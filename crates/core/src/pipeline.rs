use crate::aggregate::Aggregator;
use crate::config::Settings;
use crate::domain::deal::PersistedDeal;
use crate::domain::hunt::DealRequest;
use crate::error::ScoutError;
use crate::source::{self, SearchOutcome};
use crate::storage::{self, DealStore, DealWriter};
use std::sync::Arc;

/// Result of one scouting run, including what the plain record list hides.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub query: String,
    pub persisted: Vec<PersistedDeal>,
    /// Deals that survived aggregation, whether or not they were saved.
    pub found: usize,
    pub outcomes: Vec<SearchOutcome>,
    pub persist_failed: bool,
}

#[derive(Clone)]
pub struct Scout {
    aggregator: Aggregator,
    writer: DealWriter,
}

impl Scout {
    pub fn new(aggregator: Aggregator, writer: DealWriter) -> Self {
        Self { aggregator, writer }
    }

    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let adapters = source::adapters_from_settings(settings)?;
        let store = storage::store_from_settings(settings).await?;
        Ok(Self::with_store(settings, adapters, store))
    }

    pub fn with_store(
        settings: &Settings,
        adapters: Vec<source::SourceAdapter>,
        store: Arc<dyn DealStore>,
    ) -> Self {
        Self::new(
            Aggregator::new(adapters),
            DealWriter::new(store, settings.found_items_table.clone()),
        )
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Finds deals for `query`, saves them under `hunt_id` and returns the
    /// saved records, cheapest first.
    ///
    /// Source and store failures shrink the result instead of erroring; only
    /// invalid input is rejected, before any source is contacted.
    pub async fn scrape_deals(
        &self,
        query: &str,
        hunt_id: &str,
        max_price: Option<f64>,
    ) -> Result<Vec<PersistedDeal>, ScoutError> {
        let req = DealRequest::new(query, hunt_id, max_price)?;
        Ok(self.run(&req).await.persisted)
    }

    pub async fn run(&self, req: &DealRequest) -> ScrapeReport {
        tracing::info!(query = %req.query, hunt_id = %req.hunt_id, max_price = ?req.max_price, "starting scrape");

        let aggregation = self
            .aggregator
            .aggregate(&req.query, req.hunt_id.as_str(), req.max_price)
            .await;
        let found = aggregation.deals.len();

        let outcome = self
            .writer
            .persist_outcome(&aggregation.deals, &req.hunt_id, &req.tags)
            .await;
        let persist_failed = outcome.is_failed();
        let persisted = outcome.into_records();

        tracing::info!(
            hunt_id = %req.hunt_id,
            found,
            persisted = persisted.len(),
            unavailable_sources = aggregation.unavailable_sources(),
            persist_failed,
            "scrape finished"
        );

        ScrapeReport {
            query: req.query.clone(),
            persisted,
            found,
            outcomes: aggregation.outcomes,
            persist_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deal::Platform;
    use crate::domain::hunt::HuntTags;
    use crate::source::mock::MockSource;
    use crate::source::{ListingSource, RawListing, SourceAdapter};
    use crate::storage::writer::testing::RecordingStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ListingSource for CountingSource {
        fn platform(&self) -> Platform {
            Platform::Ebay
        }

        async fn fetch_listings(&self, _: &str, _: Option<f64>) -> anyhow::Result<Vec<RawListing>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn scout(adapters: Vec<SourceAdapter>, store: Arc<RecordingStore>) -> Scout {
        Scout::new(Aggregator::new(adapters), DealWriter::new(store, "found_items"))
    }

    fn reference_sources() -> Vec<SourceAdapter> {
        vec![
            SourceAdapter::new(MockSource::google_shopping(), TIMEOUT),
            SourceAdapter::new(MockSource::ebay(), TIMEOUT),
        ]
    }

    #[tokio::test]
    async fn scrapes_sorts_and_persists_under_ceiling() {
        let store = Arc::new(RecordingStore::default());
        let scout = scout(reference_sources(), store.clone());

        let saved = scout
            .scrape_deals("UPPAbaby Vista", "hunt-42", Some(150.0))
            .await
            .unwrap();

        let prices: Vec<f64> = saved.iter().map(|r| r.deal.price).collect();
        assert_eq!(prices, vec![89.99, 99.99, 129.99, 149.99]);
        assert!(saved.iter().all(|r| r.hunt_id == "hunt-42"));

        assert_eq!(store.calls().await, 1);
        let batches = store.batches.lock().await;
        assert_eq!(batches[0].1, saved);
        assert_eq!(saved[0].deal.store, "eBay");
        assert_eq!(saved[0].deal.title, "eBay: UPPAbaby Vista - Auction");
    }

    #[tokio::test]
    async fn ceiling_excludes_pricier_listings() {
        let store = Arc::new(RecordingStore::default());
        let scout = scout(reference_sources(), store);

        let saved = scout.scrape_deals("UPPAbaby Vista", "hunt-1", Some(100.0)).await.unwrap();
        assert!(saved.iter().all(|r| r.deal.price <= 100.0));
        assert_eq!(saved.len(), 2);
    }

    #[tokio::test]
    async fn no_ceiling_keeps_single_listing() {
        let store = Arc::new(RecordingStore::default());
        let scout = scout(
            vec![
                SourceAdapter::new(MockSource::with_prices(Platform::GoogleShopping, &["$129.99"]), TIMEOUT),
                SourceAdapter::new(MockSource::with_prices(Platform::Ebay, &[]), TIMEOUT),
            ],
            store,
        );

        let saved = scout.scrape_deals("Nuna Mixx", "hunt-1", None).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].deal.price, 129.99);
    }

    #[tokio::test]
    async fn empty_hunt_id_is_rejected_before_sources_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(RecordingStore::default());
        let scout = scout(
            vec![SourceAdapter::new(CountingSource { calls: calls.clone() }, TIMEOUT)],
            store.clone(),
        );

        let err = scout.scrape_deals("UPPAbaby Vista", "", Some(150.0)).await.unwrap_err();
        assert!(matches!(err, ScoutError::InvalidInput { field: "hunt_id", .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.calls().await, 0);
    }

    #[tokio::test]
    async fn all_sources_empty_means_no_write() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(RecordingStore::default());
        let scout = scout(
            vec![
                SourceAdapter::new(CountingSource { calls: calls.clone() }, TIMEOUT),
                SourceAdapter::new(MockSource::failing(Platform::GoogleShopping, "blocked"), TIMEOUT),
            ],
            store.clone(),
        );

        let saved = scout.scrape_deals("SNOO", "hunt-1", None).await.unwrap();
        assert!(saved.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.calls().await, 0);
    }

    #[tokio::test]
    async fn one_failed_source_keeps_the_others_results() {
        let store = Arc::new(RecordingStore::default());
        let scout = scout(
            vec![
                SourceAdapter::new(MockSource::failing(Platform::GoogleShopping, "timeout"), TIMEOUT),
                SourceAdapter::new(MockSource::ebay(), TIMEOUT),
            ],
            store,
        );

        let saved = scout.scrape_deals("UPPAbaby Vista", "hunt-1", None).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|r| r.deal.platform == Platform::Ebay));
    }

    #[tokio::test]
    async fn report_flags_lost_results_when_store_fails() {
        let store = Arc::new(RecordingStore::failing("503 from PostgREST"));
        let scout = scout(reference_sources(), store.clone());

        let req = DealRequest::new("UPPAbaby Vista", "hunt-1", None)
            .unwrap()
            .with_tags(HuntTags {
                brand: Some("UPPAbaby".to_string()),
                category: None,
            });
        let report = scout.run(&req).await;

        assert!(report.persisted.is_empty());
        assert_eq!(report.found, 4);
        assert!(report.persist_failed);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(store.calls().await, 1);

        let saved = scout.scrape_deals("UPPAbaby Vista", "hunt-1", None).await.unwrap();
        assert!(saved.is_empty());
    }
}
