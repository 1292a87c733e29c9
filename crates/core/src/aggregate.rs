use crate::domain::deal::Deal;
use crate::source::{SearchOutcome, SourceAdapter};

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Merged deals, cheapest first.
    pub deals: Vec<Deal>,
    /// One outcome per registered adapter, in registration order.
    pub outcomes: Vec<SearchOutcome>,
}

impl Aggregation {
    pub fn unavailable_sources(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_unavailable()).count()
    }
}

#[derive(Clone, Default)]
pub struct Aggregator {
    adapters: Vec<SourceAdapter>,
}

impl Aggregator {
    pub fn new(adapters: Vec<SourceAdapter>) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &[SourceAdapter] {
        &self.adapters
    }

    pub async fn aggregate(
        &self,
        query: &str,
        hunt_id: &str,
        max_price: Option<f64>,
    ) -> Aggregation {
        let handles: Vec<_> = self
            .adapters
            .iter()
            .cloned()
            .map(|adapter| {
                let query = query.to_string();
                let platform = adapter.platform();
                let handle = tokio::spawn(async move { adapter.search(&query, max_price).await });
                (platform, handle)
            })
            .collect();

        let (platforms, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;

        let outcomes: Vec<SearchOutcome> = platforms
            .into_iter()
            .zip(joined)
            .map(|(platform, res)| match res {
                Ok(outcome) => outcome,
                Err(join_err) => SearchOutcome::panicked(platform, join_err.to_string()),
            })
            .collect();

        let mut deals: Vec<Deal> = outcomes
            .iter()
            .flat_map(|o| o.deals.iter().cloned())
            .filter(|d| max_price.map_or(true, |max| d.price <= max))
            .collect();

        // Stable: equal prices keep source order, then within-source order.
        deals.sort_by(|a, b| a.price.total_cmp(&b.price));

        for outcome in &outcomes {
            tracing::info!(
                hunt_id,
                platform = %outcome.platform,
                accepted = outcome.deals.len(),
                dropped = outcome.dropped.len(),
                unavailable = outcome.is_unavailable(),
                "source results"
            );
        }

        Aggregation { deals, outcomes }
    }
}
