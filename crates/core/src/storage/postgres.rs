use crate::domain::deal::PersistedDeal;
use crate::storage::DealStore;
use anyhow::Context;

#[derive(Debug, Clone)]
pub struct PgDealStore {
    pool: sqlx::PgPool,
}

impl PgDealStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DealStore for PgDealStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert_batch(
        &self,
        collection: &str,
        records: &[PersistedDeal],
    ) -> anyhow::Result<u64> {
        anyhow::ensure!(!records.is_empty(), "records must be non-empty");
        // The collection name is spliced into SQL text, so only plain identifiers pass.
        anyhow::ensure!(
            is_identifier(collection),
            "invalid collection name: {collection:?}"
        );

        let t0 = std::time::Instant::now();
        let mut qb = sqlx::QueryBuilder::new(format!(
            "INSERT INTO {collection} (id, hunt_id, brand, category, title, price, link, store, \
             platform, image_url, safety_status, location, found_at, is_viewed) "
        ));
        qb.push_values(records, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.hunt_id.clone())
                .push_bind(r.brand.clone())
                .push_bind(r.category.clone())
                .push_bind(r.deal.title.clone())
                .push_bind(r.deal.price)
                .push_bind(r.deal.url.clone())
                .push_bind(r.deal.store.clone())
                .push_bind(r.deal.platform.key())
                .push_bind(r.image_url.clone())
                .push_bind(r.safety_status.label())
                .push_bind(r.location.clone())
                .push_bind(r.found_at)
                .push_bind(r.is_viewed);
        });

        let res = qb
            .build()
            .persistent(false)
            .execute(&self.pool)
            .await
            .with_context(|| format!("batch insert {collection} failed"))?;

        tracing::debug!(
            collection,
            batch_size = records.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "found items batch insert"
        );

        Ok(res.rows_affected())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
