pub mod postgres;
pub mod supabase;
pub mod writer;

use crate::config::{Settings, StoreBackend, DEFAULT_FOUND_ITEMS_TABLE};
use crate::domain::deal::{PersistedDeal, SafetyStatus};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub use writer::{DealWriter, PersistOutcome};

/// Batch insert into a named collection. One call per batch, all or nothing.
#[async_trait::async_trait]
pub trait DealStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn insert_batch(&self, collection: &str, records: &[PersistedDeal])
        -> anyhow::Result<u64>;
}

/// Wire shape of a row in the hosted `found_items` table. The deal's `url` is
/// stored as `link`; store and platform have no column there.
#[derive(Debug, Serialize)]
pub struct FoundItemRow<'a> {
    pub id: Uuid,
    pub hunt_id: &'a str,
    pub brand: Option<&'a str>,
    pub category: Option<&'a str>,
    pub title: &'a str,
    pub price: f64,
    pub link: &'a str,
    pub image_url: Option<&'a str>,
    pub safety_status: SafetyStatus,
    pub location: Option<&'a str>,
    pub found_at: DateTime<Utc>,
    pub is_viewed: bool,
}

impl<'a> From<&'a PersistedDeal> for FoundItemRow<'a> {
    fn from(r: &'a PersistedDeal) -> Self {
        Self {
            id: r.id,
            hunt_id: &r.hunt_id,
            brand: r.brand.as_deref(),
            category: r.category.as_deref(),
            title: &r.deal.title,
            price: r.deal.price,
            link: &r.deal.url,
            image_url: r.image_url.as_deref(),
            safety_status: r.safety_status,
            location: r.location.as_deref(),
            found_at: r.found_at,
            is_viewed: r.is_viewed,
        }
    }
}

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

pub async fn store_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn DealStore>> {
    let store: Arc<dyn DealStore> = match settings.store_backend {
        StoreBackend::Supabase => Arc::new(supabase::SupabaseStore::from_settings(settings)?),
        StoreBackend::Postgres => {
            postgres_table(settings)?;
            let db_url = settings.require_database_url()?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .context("connect DATABASE_URL failed")?;
            migrate(&pool).await?;
            Arc::new(postgres::PgDealStore::new(pool))
        }
    };
    Ok(store)
}

/// The embedded migration only creates `found_items`, so the Postgres backend
/// refuses any other table name.
fn postgres_table(settings: &Settings) -> anyhow::Result<&str> {
    anyhow::ensure!(
        settings.found_items_table == DEFAULT_FOUND_ITEMS_TABLE,
        "SCOUT_FOUND_ITEMS_TABLE={} is not supported with SCOUT_STORE=postgres; \
         migrations only create {DEFAULT_FOUND_ITEMS_TABLE}",
        settings.found_items_table
    );
    Ok(&settings.found_items_table)
}
