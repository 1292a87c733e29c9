use crate::domain::deal::{Deal, PersistedDeal, SafetyStatus};
use crate::domain::hunt::{HuntId, HuntTags};
use crate::error::ScoutError;
use crate::storage::DealStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// Nothing to write; no store call was made.
    Skipped,
    Persisted(Vec<PersistedDeal>),
    Failed {
        attempted: usize,
        error: ScoutError,
    },
}

impl PersistOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, PersistOutcome::Failed { .. })
    }

    pub fn into_records(self) -> Vec<PersistedDeal> {
        match self {
            PersistOutcome::Persisted(records) => records,
            PersistOutcome::Skipped | PersistOutcome::Failed { .. } => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct DealWriter {
    store: Arc<dyn DealStore>,
    collection: String,
}

impl DealWriter {
    pub fn new(store: Arc<dyn DealStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Persists deals in a single batch, swallowing store failures.
    pub async fn persist(
        &self,
        deals: &[Deal],
        hunt_id: &HuntId,
        tags: &HuntTags,
    ) -> Vec<PersistedDeal> {
        self.persist_outcome(deals, hunt_id, tags)
            .await
            .into_records()
    }

    pub async fn persist_outcome(
        &self,
        deals: &[Deal],
        hunt_id: &HuntId,
        tags: &HuntTags,
    ) -> PersistOutcome {
        if deals.is_empty() {
            return PersistOutcome::Skipped;
        }

        let found_at = Utc::now();
        let records: Vec<PersistedDeal> = deals
            .iter()
            .map(|deal| PersistedDeal {
                id: Uuid::new_v4(),
                hunt_id: hunt_id.as_str().to_string(),
                brand: tags.brand.clone(),
                category: tags.category.clone(),
                deal: deal.clone(),
                image_url: None,
                safety_status: SafetyStatus::Unknown,
                location: None,
                found_at,
                is_viewed: false,
            })
            .collect();

        match self.store.insert_batch(&self.collection, &records).await {
            Ok(written) => {
                tracing::info!(
                    %hunt_id,
                    backend = self.store.backend(),
                    collection = %self.collection,
                    written,
                    "saved deals"
                );
                PersistOutcome::Persisted(records)
            }
            Err(err) => {
                tracing::error!(
                    %hunt_id,
                    backend = self.store.backend(),
                    collection = %self.collection,
                    attempted = records.len(),
                    error = %format!("{err:#}"),
                    "failed to save deals"
                );
                PersistOutcome::Failed {
                    attempted: records.len(),
                    error: ScoutError::PersistenceFailure {
                        detail: format!("{err:#}"),
                    },
                }
            }
        }
    }
}
