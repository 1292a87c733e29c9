use crate::config::Settings;
use crate::domain::deal::PersistedDeal;
use crate::storage::{DealStore, FoundItemRow};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

/// Writes through Supabase's PostgREST endpoint with the service-role key.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_role_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build supabase http client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            service_role_key: service_role_key.to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(
            settings.require_supabase_url()?,
            settings.require_supabase_service_role_key()?,
            settings.supabase_timeout(),
        )
    }

    fn url(&self, collection: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            collection
        )
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.service_role_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_role_key))?,
        );
        headers.insert("prefer", HeaderValue::from_static("return=minimal"));
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl DealStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn insert_batch(
        &self,
        collection: &str,
        records: &[PersistedDeal],
    ) -> anyhow::Result<u64> {
        let rows: Vec<FoundItemRow<'_>> = records.iter().map(FoundItemRow::from).collect();

        let res = self
            .http
            .post(self.url(collection))
            .headers(self.headers()?)
            .json(&rows)
            .send()
            .await
            .context("supabase insert request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("supabase insert into {collection} failed: HTTP {status}: {body}");
        }

        Ok(rows.len() as u64)
    }
}
