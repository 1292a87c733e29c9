pub mod aggregate;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod price;
pub mod source;
pub mod storage;

pub use error::ScoutError;
pub use pipeline::Scout;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_FOUND_ITEMS_TABLE: &str = "found_items";
    const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 15;
    const DEFAULT_SUPABASE_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_EBAY_BASE_URL: &str = "https://www.ebay.com";
    const DEFAULT_GOOGLE_SHOPPING_BASE_URL: &str = "https://www.google.com";
    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SourceMode {
        Live,
        Mock,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StoreBackend {
        Supabase,
        Postgres,
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub supabase_url: Option<String>,
        pub supabase_service_role_key: Option<String>,
        pub supabase_timeout_secs: u64,
        pub sentry_dsn: Option<String>,
        pub source_mode: SourceMode,
        pub store_backend: StoreBackend,
        pub found_items_table: String,
        pub source_timeout_secs: u64,
        pub ebay_base_url: String,
        pub google_shopping_base_url: String,
        pub user_agent: String,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from any key/value lookup; blank values count as unset.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

            let source_mode = match var("SCOUT_SOURCE_MODE").as_deref() {
                None | Some("live") => SourceMode::Live,
                Some("mock") => SourceMode::Mock,
                Some(other) => anyhow::bail!("SCOUT_SOURCE_MODE must be live or mock (got {other})"),
            };

            let store_backend = match var("SCOUT_STORE").as_deref() {
                None | Some("supabase") => StoreBackend::Supabase,
                Some("postgres") => StoreBackend::Postgres,
                Some(other) => {
                    anyhow::bail!("SCOUT_STORE must be supabase or postgres (got {other})")
                }
            };

            let secs = |key: &str, default: u64| -> anyhow::Result<u64> {
                match var(key) {
                    None => Ok(default),
                    Some(v) => v
                        .trim()
                        .parse::<u64>()
                        .with_context(|| format!("{key} must be a whole number of seconds (got {v})")),
                }
            };

            Ok(Self {
                database_url: var("DATABASE_URL"),
                supabase_url: var("SUPABASE_URL"),
                supabase_service_role_key: var("SUPABASE_SERVICE_ROLE_KEY"),
                supabase_timeout_secs: secs("SUPABASE_TIMEOUT_SECS", DEFAULT_SUPABASE_TIMEOUT_SECS)?,
                sentry_dsn: var("SENTRY_DSN"),
                source_mode,
                store_backend,
                found_items_table: var("SCOUT_FOUND_ITEMS_TABLE")
                    .unwrap_or_else(|| DEFAULT_FOUND_ITEMS_TABLE.to_string()),
                source_timeout_secs: secs("SOURCE_TIMEOUT_SECS", DEFAULT_SOURCE_TIMEOUT_SECS)?,
                ebay_base_url: var("EBAY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_EBAY_BASE_URL.to_string()),
                google_shopping_base_url: var("GOOGLE_SHOPPING_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GOOGLE_SHOPPING_BASE_URL.to_string()),
                user_agent: var("SCOUT_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            })
        }

        pub fn source_timeout(&self) -> std::time::Duration {
            std::time::Duration::from_secs(self.source_timeout_secs)
        }

        pub fn supabase_timeout(&self) -> std::time::Duration {
            std::time::Duration::from_secs(self.supabase_timeout_secs)
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_supabase_url(&self) -> anyhow::Result<&str> {
            self.supabase_url
                .as_deref()
                .context("SUPABASE_URL is required")
        }

        pub fn require_supabase_service_role_key(&self) -> anyhow::Result<&str> {
            self.supabase_service_role_key
                .as_deref()
                .context("SUPABASE_SERVICE_ROLE_KEY is required")
        }
    }

}
