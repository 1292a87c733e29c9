use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scout_core::domain::deal::PersistedDeal;
use scout_core::domain::hunt::DealRequest;
use scout_core::Scout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = scout_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let scout = match Scout::from_settings(&settings).await {
        Ok(scout) => scout,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "scout pipeline init failed");
            return Err(e);
        }
    };

    tracing::info!(
        source_mode = ?settings.source_mode,
        store = ?settings.store_backend,
        sources = scout.aggregator().adapters().len(),
        "scout pipeline ready"
    );

    let app = app(AppState {
        scout: Arc::new(scout),
    });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    scout: Arc<Scout>,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/api/scout", post(scout_deals))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct ScoutRequest {
    brand: String,
    item_name: Option<String>,
    hunt_id: String,
    max_price: Option<f64>,
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScoutResponse {
    success: bool,
    query: String,
    deals_found: usize,
    deals: Vec<PersistedDeal>,
    persist_failed: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

async fn scout_deals(
    State(state): State<AppState>,
    body: Result<Json<ScoutRequest>, JsonRejection>,
) -> Result<Json<ScoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(body) = body.map_err(|rejection| bad_request(rejection.body_text()))?;

    let req = DealRequest::from_parts(
        &body.brand,
        body.item_name.as_deref(),
        &body.hunt_id,
        body.max_price,
        body.category.as_deref(),
    )
    .map_err(|err| bad_request(err.to_string()))?;

    let report = state.scout.run(&req).await;

    Ok(Json(ScoutResponse {
        success: true,
        query: report.query,
        deals_found: report.persisted.len(),
        deals: report.persisted,
        persist_failed: report.persist_failed,
    }))
}

fn bad_request(error: String) -> (StatusCode, Json<ErrorResponse>) {
    tracing::warn!(%error, "rejected scout request");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &scout_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use scout_core::aggregate::Aggregator;
    use scout_core::source::mock::MockSource;
    use scout_core::source::SourceAdapter;
    use scout_core::storage::{DealStore, DealWriter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Default)]
    struct CountingStore {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DealStore for CountingStore {
        fn backend(&self) -> &'static str {
            "counting"
        }

        async fn insert_batch(
            &self,
            _collection: &str,
            records: &[PersistedDeal],
        ) -> anyhow::Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!self.fail, "store offline");
            Ok(records.len() as u64)
        }
    }

    fn test_app(store: Arc<CountingStore>) -> Router {
        let timeout = Duration::from_secs(5);
        let scout = Scout::new(
            Aggregator::new(vec![
                SourceAdapter::new(MockSource::google_shopping(), timeout),
                SourceAdapter::new(MockSource::ebay(), timeout),
            ]),
            DealWriter::new(store, "found_items"),
        );
        app(AppState {
            scout: Arc::new(scout),
        })
    }

    async fn post_scout(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let res = app
            .oneshot(
                Request::post("/api/scout")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn blank_hunt_id_is_a_bad_request() {
        let store = Arc::new(CountingStore::default());
        let (status, body) = post_scout(
            test_app(store.clone()),
            r#"{"brand":"UPPAbaby","item_name":"Vista","hunt_id":"  "}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("hunt_id"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_body_uses_the_error_shape() {
        let store = Arc::new(CountingStore::default());
        let (status, body) = post_scout(test_app(store), r#"{"brand": 7"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn returns_saved_deals_cheapest_first() {
        let store = Arc::new(CountingStore::default());
        let (status, body) = post_scout(
            test_app(store.clone()),
            r#"{"brand":"UPPAbaby","item_name":"Vista","hunt_id":"hunt-9","max_price":140,"category":"Stroller"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["query"], "UPPAbaby Vista");
        assert_eq!(body["deals_found"], 3);
        assert_eq!(body["persist_failed"], false);

        let deals = body["deals"].as_array().unwrap();
        let prices: Vec<f64> = deals.iter().map(|d| d["price"].as_f64().unwrap()).collect();
        assert_eq!(prices, vec![89.99, 99.99, 129.99]);
        assert_eq!(deals[0]["hunt_id"], "hunt-9");
        assert_eq!(deals[0]["category"], "Stroller");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_store_is_reported() {
        let store = Arc::new(CountingStore {
            fail: true,
            ..Default::default()
        });
        let (status, body) = post_scout(
            test_app(store),
            r#"{"brand":"Nuna","hunt_id":"hunt-3"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["persist_failed"], true);
        assert_eq!(body["deals_found"], 0);
        assert!(body["deals"].as_array().unwrap().is_empty());
    }
}
