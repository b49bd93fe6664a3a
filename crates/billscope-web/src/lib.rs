//! Axum HTTP surface for the bill tracker: local reads over the store,
//! on-demand search against Congress.gov, and document text/download
//! proxying.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use billscope_client::CongressClient;
use billscope_storage::{DocumentCache, StorageError, Store};
use billscope_sync::{BillSynchronizer, StartupSync, SyncConfig};
use billscope_text::TextResolver;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod bills;
pub mod documents;
pub mod search;

pub const CRATE_NAME: &str = "billscope-web";

pub struct AppState {
    pub store: Store,
    pub client: CongressClient,
    pub resolver: TextResolver,
    pub cache: DocumentCache,
    pub synchronizer: Arc<BillSynchronizer>,
    pub startup: StartupSync,
    pub startup_window_days: i64,
}

impl AppState {
    pub fn new(
        store: Store,
        client: CongressClient,
        cache_dir: impl Into<PathBuf>,
        startup_window_days: i64,
    ) -> Self {
        let resolver = TextResolver::new(client.clone());
        let synchronizer = Arc::new(BillSynchronizer::new(client.clone(), store.clone()));
        Self {
            store,
            client,
            resolver,
            cache: DocumentCache::new(cache_dir),
            synchronizer,
            startup: StartupSync::new(),
            startup_window_days,
        }
    }
}

/// Structured failure response: `{ "error": "..." }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(format!("serializing response: {err}"))
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/bills", get(bills::list_bills))
        .route("/bills/{id}", get(bills::get_bill))
        .route("/bills/{id}/text", get(documents::bill_text))
        .route("/bills/{id}/download", get(documents::download_bill))
        .route("/search-bills", get(search::search_bills))
        .route("/pdf", get(documents::pdf_proxy))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Open the store, kick off the background freshness sync, and serve until
/// shutdown.
pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = SyncConfig::from_env();
    let store = Store::connect(&config.database_path).await?;
    store.init_schema().await?;
    let client = CongressClient::from_env()?;
    let state = AppState::new(
        store,
        client,
        config.cache_dir.clone(),
        config.startup_window_days,
    );
    state
        .startup
        .spawn_initial_sync(state.synchronizer.clone(), state.startup_window_days);

    let port: u16 = std::env::var("BILLSCOPE_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "serving bill tracker API");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use billscope_client::ClientConfig;

    /// State backed by an in-memory database and a client that never needs
    /// the environment. Tests exercise only offline paths.
    pub async fn offline_state(cache_dir: impl Into<PathBuf>) -> AppState {
        let store = Store::open_in_memory().await.expect("open store");
        store.init_schema().await.expect("init schema");
        let client = CongressClient::new(ClientConfig {
            api_key: Some("test-key".to_string()),
            ..ClientConfig::default()
        })
        .expect("client");
        AppState::new(store, client, cache_dir, 3)
    }
}
