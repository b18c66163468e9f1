// HTTP routes: instance snapshot + history reads, health, version

mod auth;
mod error;
mod http;
mod instances;
mod sequence;

pub use error::ApiError;
pub use sequence::{GENERATED_AT_HEADER, RESPONSE_SEQ_HEADER};

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregation::{HistoryAggregator, HistoryWindow, SnapshotAggregator, SnapshotWindows};
use crate::config::AppConfig;
use crate::stats::ApiStats;
use crate::store::SampleStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) snapshot: Arc<SnapshotAggregator>,
    pub(crate) history: Arc<HistoryAggregator>,
    pub(crate) stats: Arc<ApiStats>,
    pub(crate) api_tokens: Arc<[String]>,
}

pub fn app(store: Arc<dyn SampleStore>, stats: Arc<ApiStats>, config: &AppConfig) -> Router {
    let state = AppState {
        snapshot: Arc::new(SnapshotAggregator::new(
            store.clone(),
            SnapshotWindows::from(&config.snapshot),
            config.snapshot.ram_used_fallback,
        )),
        history: Arc::new(HistoryAggregator::new(
            store,
            HistoryWindow::from(&config.history),
        )),
        stats,
        api_tokens: config.auth.api_tokens.clone().into(),
    };

    let instances = Router::new()
        .route("/instances", get(instances::list_instances)) // GET /instances
        .route("/instances/{id}", get(instances::get_instance)) // GET /instances/{id}
        .route("/instances/{id}/metrics", get(instances::instance_metrics)) // GET /instances/{id}/metrics
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        .route("/health", get(http::health_handler)) // GET /health
        .route("/version", get(http::version_handler)) // GET /version
        .merge(instances)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            sequence::stamp_sequence,
        ))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
