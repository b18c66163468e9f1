// Instance handlers: snapshot list, single instance, per-host metric history

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;

use super::sequence::generated_at;
use super::{ApiError, AppState};
use crate::store::StoreError;

const SNAPSHOT_QUERY_FAILED: &str = "Error querying InfluxDB";
const HISTORY_QUERY_FAILED: &str = "Error querying InfluxDB for metrics";

fn store_failure(state: &AppState, message: &'static str, e: StoreError) -> ApiError {
    state.stats.record_store_failure();
    tracing::error!(error = %e, "{}", message);
    ApiError::Store { message, source: e }
}

fn host_id(raw: &str) -> Result<&str, ApiError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ApiError::MissingHostId);
    }
    Ok(id)
}

/// GET /instances: one row per known host.
pub(super) async fn list_instances(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let rows = state
        .snapshot
        .instances(now)
        .await
        .map_err(|e| store_failure(&state, SNAPSHOT_QUERY_FAILED, e))?;
    state.stats.record_instances();
    Ok((generated_at(now), Json(rows)))
}

/// GET /instances/{id}: the snapshot row for one host.
pub(super) async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = host_id(&id)?;
    let now = Utc::now();
    let row = state
        .snapshot
        .instance(id, now)
        .await
        .map_err(|e| store_failure(&state, SNAPSHOT_QUERY_FAILED, e))?
        .ok_or(ApiError::NotFound)?;
    state.stats.record_instances();
    Ok((generated_at(now), Json(row)))
}

/// GET /instances/{id}/metrics: last hour of 1-minute buckets, ascending.
pub(super) async fn instance_metrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = host_id(&id)?;
    let now = Utc::now();
    let rows = state
        .history
        .metrics(id, now)
        .await
        .map_err(|e| store_failure(&state, HISTORY_QUERY_FAILED, e))?;
    state.stats.record_metrics();
    Ok((generated_at(now), Json(rows)))
}
