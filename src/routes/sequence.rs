// Response ordering hints for polling clients that may have overlapping requests in flight.

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};

use super::AppState;
use crate::models::time_format;

/// Monotonic per-process sequence, assigned when the request arrives.
pub const RESPONSE_SEQ_HEADER: &str = "x-response-seq";
/// The `now` that the aggregation ranges were computed from.
pub const GENERATED_AT_HEADER: &str = "x-generated-at";

pub(super) async fn stamp_sequence(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let seq = state.stats.next_sequence();
    let mut res = next.run(req).await;
    res.headers_mut().insert(
        HeaderName::from_static(RESPONSE_SEQ_HEADER),
        HeaderValue::from(seq),
    );
    res
}

pub(super) fn generated_at(now: DateTime<Utc>) -> [(HeaderName, String); 1] {
    [(
        HeaderName::from_static(GENERATED_AT_HEADER),
        time_format::to_rfc3339(&now),
    )]
}
