// Host history: one row per time bucket for a single host over the look-back window.

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::instrument;

use super::shaping::{self, MetricColumn};
use super::source::select_samples;
use super::{defaults, pivot};
use crate::config::{HistoryConfig, window_secs};
use crate::models::MetricRow;
use crate::store::{SampleStore, Selection, StoreError, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub lookback: TimeDelta,
    pub bucket: TimeDelta,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            lookback: TimeDelta::hours(1),
            bucket: TimeDelta::minutes(1),
        }
    }
}

impl From<&HistoryConfig> for HistoryWindow {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            lookback: window_secs(config.lookback_secs),
            bucket: window_secs(config.bucket_secs),
        }
    }
}

pub struct HistoryAggregator {
    store: Arc<dyn SampleStore>,
    window: HistoryWindow,
}

impl HistoryAggregator {
    pub fn new(store: Arc<dyn SampleStore>, window: HistoryWindow) -> Self {
        Self { store, window }
    }

    /// Bucketed metrics for `host` in `[now - lookback, now)`, ascending by time.
    /// Any failed selection fails the whole call.
    #[instrument(skip(self), fields(aggregator = "history"))]
    pub async fn metrics(
        &self,
        host: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<MetricRow>, StoreError> {
        let range = TimeRange::lookback(now, self.window.lookback);
        let selections: Vec<Selection> = MetricColumn::ALL
            .iter()
            .map(|c| c.selection(range, Some(host)))
            .collect();
        let selected = try_join_all(
            selections
                .iter()
                .map(|s| select_samples(self.store.as_ref(), s)),
        )
        .await?;

        let streams = MetricColumn::ALL
            .into_iter()
            .zip(selected)
            .map(|(column, samples)| {
                let mut by_host =
                    shaping::shape_windowed(column, &samples, self.window.bucket, &range);
                (column, by_host.remove(host).unwrap_or_default())
            });
        let rows: Vec<MetricRow> = pivot::pivot_by_time(streams)
            .iter()
            .map(|(t, columns)| defaults::metric_row(*t, columns))
            .collect();

        tracing::debug!(rows = rows.len(), "history aggregated");
        Ok(rows)
    }
}
