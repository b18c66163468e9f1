// Host snapshot: one row per known host with metadata, live gauges, network rates
// and online/offline status.

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::instrument;

use super::defaults::{self, RamUsedFallback};
use super::metadata::{self, HostMetadata, MetadataField};
use super::shaping::{self, MetricColumn};
use super::pivot;
use super::source::select_samples;
use crate::config::{SnapshotConfig, window_days, window_secs};
use crate::models::{HostStatus, InstanceRow};
use crate::store::{Pick, SampleStore, Selection, StoreError, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotWindows {
    /// How far back a host still counts as known.
    pub discovery: TimeDelta,
    /// Liveness window for CPU, RAM and storage gauges.
    pub gauge: TimeDelta,
    /// Liveness window for network rates.
    pub network: TimeDelta,
}

impl Default for SnapshotWindows {
    fn default() -> Self {
        Self {
            discovery: TimeDelta::days(30),
            gauge: TimeDelta::minutes(5),
            network: TimeDelta::minutes(2),
        }
    }
}

impl From<&SnapshotConfig> for SnapshotWindows {
    fn from(config: &SnapshotConfig) -> Self {
        Self {
            discovery: window_days(config.discovery_days),
            gauge: window_secs(config.gauge_window_secs),
            network: window_secs(config.network_window_secs),
        }
    }
}

pub struct SnapshotAggregator {
    store: Arc<dyn SampleStore>,
    windows: SnapshotWindows,
    ram_used_fallback: RamUsedFallback,
}

impl SnapshotAggregator {
    pub fn new(
        store: Arc<dyn SampleStore>,
        windows: SnapshotWindows,
        ram_used_fallback: RamUsedFallback,
    ) -> Self {
        Self {
            store,
            windows,
            ram_used_fallback,
        }
    }

    /// Every host seen within the discovery window, unique by id.
    #[instrument(skip(self), fields(aggregator = "snapshot"))]
    pub async fn instances(&self, now: DateTime<Utc>) -> Result<Vec<InstanceRow>, StoreError> {
        self.collect(None, now).await
    }

    /// The row for one host, or None when it never reported within the discovery window.
    #[instrument(skip(self), fields(aggregator = "snapshot"))]
    pub async fn instance(
        &self,
        host: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<InstanceRow>, StoreError> {
        Ok(self
            .collect(Some(host), now)
            .await?
            .into_iter()
            .find(|row| row.id == host))
    }

    fn live_selection(
        &self,
        column: MetricColumn,
        now: DateTime<Utc>,
        host: Option<&str>,
    ) -> Selection {
        if column.is_counter() {
            // Rates need every counter sample in the window, not just the last one.
            column.selection(TimeRange::lookback(now, self.windows.network), host)
        } else {
            column
                .selection(TimeRange::lookback(now, self.windows.gauge), host)
                .pick(Pick::Last)
        }
    }

    async fn collect(
        &self,
        host: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<InstanceRow>, StoreError> {
        let discovery = TimeRange::lookback(now, self.windows.discovery);

        let mut selections: Vec<Selection> = MetricColumn::ALL
            .iter()
            .map(|c| self.live_selection(*c, now, host))
            .collect();
        selections.extend(
            MetadataField::ALL
                .iter()
                .map(|f| f.selection(discovery, host)),
        );
        selections.push(metadata::creation_selection(discovery, host));

        let store = self.store.as_ref();
        let (mut known_hosts, mut selected) = futures_util::try_join!(
            store.hosts(&discovery),
            try_join_all(selections.iter().map(|s| select_samples(store, s))),
        )?;
        if let Some(h) = host {
            known_hosts.retain(|k| k == h);
        }

        let creation = selected.pop().unwrap_or_default();
        let meta_samples = selected.split_off(MetricColumn::ALL.len());
        let live = MetricColumn::ALL
            .into_iter()
            .zip(selected)
            .map(|(column, samples)| (column, shaping::shape_latest(column, &samples)));
        let columns = pivot::pivot_by_host(&known_hosts, live);
        let meta = metadata::resolve(MetadataField::ALL.into_iter().zip(meta_samples), &creation);

        let empty = HostMetadata::default();
        let rows: Vec<InstanceRow> = columns
            .iter()
            .map(|(h, cols)| {
                let host_meta = meta.get(h).unwrap_or(&empty);
                defaults::instance_row(h, cols, host_meta, self.ram_used_fallback)
            })
            .collect();

        tracing::debug!(
            hosts = rows.len(),
            online = rows
                .iter()
                .filter(|r| r.status == HostStatus::Online)
                .count(),
            "snapshot aggregated"
        );
        Ok(rows)
    }
}
