// Stage 3: alignment. Long (key, column, value) streams become one row per key.
// Columns without a value stay absent; defaulting happens afterwards.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::shaping::{MetricColumn, Series};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricColumns(BTreeMap<MetricColumn, f64>);

impl MetricColumns {
    pub fn get(&self, column: MetricColumn) -> Option<f64> {
        self.0.get(&column).copied()
    }

    pub fn set(&mut self, column: MetricColumn, value: f64) {
        self.0.insert(column, value);
    }

    /// True when no column received a real sample.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One entry per distinct timestamp across all streams, ascending.
pub fn pivot_by_time(
    streams: impl IntoIterator<Item = (MetricColumn, Series)>,
) -> BTreeMap<DateTime<Utc>, MetricColumns> {
    let mut rows: BTreeMap<DateTime<Utc>, MetricColumns> = BTreeMap::new();
    for (column, series) in streams {
        for (t, v) in series {
            rows.entry(t).or_default().set(column, v);
        }
    }
    rows
}

/// One entry per known host, plus any host that only shows up in the streams.
pub fn pivot_by_host(
    known_hosts: &BTreeSet<String>,
    streams: impl IntoIterator<Item = (MetricColumn, BTreeMap<String, f64>)>,
) -> BTreeMap<String, MetricColumns> {
    let mut rows: BTreeMap<String, MetricColumns> = known_hosts
        .iter()
        .map(|h| (h.clone(), MetricColumns::default()))
        .collect();
    for (column, by_host) in streams {
        for (host, v) in by_host {
            rows.entry(host).or_default().set(column, v);
        }
    }
    rows
}
