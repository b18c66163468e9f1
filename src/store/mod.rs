// Time-series store seam: what to select, and who answers it (InfluxDB or memory).

mod influx;
mod memory;

pub use influx::InfluxStore;
pub use memory::MemoryStore;

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::BoxFuture;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::models::Sample;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable or the query was rejected; message is the upstream one.
    #[error("{0}")]
    Query(String),
    #[error("unexpected response from store: {0}")]
    Decode(String),
    #[error("store query timed out after {0:?}")]
    Timeout(Duration),
}

/// Half-open range `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

impl TimeRange {
    /// `[now - lookback, now)`. A look-back past the earliest representable time
    /// starts there instead.
    pub fn lookback(now: DateTime<Utc>, lookback: TimeDelta) -> Self {
        Self {
            start: now
                .checked_sub_signed(lookback.abs())
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            stop: now,
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.stop
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPredicate {
    /// Tag must be present and equal.
    Equals(String, String),
    /// Tag absent or different.
    NotEquals(String, String),
}

impl TagPredicate {
    pub fn matches(&self, sample: &Sample) -> bool {
        match self {
            TagPredicate::Equals(k, v) => sample.tag(k) == Some(v.as_str()),
            TagPredicate::NotEquals(k, v) => sample.tag(k) != Some(v.as_str()),
        }
    }
}

/// Reduction per (host, measurement, field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    All,
    First,
    Last,
}

/// One measurement + field over a range, optionally scoped to a host and narrowed by tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub measurement: String,
    pub field: String,
    pub host: Option<String>,
    pub tags: Vec<TagPredicate>,
    pub range: TimeRange,
    pub pick: Pick,
}

impl Selection {
    pub fn new(measurement: &str, field: &str, range: TimeRange) -> Self {
        Self {
            measurement: measurement.into(),
            field: field.into(),
            host: None,
            tags: Vec::new(),
            range,
            pick: Pick::All,
        }
    }

    pub fn host(mut self, host: Option<&str>) -> Self {
        self.host = host.map(Into::into);
        self
    }

    pub fn tag_eq(mut self, key: &str, value: &str) -> Self {
        self.tags
            .push(TagPredicate::Equals(key.into(), value.into()));
        self
    }

    pub fn tag_ne(mut self, key: &str, value: &str) -> Self {
        self.tags
            .push(TagPredicate::NotEquals(key.into(), value.into()));
        self
    }

    pub fn pick(mut self, pick: Pick) -> Self {
        self.pick = pick;
        self
    }

    /// Full predicate. Samples without a host tag never match.
    pub fn matches(&self, sample: &Sample) -> bool {
        let Some(host) = sample.host.as_deref() else {
            return false;
        };
        sample.measurement == self.measurement
            && sample.field == self.field
            && self.range.contains(sample.time)
            && self.host.as_deref().is_none_or(|h| h == host)
            && self.tags.iter().all(|p| p.matches(sample))
    }
}

/// Read access to raw samples. `pick` is a hint the store may push down;
/// callers re-apply it, so returning every matching sample is also correct.
pub trait SampleStore: Send + Sync {
    fn select<'a>(&'a self, selection: &'a Selection)
    -> BoxFuture<'a, Result<Vec<Sample>, StoreError>>;

    /// Distinct host tag values seen within `range`.
    fn hosts<'a>(&'a self, range: &'a TimeRange)
    -> BoxFuture<'a, Result<BTreeSet<String>, StoreError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lookback_past_the_epoch_range_starts_at_the_minimum() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let range = TimeRange::lookback(now, TimeDelta::MAX);
        assert_eq!(range.start, DateTime::<Utc>::MIN_UTC);
        assert!(range.contains(now - TimeDelta::seconds(30)));

        let hour = TimeRange::lookback(now, TimeDelta::hours(1));
        assert_eq!(hour.start, now - TimeDelta::hours(1));
    }
}
