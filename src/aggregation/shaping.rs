// Stage 2: per-metric shaping. Each metric family reduces raw samples to
// (host, time, value) series with its own transform.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;

use crate::models::Sample;
use crate::store::{Selection, TimeRange};

/// Aggregate CPU row emitted by the collector next to the per-core ones.
pub const CPU_TOTAL: &str = "cpu-total";
pub const ROOT_PATH: &str = "/";
pub const LOOPBACK_INTERFACE: &str = "lo";

/// Ascending (time, value) pairs for one host.
pub type Series = Vec<(DateTime<Utc>, f64)>;

/// The live metric columns shared by history and snapshot rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricColumn {
    CpuUsage,
    RamUsed,
    StorageUsed,
    NetworkIn,
    NetworkOut,
}

impl MetricColumn {
    pub const ALL: [MetricColumn; 5] = [
        MetricColumn::CpuUsage,
        MetricColumn::RamUsed,
        MetricColumn::StorageUsed,
        MetricColumn::NetworkIn,
        MetricColumn::NetworkOut,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricColumn::CpuUsage => "cpu_usage",
            MetricColumn::RamUsed => "ram_used",
            MetricColumn::StorageUsed => "storage_used",
            MetricColumn::NetworkIn => "network_in",
            MetricColumn::NetworkOut => "network_out",
        }
    }

    /// Cumulative byte counters that must be turned into rates.
    pub fn is_counter(self) -> bool {
        matches!(self, MetricColumn::NetworkIn | MetricColumn::NetworkOut)
    }

    /// Source measurement, field and tag predicates for this column.
    pub fn selection(self, range: TimeRange, host: Option<&str>) -> Selection {
        let selection = match self {
            MetricColumn::CpuUsage => {
                Selection::new("cpu", "usage_idle", range).tag_eq("cpu", CPU_TOTAL)
            }
            MetricColumn::RamUsed => Selection::new("mem", "used", range),
            MetricColumn::StorageUsed => {
                Selection::new("disk", "used", range).tag_eq("path", ROOT_PATH)
            }
            MetricColumn::NetworkIn => Selection::new("net", "bytes_recv", range)
                .tag_ne("interface", LOOPBACK_INTERFACE),
            MetricColumn::NetworkOut => Selection::new("net", "bytes_sent", range)
                .tag_ne("interface", LOOPBACK_INTERFACE),
        };
        selection.host(host)
    }
}

/// Percent busy from percent idle.
pub fn cpu_busy(idle: f64) -> f64 {
    (100.0 - idle).clamp(0.0, 100.0)
}

/// Numeric samples per host in time order. Text values are skipped.
pub fn series_by_host(samples: &[Sample]) -> BTreeMap<String, Series> {
    let mut out: BTreeMap<String, Series> = BTreeMap::new();
    for s in samples {
        let (Some(host), Some(v)) = (s.host.as_ref(), s.value.as_f64()) else {
            continue;
        };
        out.entry(host.clone()).or_default().push((s.time, v));
    }
    for series in out.values_mut() {
        series.sort_by_key(|(t, _)| *t);
    }
    out
}

/// Sums per-interface counters into one total per host and timestamp.
pub fn sum_per_timestamp(samples: &[Sample]) -> BTreeMap<String, Series> {
    let mut totals: BTreeMap<String, BTreeMap<DateTime<Utc>, f64>> = BTreeMap::new();
    for s in samples {
        let (Some(host), Some(v)) = (s.host.as_ref(), s.value.as_f64()) else {
            continue;
        };
        *totals
            .entry(host.clone())
            .or_default()
            .entry(s.time)
            .or_insert(0.0) += v;
    }
    totals
        .into_iter()
        .map(|(host, by_time)| (host, by_time.into_iter().collect()))
        .collect()
}

/// Per-second first difference of a monotonic counter, stamped at the later point.
/// A decrease (counter reset) yields 0 rather than a negative rate.
pub fn non_negative_rate(series: &[(DateTime<Utc>, f64)]) -> Series {
    series
        .windows(2)
        .filter_map(|pair| {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            let nanos = (t1 - t0).num_nanoseconds()?;
            if nanos <= 0 {
                return None;
            }
            let dt = nanos as f64 / 1e9;
            Some((t1, (v1 - v0).max(0.0) / dt))
        })
        .collect()
}

/// Mean per epoch-aligned window of width `every`. Each window is stamped with its
/// end, clipped to `range.stop`; windows without samples are not emitted.
pub fn window_mean(series: &[(DateTime<Utc>, f64)], every: TimeDelta, range: &TimeRange) -> Series {
    let every_ms = every.num_milliseconds();
    if every_ms <= 0 {
        return series.to_vec();
    }
    let mut buckets: BTreeMap<i64, (f64, u32)> = BTreeMap::new();
    for (t, v) in series {
        let ms = t.timestamp_millis();
        let end = ms.div_euclid(every_ms) * every_ms + every_ms;
        let slot = buckets.entry(end).or_insert((0.0, 0));
        slot.0 += v;
        slot.1 += 1;
    }
    buckets
        .into_iter()
        .filter_map(|(end, (sum, n))| {
            let stamp = DateTime::<Utc>::from_timestamp_millis(end)?.min(range.stop);
            Some((stamp, sum / f64::from(n)))
        })
        .collect()
}

fn shaped_series(column: MetricColumn, samples: &[Sample]) -> BTreeMap<String, Series> {
    if column.is_counter() {
        sum_per_timestamp(samples)
            .into_iter()
            .map(|(host, totals)| (host, non_negative_rate(&totals)))
            .collect()
    } else {
        series_by_host(samples)
    }
}

/// History shaping: per host, window means at `every` (CPU converted to busy %).
pub fn shape_windowed(
    column: MetricColumn,
    samples: &[Sample],
    every: TimeDelta,
    range: &TimeRange,
) -> BTreeMap<String, Series> {
    shaped_series(column, samples)
        .into_iter()
        .map(|(host, series)| {
            let mut windowed = window_mean(&series, every, range);
            if column == MetricColumn::CpuUsage {
                for (_, v) in windowed.iter_mut() {
                    *v = cpu_busy(*v);
                }
            }
            (host, windowed)
        })
        .filter(|(_, series)| !series.is_empty())
        .collect()
}

/// Snapshot shaping: the most recent value per host (last rate for counters).
pub fn shape_latest(column: MetricColumn, samples: &[Sample]) -> BTreeMap<String, f64> {
    shaped_series(column, samples)
        .into_iter()
        .filter_map(|(host, series)| {
            let (_, v) = *series.last()?;
            let v = if column == MetricColumn::CpuUsage {
                cpu_busy(v)
            } else {
                v
            };
            Some((host, v))
        })
        .collect()
}
