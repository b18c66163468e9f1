// Shared test helpers: a fixed clock, telegraf-shaped samples, and a failing store.
#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use futures_util::future::BoxFuture;
use hostwatch::models::Sample;
use hostwatch::store::{SampleStore, Selection, StoreError, TimeRange};
use std::collections::BTreeSet;

pub const MIB: f64 = 1024.0 * 1024.0;
pub const GIB: f64 = MIB * 1024.0;

/// 2025-03-01T12:00:30Z. Not minute-aligned, so the newest history bucket is clipped.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 30).unwrap()
}

pub fn ago(secs: i64) -> DateTime<Utc> {
    now() - TimeDelta::seconds(secs)
}

pub fn cpu_idle(host: &str, t: DateTime<Utc>, idle: f64) -> Sample {
    Sample::float(t, "cpu", "usage_idle", host, idle).with_tag("cpu", "cpu-total")
}

pub fn cpu_core_idle(host: &str, t: DateTime<Utc>, core: &str, idle: f64) -> Sample {
    Sample::float(t, "cpu", "usage_idle", host, idle).with_tag("cpu", core)
}

pub fn mem(host: &str, t: DateTime<Utc>, field: &str, bytes: f64) -> Sample {
    Sample::float(t, "mem", field, host, bytes)
}

pub fn disk(host: &str, t: DateTime<Utc>, path: &str, field: &str, bytes: f64) -> Sample {
    Sample::float(t, "disk", field, host, bytes).with_tag("path", path)
}

pub fn net(host: &str, t: DateTime<Utc>, interface: &str, field: &str, bytes: f64) -> Sample {
    Sample::float(t, "net", field, host, bytes).with_tag("interface", interface)
}

pub fn meta(host: &str, t: DateTime<Utc>, field: &str, value: &str) -> Sample {
    Sample::text(t, "system_meta", field, host, value)
}

pub fn n_cpus(host: &str, t: DateTime<Utc>, n: f64) -> Sample {
    Sample::float(t, "system", "n_cpus", host, n)
}

/// Store that rejects every query, like an unreachable InfluxDB.
pub struct FailingStore(pub &'static str);

impl SampleStore for FailingStore {
    fn select<'a>(
        &'a self,
        _selection: &'a Selection,
    ) -> BoxFuture<'a, Result<Vec<Sample>, StoreError>> {
        Box::pin(async move { Err(StoreError::Query(self.0.to_string())) })
    }

    fn hosts<'a>(
        &'a self,
        _range: &'a TimeRange,
    ) -> BoxFuture<'a, Result<BTreeSet<String>, StoreError>> {
        Box::pin(async move { Err(StoreError::Query(self.0.to_string())) })
    }
}
