// Stage 4: defaulting, unit conversion and status derivation into response rows.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::metadata::HostMetadata;
use super::pivot::MetricColumns;
use super::shaping::MetricColumn;
use crate::models::{HostStatus, InstanceRow, MetricRow};

pub const UNKNOWN: &str = "unknown";

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GIB: f64 = BYTES_PER_MIB * 1024.0;

pub fn bytes_to_mib(bytes: f64) -> f64 {
    bytes / BYTES_PER_MIB
}

pub fn bytes_to_gib(bytes: f64) -> f64 {
    bytes / BYTES_PER_GIB
}

/// Absent or non-finite values become 0.0.
fn or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// What to report as RAM used when a host has a known total but no recent `mem.used`.
/// The fraction is a placeholder estimate, not a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RamUsedFallback {
    FractionOfTotal(f64),
    Zero,
}

impl Default for RamUsedFallback {
    fn default() -> Self {
        RamUsedFallback::FractionOfTotal(0.5)
    }
}

impl RamUsedFallback {
    /// RAM used in bytes: the sample if there is one, otherwise this policy.
    pub fn ram_used_bytes(self, used: Option<f64>, total_bytes: f64) -> f64 {
        if let Some(used) = used.filter(|v| v.is_finite()) {
            return used;
        }
        match self {
            RamUsedFallback::FractionOfTotal(f) if total_bytes > 0.0 => total_bytes * f,
            _ => 0.0,
        }
    }
}

/// Online iff any live gauge or rate column holds a real sample.
pub fn host_status(columns: &MetricColumns) -> HostStatus {
    if columns.is_empty() {
        HostStatus::Offline
    } else {
        HostStatus::Online
    }
}

pub fn metric_row(recorded_at: DateTime<Utc>, columns: &MetricColumns) -> MetricRow {
    MetricRow {
        recorded_at,
        cpu_usage: or_zero(columns.get(MetricColumn::CpuUsage)).clamp(0.0, 100.0),
        ram_used_mb: bytes_to_mib(or_zero(columns.get(MetricColumn::RamUsed))),
        storage_used_gb: bytes_to_gib(or_zero(columns.get(MetricColumn::StorageUsed))),
        network_in_mbps: bytes_to_mib(or_zero(columns.get(MetricColumn::NetworkIn))),
        network_out_mbps: bytes_to_mib(or_zero(columns.get(MetricColumn::NetworkOut))),
    }
}

pub fn instance_row(
    host: &str,
    columns: &MetricColumns,
    meta: &HostMetadata,
    ram_used_fallback: RamUsedFallback,
) -> InstanceRow {
    let ram_total_bytes = or_zero(meta.ram_total);
    let ram_used_bytes =
        ram_used_fallback.ram_used_bytes(columns.get(MetricColumn::RamUsed), ram_total_bytes);
    let cpu_cores = meta
        .cpu_cores
        .filter(|c| c.is_finite() && *c > 0.0)
        .map(|c| c.round() as u32)
        .unwrap_or(0);

    InstanceRow {
        id: host.to_string(),
        name: host.to_string(),
        status: host_status(columns),
        os_type: meta.os_type.clone().unwrap_or_else(|| UNKNOWN.into()),
        ip_address: meta.ip_address.clone().unwrap_or_else(|| UNKNOWN.into()),
        cpu_cores,
        cpu_usage: or_zero(columns.get(MetricColumn::CpuUsage)).clamp(0.0, 100.0),
        ram_total_mb: bytes_to_mib(ram_total_bytes),
        ram_used_mb: bytes_to_mib(ram_used_bytes),
        storage_total_gb: bytes_to_gib(or_zero(meta.storage_total)),
        storage_used_gb: bytes_to_gib(or_zero(columns.get(MetricColumn::StorageUsed))),
        network_in_mbps: bytes_to_mib(or_zero(columns.get(MetricColumn::NetworkIn))),
        network_out_mbps: bytes_to_mib(or_zero(columns.get(MetricColumn::NetworkOut))),
        created_at: meta.created_at,
    }
}
