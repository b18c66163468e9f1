// History rows: one per time bucket for a single host

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time_format;

/// One time bucket of host history. Units: percent, MiB, GiB, MiB/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    #[serde(with = "time_format::required")]
    pub recorded_at: DateTime<Utc>,
    pub cpu_usage: f64,
    #[serde(rename = "ram_used")]
    pub ram_used_mb: f64,
    #[serde(rename = "storage_used")]
    pub storage_used_gb: f64,
    #[serde(rename = "network_in")]
    pub network_in_mbps: f64,
    #[serde(rename = "network_out")]
    pub network_out_mbps: f64,
}
