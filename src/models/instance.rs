// Snapshot rows: current state of every known host

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time_format;

/// Serializes to lowercase JSON ("online" / "offline").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRow {
    pub id: String,
    pub name: String,
    pub status: HostStatus,
    pub os_type: String,
    pub ip_address: String,
    pub cpu_cores: u32,
    pub cpu_usage: f64,
    #[serde(rename = "ram_total")]
    pub ram_total_mb: f64,
    #[serde(rename = "ram_used")]
    pub ram_used_mb: f64,
    #[serde(rename = "storage_total")]
    pub storage_total_gb: f64,
    #[serde(rename = "storage_used")]
    pub storage_used_gb: f64,
    #[serde(rename = "network_in")]
    pub network_in_mbps: f64,
    #[serde(rename = "network_out")]
    pub network_out_mbps: f64,
    /// First time the host reported metadata; `""` on the wire when never seen.
    #[serde(with = "time_format::or_empty")]
    pub created_at: Option<DateTime<Utc>>,
}
