// Snapshot side lookups: last known metadata per host, and first-seen time.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::shaping::ROOT_PATH;
use crate::models::{FieldValue, Sample};
use crate::store::{Pick, Selection, TimeRange};

pub const META_MEASUREMENT: &str = "system_meta";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostMetadata {
    pub os_type: Option<String>,
    pub ip_address: Option<String>,
    pub cpu_cores: Option<f64>,
    /// Bytes.
    pub ram_total: Option<f64>,
    /// Bytes.
    pub storage_total: Option<f64>,
    /// Proxy for host creation: first `os_type` report in the discovery window.
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    OsType,
    IpAddress,
    CpuCores,
    RamTotal,
    StorageTotal,
}

impl MetadataField {
    pub const ALL: [MetadataField; 5] = [
        MetadataField::OsType,
        MetadataField::IpAddress,
        MetadataField::CpuCores,
        MetadataField::RamTotal,
        MetadataField::StorageTotal,
    ];

    /// Last reported value within `range`.
    pub fn selection(self, range: TimeRange, host: Option<&str>) -> Selection {
        let selection = match self {
            MetadataField::OsType => Selection::new(META_MEASUREMENT, "os_type", range),
            MetadataField::IpAddress => Selection::new(META_MEASUREMENT, "ip_address", range),
            MetadataField::CpuCores => Selection::new("system", "n_cpus", range),
            MetadataField::RamTotal => Selection::new("mem", "total", range),
            MetadataField::StorageTotal => {
                Selection::new("disk", "total", range).tag_eq("path", ROOT_PATH)
            }
        };
        selection.host(host).pick(Pick::Last)
    }

    fn apply(self, meta: &mut HostMetadata, value: &FieldValue) {
        match self {
            MetadataField::OsType => meta.os_type = Some(as_string(value)),
            MetadataField::IpAddress => meta.ip_address = Some(as_string(value)),
            MetadataField::CpuCores => meta.cpu_cores = as_number(value),
            MetadataField::RamTotal => meta.ram_total = as_number(value),
            MetadataField::StorageTotal => meta.storage_total = as_number(value),
        }
    }
}

pub fn creation_selection(range: TimeRange, host: Option<&str>) -> Selection {
    Selection::new(META_MEASUREMENT, "os_type", range)
        .host(host)
        .pick(Pick::First)
}

fn as_string(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Float(v) => v.to_string(),
    }
}

fn as_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Float(v) => Some(*v),
        FieldValue::Text(s) => s.trim().parse().ok(),
    }
}

/// Folds the per-field lookups and the creation lookup into metadata per host.
pub fn resolve(
    fields: impl IntoIterator<Item = (MetadataField, Vec<Sample>)>,
    creation: &[Sample],
) -> BTreeMap<String, HostMetadata> {
    let mut out: BTreeMap<String, HostMetadata> = BTreeMap::new();
    for (field, samples) in fields {
        for s in samples {
            if let Some(host) = s.host {
                field.apply(out.entry(host).or_default(), &s.value);
            }
        }
    }
    for s in creation {
        if let Some(host) = &s.host {
            let meta = out.entry(host.clone()).or_default();
            meta.created_at = Some(meta.created_at.map_or(s.time, |t| t.min(s.time)));
        }
    }
    out
}
