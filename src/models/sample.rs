// Raw points as returned by the time-series store

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Field value of a stored point. Metric fields are numeric, host metadata fields are text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Float(_) => None,
        }
    }
}

/// One immutable point: measurement/field identity, host tag, other tags, value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub measurement: String,
    pub field: String,
    /// Missing on malformed points; those never reach aggregation.
    pub host: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub value: FieldValue,
}

impl Sample {
    pub fn float(
        time: DateTime<Utc>,
        measurement: &str,
        field: &str,
        host: &str,
        value: f64,
    ) -> Self {
        Self {
            time,
            measurement: measurement.into(),
            field: field.into(),
            host: Some(host.into()),
            tags: BTreeMap::new(),
            value: FieldValue::Float(value),
        }
    }

    pub fn text(
        time: DateTime<Utc>,
        measurement: &str,
        field: &str,
        host: &str,
        value: &str,
    ) -> Self {
        Self {
            value: FieldValue::Text(value.into()),
            ..Self::float(time, measurement, field, host, 0.0)
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn without_host(mut self) -> Self {
        self.host = None;
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
