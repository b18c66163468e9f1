// InfluxDB-backed store: InfluxQL over the HTTP query API, decoded into Samples.

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::future::BoxFuture;
use influxdb::{Client, ReadQuery};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use super::{Pick, SampleStore, Selection, StoreError, TagPredicate, TimeRange};
use crate::config::InfluxConfig;
use crate::models::{FieldValue, Sample};

pub struct InfluxStore {
    client: Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    series: Vec<QuerySeries>,
}

#[derive(Debug, Deserialize)]
struct QuerySeries {
    name: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl InfluxStore {
    pub fn connect(config: &InfluxConfig) -> Self {
        let mut client = Client::new(config.url.clone(), config.database.clone());
        match config.resolved_token() {
            Some(token) => client = client.with_token(token),
            None => tracing::warn!(
                url = %config.url,
                "no InfluxDB token configured; querying anonymously"
            ),
        }
        Self {
            client,
            timeout: Duration::from_secs(config.query_timeout_secs),
        }
    }

    async fn run(&self, statement: String) -> Result<Vec<QuerySeries>, StoreError> {
        tracing::debug!(statement = %statement, "influx query");
        let query = self.client.json_query(ReadQuery::new(statement));
        let response = tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let Some(first) = response.results.into_iter().next() else {
            return Ok(Vec::new());
        };
        let result: StatementResult =
            serde_json::from_value(first).map_err(|e| StoreError::Decode(e.to_string()))?;
        if let Some(error) = result.error {
            return Err(StoreError::Query(error));
        }
        Ok(result.series)
    }
}

impl SampleStore for InfluxStore {
    fn select<'a>(
        &'a self,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<Vec<Sample>, StoreError>> {
        Box::pin(async move {
            let series = self.run(select_statement(selection)).await?;
            decode_samples(selection, series)
        })
    }

    fn hosts<'a>(
        &'a self,
        range: &'a TimeRange,
    ) -> BoxFuture<'a, Result<BTreeSet<String>, StoreError>> {
        Box::pin(async move {
            let series = self.run(hosts_statement(range)).await?;
            decode_tag_values(series)
        })
    }
}

/// InfluxQL string literal. Every value that reaches query text goes through here.
pub(crate) fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// InfluxQL identifier (measurement, field, tag key).
pub(crate) fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn time_literal(t: DateTime<Utc>) -> String {
    quote_literal(&t.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

fn range_condition(range: &TimeRange) -> String {
    format!(
        "time >= {} AND time < {}",
        time_literal(range.start),
        time_literal(range.stop)
    )
}

pub(crate) fn select_statement(selection: &Selection) -> String {
    let field = quote_ident(&selection.field);
    let projection = match selection.pick {
        Pick::All => field,
        Pick::First => format!("FIRST({})", field),
        Pick::Last => format!("LAST({})", field),
    };
    let mut conditions = vec![range_condition(&selection.range)];
    if let Some(host) = &selection.host {
        conditions.push(format!("{} = {}", quote_ident("host"), quote_literal(host)));
    }
    for predicate in &selection.tags {
        conditions.push(match predicate {
            TagPredicate::Equals(k, v) => format!("{} = {}", quote_ident(k), quote_literal(v)),
            TagPredicate::NotEquals(k, v) => {
                format!("{} != {}", quote_ident(k), quote_literal(v))
            }
        });
    }
    format!(
        "SELECT {} AS \"value\" FROM {} WHERE {} GROUP BY *",
        projection,
        quote_ident(&selection.measurement),
        conditions.join(" AND ")
    )
}

pub(crate) fn hosts_statement(range: &TimeRange) -> String {
    format!(
        "SHOW TAG VALUES WITH KEY = {} WHERE {}",
        quote_ident("host"),
        range_condition(range)
    )
}

fn column_index(series: &QuerySeries, name: &str) -> Result<usize, StoreError> {
    series
        .columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| {
            StoreError::Decode(format!("series {} has no {} column", series.name, name))
        })
}

fn decode_samples(
    selection: &Selection,
    series: Vec<QuerySeries>,
) -> Result<Vec<Sample>, StoreError> {
    let mut out = Vec::new();
    for s in series {
        let time_idx = column_index(&s, "time")?;
        let value_idx = column_index(&s, "value")?;
        // GROUP BY * reports tags the series lacks as empty strings.
        let mut tags: BTreeMap<String, String> = s
            .tags
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let host = tags.remove("host");
        for row in &s.values {
            let Some(time) = row.get(time_idx).and_then(Value::as_str) else {
                return Err(StoreError::Decode(format!("series {} row without time", s.name)));
            };
            let time = DateTime::parse_from_rfc3339(time)
                .map_err(|e| StoreError::Decode(format!("time {:?}: {}", time, e)))?
                .with_timezone(&Utc);
            let value = match row.get(value_idx) {
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(v) => FieldValue::Float(v),
                    None => continue,
                },
                Some(Value::String(text)) => FieldValue::Text(text.clone()),
                Some(Value::Bool(b)) => FieldValue::Float(if *b { 1.0 } else { 0.0 }),
                _ => continue,
            };
            out.push(Sample {
                time,
                measurement: s.name.clone(),
                field: selection.field.clone(),
                host: host.clone(),
                tags: tags.clone(),
                value,
            });
        }
    }
    Ok(out)
}

fn decode_tag_values(series: Vec<QuerySeries>) -> Result<BTreeSet<String>, StoreError> {
    let mut hosts = BTreeSet::new();
    for s in series {
        let value_idx = column_index(&s, "value")?;
        hosts.extend(
            s.values
                .iter()
                .filter_map(|row| row.get(value_idx).and_then(Value::as_str))
                .filter(|h| !h.is_empty())
                .map(String::from),
        );
    }
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> TimeRange {
        TimeRange {
            start: Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap(),
            stop: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn series(json: Value) -> Vec<QuerySeries> {
        serde_json::from_value::<StatementResult>(json).unwrap().series
    }

    #[test]
    fn literal_escapes_quotes_and_backslashes() {
        assert_eq!(quote_literal("vd-01"), "'vd-01'");
        assert_eq!(quote_literal("a' OR '1'='1"), "'a\\' OR \\'1\\'=\\'1'");
        assert_eq!(quote_literal("c:\\temp"), "'c:\\\\temp'");
        assert_eq!(quote_ident("we\"ird"), "\"we\\\"ird\"");
    }

    #[test]
    fn select_statement_scopes_host_and_tags() {
        let sel = Selection::new("net", "bytes_recv", range())
            .host(Some("vd-01"))
            .tag_ne("interface", "lo");
        assert_eq!(
            select_statement(&sel),
            "SELECT \"bytes_recv\" AS \"value\" FROM \"net\" \
             WHERE time >= '2025-03-01T11:00:00.000000000Z' AND time < '2025-03-01T12:00:00.000000000Z' \
             AND \"host\" = 'vd-01' AND \"interface\" != 'lo' GROUP BY *"
        );
    }

    #[test]
    fn select_statement_pushes_down_last_and_first() {
        let last = Selection::new("mem", "total", range()).pick(Pick::Last);
        assert!(
            select_statement(&last).starts_with("SELECT LAST(\"total\") AS \"value\" FROM \"mem\"")
        );
        let first = Selection::new("system_meta", "os_type", range()).pick(Pick::First);
        assert!(select_statement(&first).starts_with("SELECT FIRST(\"os_type\")"));
    }

    #[test]
    fn hostile_host_cannot_escape_the_literal() {
        let sel = Selection::new("mem", "used", range()).host(Some("x' OR host =~ /.*/ --"));
        let stmt = select_statement(&sel);
        assert!(stmt.contains("\"host\" = 'x\\' OR host =~ /.*/ --'"));
    }

    #[test]
    fn decodes_grouped_series_into_samples() {
        let sel = Selection::new("net", "bytes_recv", range());
        let samples = decode_samples(
            &sel,
            series(serde_json::json!({
                "statement_id": 0,
                "series": [
                    {
                        "name": "net",
                        "tags": {"host": "vd-01", "interface": "eth0", "path": ""},
                        "columns": ["time", "value"],
                        "values": [
                            ["2025-03-01T11:00:10Z", 1000],
                            ["2025-03-01T11:00:20Z", null],
                            ["2025-03-01T11:00:30Z", 1500.5]
                        ]
                    },
                    {
                        "name": "net",
                        "tags": {"host": "", "interface": "eth1"},
                        "columns": ["time", "value"],
                        "values": [["2025-03-01T11:00:10Z", 7]]
                    }
                ]
            })),
        )
        .unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].host.as_deref(), Some("vd-01"));
        assert_eq!(samples[0].tag("interface"), Some("eth0"));
        assert_eq!(samples[0].tag("path"), None);
        assert_eq!(samples[1].value, FieldValue::Float(1500.5));
        assert_eq!(samples[2].host, None);
    }

    #[test]
    fn decodes_text_fields() {
        let sel = Selection::new("system_meta", "os_type", range());
        let samples = decode_samples(
            &sel,
            series(serde_json::json!({
                "series": [{
                    "name": "system_meta",
                    "tags": {"host": "vd-01"},
                    "columns": ["time", "value"],
                    "values": [["2025-03-01T11:00:00Z", "Ubuntu 22.04"]]
                }]
            })),
        )
        .unwrap();
        assert_eq!(samples[0].value.as_text(), Some("Ubuntu 22.04"));
    }

    #[test]
    fn missing_value_column_is_a_decode_error() {
        let sel = Selection::new("mem", "used", range());
        let err = decode_samples(
            &sel,
            series(serde_json::json!({
                "series": [{"name": "mem", "columns": ["time"], "values": []}]
            })),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn decodes_host_tag_values_across_measurements() {
        let hosts = decode_tag_values(series(serde_json::json!({
            "series": [
                {"name": "cpu", "columns": ["key", "value"], "values": [["host", "vd-01"], ["host", "vd-02"]]},
                {"name": "mem", "columns": ["key", "value"], "values": [["host", "vd-02"], ["host", ""]]}
            ]
        })))
        .unwrap();
        assert_eq!(hosts.into_iter().collect::<Vec<_>>(), vec!["vd-01", "vd-02"]);
    }
}
