// Snapshot aggregation tests against the in-memory store

mod common;

use common::*;
use hostwatch::aggregation::{RamUsedFallback, SnapshotAggregator, SnapshotWindows};
use hostwatch::config::window_days;
use hostwatch::models::{HostStatus, InstanceRow, Sample};
use hostwatch::store::MemoryStore;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const DAY: i64 = 24 * 3600;

fn aggregator(samples: Vec<Sample>) -> SnapshotAggregator {
    aggregator_with(samples, RamUsedFallback::default())
}

fn aggregator_with(samples: Vec<Sample>, fallback: RamUsedFallback) -> SnapshotAggregator {
    SnapshotAggregator::new(
        Arc::new(MemoryStore::new(samples)),
        SnapshotWindows::default(),
        fallback,
    )
}

fn blank_row(host: &str) -> InstanceRow {
    InstanceRow {
        id: host.into(),
        name: host.into(),
        status: HostStatus::Offline,
        os_type: "unknown".into(),
        ip_address: "unknown".into(),
        cpu_cores: 0,
        cpu_usage: 0.0,
        ram_total_mb: 0.0,
        ram_used_mb: 0.0,
        storage_total_gb: 0.0,
        storage_used_gb: 0.0,
        network_in_mbps: 0.0,
        network_out_mbps: 0.0,
        created_at: None,
    }
}

#[tokio::test]
async fn test_snapshot_live_host() {
    let snapshot = aggregator(vec![
        cpu_idle("web-01", ago(30), 75.0),
        mem("web-01", ago(30), "total", 8192.0 * MIB),
        mem("web-01", ago(30), "used", 4096.0 * MIB),
    ]);
    let rows = snapshot.instances(now()).await.unwrap();
    assert_eq!(
        rows,
        vec![InstanceRow {
            status: HostStatus::Online,
            cpu_usage: 25.0,
            ram_total_mb: 8192.0,
            ram_used_mb: 4096.0,
            ..blank_row("web-01")
        }]
    );
}

#[tokio::test]
async fn test_snapshot_metadata_and_creation_time() {
    let snapshot = aggregator(vec![
        meta("web-01", ago(2 * DAY), "os_type", "debian"),
        meta("web-01", ago(100), "os_type", "ubuntu"),
        meta("web-01", ago(100), "ip_address", "10.0.0.5"),
        n_cpus("web-01", ago(100), 4.0),
        disk("web-01", ago(100), "/", "total", 100.0 * GIB),
        disk("web-01", ago(50), "/boot", "total", GIB),
        disk("web-01", ago(30), "/", "used", 40.0 * GIB),
    ]);
    let rows = snapshot.instances(now()).await.unwrap();
    assert_eq!(
        rows,
        vec![InstanceRow {
            status: HostStatus::Online,
            os_type: "ubuntu".into(),
            ip_address: "10.0.0.5".into(),
            cpu_cores: 4,
            storage_total_gb: 100.0,
            storage_used_gb: 40.0,
            created_at: Some(ago(2 * DAY)),
            ..blank_row("web-01")
        }]
    );
}

#[tokio::test]
async fn test_snapshot_stale_gauges_mark_host_offline() {
    let snapshot = aggregator(vec![
        cpu_idle("web-01", ago(600), 10.0),
        mem("web-01", ago(3600), "total", 8192.0 * MIB),
        mem("web-01", ago(600), "used", 1024.0 * MIB),
    ]);
    let rows = snapshot.instances(now()).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.status, HostStatus::Offline);
    assert_eq!(row.cpu_usage, 0.0);
    assert_eq!(row.ram_total_mb, 8192.0);
    // No recent mem.used: half of the total is reported.
    assert_eq!(row.ram_used_mb, 4096.0);
}

#[tokio::test]
async fn test_snapshot_zero_ram_fallback() {
    let snapshot = aggregator_with(
        vec![mem("web-01", ago(3600), "total", 8192.0 * MIB)],
        RamUsedFallback::Zero,
    );
    let rows = snapshot.instances(now()).await.unwrap();
    assert_eq!(rows[0].ram_total_mb, 8192.0);
    assert_eq!(rows[0].ram_used_mb, 0.0);
}

#[tokio::test]
async fn test_snapshot_network_rate_makes_host_online() {
    let snapshot = aggregator(vec![
        net("web-01", ago(60), "eth0", "bytes_recv", 0.0),
        net("web-01", ago(50), "eth0", "bytes_recv", 5.0 * MIB),
        net("web-01", ago(60), "lo", "bytes_recv", 0.0),
        net("web-01", ago(50), "lo", "bytes_recv", 500.0 * MIB),
        net("db-01", ago(50), "eth0", "bytes_recv", 5.0 * MIB),
        net("cache-01", ago(200), "eth0", "bytes_sent", 0.0),
        net("cache-01", ago(190), "eth0", "bytes_sent", MIB),
    ]);
    let rows = snapshot.instances(now()).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["cache-01", "db-01", "web-01"]);

    // Outside the network window.
    assert_eq!(rows[0].status, HostStatus::Offline);
    assert_eq!(rows[0].network_out_mbps, 0.0);
    // A single counter sample has no rate.
    assert_eq!(rows[1].status, HostStatus::Offline);
    assert_eq!(rows[1].network_in_mbps, 0.0);

    assert_eq!(rows[2].status, HostStatus::Online);
    assert_eq!(rows[2].network_in_mbps, 0.5);
}

#[tokio::test]
async fn test_snapshot_discovery_window_and_hostless_samples() {
    let snapshot = aggregator(vec![
        meta("old-01", ago(31 * DAY), "os_type", "linux"),
        meta("web-01", ago(10 * DAY), "os_type", "linux"),
        cpu_idle("web-01", ago(20), 50.0).without_host(),
        mem("web-01", ago(20), "used", MIB).without_host(),
    ]);
    let rows = snapshot.instances(now()).await.unwrap();
    assert_eq!(
        rows,
        vec![InstanceRow {
            os_type: "linux".into(),
            created_at: Some(ago(10 * DAY)),
            ..blank_row("web-01")
        }]
    );
}

#[tokio::test]
async fn test_snapshot_ids_unique_and_sorted() {
    let mut samples = Vec::new();
    for host in ["web-02", "web-01", "db-01"] {
        for i in 0..5 {
            samples.push(cpu_idle(host, ago(20 + i * 10), 50.0));
            samples.push(meta(host, ago(DAY + i), "os_type", "linux"));
        }
    }
    let rows = aggregator(samples).instances(now()).await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["db-01", "web-01", "web-02"]);
    assert!(rows.iter().all(|r| r.id == r.name));
    assert!(rows.iter().all(|r| r.status == HostStatus::Online));
}

#[tokio::test]
async fn test_snapshot_single_instance_lookup() {
    let snapshot = aggregator(vec![
        cpu_idle("web-01", ago(30), 60.0),
        cpu_idle("db-01", ago(30), 20.0),
    ]);
    let row = snapshot.instance("web-01", now()).await.unwrap().unwrap();
    assert_eq!(row.id, "web-01");
    assert_eq!(row.cpu_usage, 40.0);

    assert!(snapshot.instance("nope", now()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_snapshot_store_failure_propagates() {
    let snapshot = SnapshotAggregator::new(
        Arc::new(FailingStore("influx down")),
        SnapshotWindows::default(),
        RamUsedFallback::default(),
    );
    let err = snapshot.instances(now()).await.unwrap_err();
    assert_eq!(err.to_string(), "influx down");
}

#[tokio::test]
async fn test_snapshot_oversized_discovery_does_not_overflow() {
    let snapshot = SnapshotAggregator::new(
        Arc::new(MemoryStore::new(vec![cpu_idle("web-01", ago(30), 75.0)])),
        SnapshotWindows {
            discovery: window_days(u32::MAX),
            ..SnapshotWindows::default()
        },
        RamUsedFallback::default(),
    );
    let rows = snapshot.instances(now()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cpu_usage, 25.0);
}
