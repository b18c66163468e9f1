use chrono::TimeDelta;
use serde::Deserialize;
use std::path::Path;

use crate::aggregation::RamUsedFallback;

/// Upper bound for every look-back or window setting: ten years.
pub const MAX_WINDOW_DAYS: u32 = 3650;
pub const MAX_WINDOW_SECS: u64 = MAX_WINDOW_DAYS as u64 * 24 * 3600;

/// Seconds as a `TimeDelta`, saturating at `TimeDelta::MAX` for out-of-range input.
pub fn window_secs(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Days as a `TimeDelta`, saturating like [`window_secs`].
pub fn window_days(days: u32) -> TimeDelta {
    TimeDelta::try_days(i64::from(days)).unwrap_or(TimeDelta::MAX)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub influx: InfluxConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    pub url: String,
    pub database: String,
    /// Inline token; prefer `token_env` outside local setups.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_token_env() -> String {
    "INFLUX_TOKEN".into()
}

fn default_query_timeout_secs() -> u64 {
    10
}

impl InfluxConfig {
    /// Inline token wins over the environment variable; empty values count as unset.
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(&self.token_env).ok().filter(|t| !t.is_empty()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,
    #[serde(default = "default_bucket_secs")]
    pub bucket_secs: u64,
}

fn default_lookback_secs() -> u64 {
    3600
}

fn default_bucket_secs() -> u64 {
    60
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            lookback_secs: default_lookback_secs(),
            bucket_secs: default_bucket_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    /// A host that reported once within this many days is listed, even when offline.
    #[serde(default = "default_discovery_days")]
    pub discovery_days: u32,
    #[serde(default = "default_gauge_window_secs")]
    pub gauge_window_secs: u64,
    #[serde(default = "default_network_window_secs")]
    pub network_window_secs: u64,
    #[serde(default)]
    pub ram_used_fallback: RamUsedFallback,
}

fn default_discovery_days() -> u32 {
    30
}

fn default_gauge_window_secs() -> u64 {
    300
}

fn default_network_window_secs() -> u64 {
    120
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            discovery_days: default_discovery_days(),
            gauge_window_secs: default_gauge_window_secs(),
            network_window_secs: default_network_window_secs(),
            ram_used_fallback: RamUsedFallback::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Bearer tokens accepted on /instances routes. Empty disables the check.
    #[serde(default)]
    pub api_tokens: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log API stats (requests served, store failures) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.influx.url.is_empty(), "influx.url must be non-empty");
        anyhow::ensure!(
            !self.influx.database.is_empty(),
            "influx.database must be non-empty"
        );
        anyhow::ensure!(
            self.influx.query_timeout_secs > 0,
            "influx.query_timeout_secs must be > 0, got {}",
            self.influx.query_timeout_secs
        );
        anyhow::ensure!(
            self.history.bucket_secs > 0,
            "history.bucket_secs must be > 0, got {}",
            self.history.bucket_secs
        );
        anyhow::ensure!(
            self.history.lookback_secs <= MAX_WINDOW_SECS,
            "history.lookback_secs must be <= {}, got {}",
            MAX_WINDOW_SECS,
            self.history.lookback_secs
        );
        anyhow::ensure!(
            self.history.lookback_secs >= self.history.bucket_secs,
            "history.lookback_secs must be >= history.bucket_secs, got {} < {}",
            self.history.lookback_secs,
            self.history.bucket_secs
        );
        anyhow::ensure!(
            (1..=MAX_WINDOW_DAYS).contains(&self.snapshot.discovery_days),
            "snapshot.discovery_days must be between 1 and {}, got {}",
            MAX_WINDOW_DAYS,
            self.snapshot.discovery_days
        );
        anyhow::ensure!(
            (1..=MAX_WINDOW_SECS).contains(&self.snapshot.gauge_window_secs),
            "snapshot.gauge_window_secs must be between 1 and {}, got {}",
            MAX_WINDOW_SECS,
            self.snapshot.gauge_window_secs
        );
        anyhow::ensure!(
            (1..=MAX_WINDOW_SECS).contains(&self.snapshot.network_window_secs),
            "snapshot.network_window_secs must be between 1 and {}, got {}",
            MAX_WINDOW_SECS,
            self.snapshot.network_window_secs
        );
        if let RamUsedFallback::FractionOfTotal(f) = self.snapshot.ram_used_fallback {
            anyhow::ensure!(
                (0.0..=1.0).contains(&f),
                "snapshot.ram_used_fallback fraction_of_total must be within [0, 1], got {}",
                f
            );
        }
        anyhow::ensure!(
            self.auth.api_tokens.iter().all(|t| !t.is_empty()),
            "auth.api_tokens must not contain empty tokens"
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}
