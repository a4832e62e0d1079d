//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use event_bus::{BusConfig, RetryPolicy};
use saga::{PartitionKey, PipelineOptions};

/// Process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `ORDER_INTERVAL_MS`: demo order cadence, `0` disables (default: `5000`)
/// - `REPORT_INTERVAL_SECS`: analytics report period, `0` disables (default: `30`)
/// - `REPORT_EVERY`: extra report every N orders + notifications (default: `20`)
/// - `BUS_PARTITIONS`: partitions per topic (default: `3`)
/// - `BUS_MAX_RETRIES`: redeliveries of a failed message (default: `10`)
/// - `BUS_INITIAL_BACKOFF_MS`: first redelivery delay (default: `300`)
/// - `KEY_BY_ORDER`: partition by order id instead of event id (default: `false`)
/// - `SIMULATE_LATENCY`: sleep inside each stage (default: `true`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub order_interval_ms: u64,
    pub report_interval_secs: u64,
    pub report_every: u64,
    pub bus_partitions: u32,
    pub bus_max_retries: u32,
    pub bus_initial_backoff_ms: u64,
    pub key_by_order: bool,
    pub simulate_latency: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key lookup. Unparseable values fall
    /// back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            order_interval_ms: parse_var(&lookup, "ORDER_INTERVAL_MS")
                .unwrap_or(defaults.order_interval_ms),
            report_interval_secs: parse_var(&lookup, "REPORT_INTERVAL_SECS")
                .unwrap_or(defaults.report_interval_secs),
            report_every: parse_var(&lookup, "REPORT_EVERY").unwrap_or(defaults.report_every),
            bus_partitions: parse_var(&lookup, "BUS_PARTITIONS").unwrap_or(defaults.bus_partitions),
            bus_max_retries: parse_var(&lookup, "BUS_MAX_RETRIES")
                .unwrap_or(defaults.bus_max_retries),
            bus_initial_backoff_ms: parse_var(&lookup, "BUS_INITIAL_BACKOFF_MS")
                .unwrap_or(defaults.bus_initial_backoff_ms),
            key_by_order: lookup("KEY_BY_ORDER")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.key_by_order),
            simulate_latency: lookup("SIMULATE_LATENCY")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.simulate_latency),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn bus_config(&self) -> BusConfig {
        let retry = RetryPolicy {
            max_retries: self.bus_max_retries,
            initial_backoff: Duration::from_millis(self.bus_initial_backoff_ms),
            ..RetryPolicy::default()
        };
        BusConfig::default()
            .with_partitions(self.bus_partitions)
            .with_retry(retry)
    }

    pub fn partition_key(&self) -> PartitionKey {
        if self.key_by_order {
            PartitionKey::OrderId
        } else {
            PartitionKey::EventId
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            partition_key: self.partition_key(),
            simulate_latency: self.simulate_latency,
            ledger: None,
        }
    }

    /// `None` when the demo generator is disabled.
    pub fn order_interval(&self) -> Option<Duration> {
        non_zero(Duration::from_millis(self.order_interval_ms))
    }

    /// `None` when periodic reports are disabled.
    pub fn report_interval(&self) -> Option<Duration> {
        non_zero(Duration::from_secs(self.report_interval_secs))
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            order_interval_ms: 5000,
            report_interval_secs: 30,
            report_every: analytics::DEFAULT_REPORT_EVERY,
            bus_partitions: 3,
            bus_max_retries: 10,
            bus_initial_backoff_ms: 300,
            key_by_order: false,
            simulate_latency: true,
        }
    }
}
