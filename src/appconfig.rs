//! YAML configuration: `base`, `postgres` and `kafka` sections.
//!
//! The kafka consumer/producer maps are opaque and handed to the bus client
//! as-is; only the handful of keys the engine depends on are checked here.
//! `POSTGRES_*` environment variables override their YAML equivalents after
//! parsing.

use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;

/// Consumer-config keys the engine relies on at runtime.
const REQUIRED_CONSUMER_KEYS: &[&str] = &[
    "group.id",
    "client.id",
    "bootstrap.servers",
    "auto.offset.reset",
    "max.poll.records",
    "session.timeout.ms",
];

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub base: BaseConfig,
    pub postgres: PostgresConfig,
    pub kafka: KafkaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseConfig {
    /// Seconds between stats log lines.
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,

    /// Bus consumer instances. The engine runs a single consumer; the key is
    /// recognized for compatibility and validated to 1.
    #[serde(default = "default_consumer_threads")]
    pub consumer_threads: u32,

    /// Minutes without a collector message before the stats loop warns.
    #[serde(default = "default_heartbeat_max_age")]
    pub heartbeat_max_age: u64,

    #[serde(default = "default_writer_max_threads")]
    pub writer_max_threads_per_type: usize,

    /// Consecutive high-watermark observations before scale-up/rebalance.
    #[serde(default = "default_writer_allowed_over")]
    pub writer_allowed_over_queue_times: u32,

    #[serde(default = "default_scale_back_secs")]
    pub writer_seconds_thread_scale_back: u64,

    #[serde(default = "default_rebalance_secs")]
    pub writer_rebalance_seconds: u64,

    #[serde(default = "default_writer_queue_size")]
    pub writer_queue_size: usize,

    #[serde(default = "default_consumer_queue_size")]
    pub consumer_queue_size: usize,

    /// Upper bound on any writer-pool drain before the engine gives up and
    /// shuts down.
    #[serde(default = "default_drain_deadline_secs")]
    pub writer_drain_deadline_seconds: u64,

    /// Age at which a base-attribute fingerprint is forgotten.
    #[serde(default = "default_attr_dedup_ttl")]
    pub attr_dedup_ttl_millis: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    /// `host` or `host:port`.
    pub host: String,
    pub db_name: String,
    pub username: String,
    pub password: String,

    #[serde(default)]
    pub ssl_enable: bool,
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,

    /// Max items a writer folds into one bulk statement.
    #[serde(default = "default_batch_records")]
    pub batch_records: usize,
    /// Max time a writer waits to fill a batch.
    #[serde(default = "default_batch_time_millis")]
    pub batch_time_millis: u64,
    /// Retries per statement on transient DB failures.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    /// Opaque map passed to the bus client consumer.
    pub consumer_config: BTreeMap<String, String>,
    /// Opaque map passed to the bus client producer.
    pub producer_config: BTreeMap<String, String>,

    #[serde(default = "default_subscribe_delay_millis")]
    pub topic_subscribe_delay_millis: u64,

    pub subscription_timeout_seconds: u64,

    /// Ordered topic patterns; inventory topics must precede NLRI topics.
    pub subscribe_topic_patterns: Vec<String>,
}

fn default_stats_interval() -> u64 {
    300
}
fn default_consumer_threads() -> u32 {
    1
}
fn default_heartbeat_max_age() -> u64 {
    11
}
fn default_writer_max_threads() -> usize {
    3
}
fn default_writer_allowed_over() -> u32 {
    2
}
fn default_scale_back_secs() -> u64 {
    1200
}
fn default_rebalance_secs() -> u64 {
    1800
}
fn default_writer_queue_size() -> usize {
    20_000
}
fn default_consumer_queue_size() -> usize {
    10_000
}
fn default_drain_deadline_secs() -> u64 {
    120
}
fn default_attr_dedup_ttl() -> i64 {
    1_200_000
}
fn default_ssl_mode() -> String {
    "prefer".to_string()
}
fn default_batch_records() -> usize {
    3000
}
fn default_batch_time_millis() -> u64 {
    300
}
fn default_retries() -> u32 {
    10
}
fn default_subscribe_delay_millis() -> u64 {
    10_000
}

impl PostgresConfig {
    /// Split `host[:port]`, defaulting to 5432.
    pub fn host_port(&self) -> AppResult<(String, u16)> {
        match self.host.split_once(':') {
            None => Ok((self.host.clone(), 5432)),
            Some((h, p)) => {
                let port: u16 = p.parse().map_err(|_| {
                    AppError::InvalidConfig(format!("postgres.host: invalid port '{p}'"))
                })?;
                Ok((h.to_string(), port))
            }
        }
    }
}

impl AppConfig {
    pub fn load(path: &str) -> AppResult<Self> {
        let raw = fs::read_to_string(path)?; // AppError::ConfigIo
        let mut cfg: Self = serde_yaml::from_str(&raw)?; // AppError::ConfigYaml
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// `POSTGRES_*` environment variables beat the YAML values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("POSTGRES_HOST") {
            self.postgres.host = v;
        }
        if let Ok(v) = env::var("POSTGRES_DB") {
            self.postgres.db_name = v;
        }
        if let Ok(v) = env::var("POSTGRES_USER") {
            self.postgres.username = v;
        }
        if let Ok(v) = env::var("POSTGRES_PASSWORD") {
            self.postgres.password = v;
        }
        if let Ok(v) = env::var("POSTGRES_SSL_ENABLE") {
            self.postgres.ssl_enable = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = env::var("POSTGRES_SSL_MODE") {
            self.postgres.ssl_mode = v;
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        // ---- base
        let base = &self.base;
        if base.consumer_threads != 1 {
            return Err(AppError::InvalidConfig(
                "base.consumer_threads: only 1 is supported".into(),
            ));
        }
        if base.writer_max_threads_per_type == 0 {
            return Err(AppError::InvalidConfig(
                "base.writer_max_threads_per_type must be >= 1".into(),
            ));
        }
        if base.writer_queue_size == 0 {
            return Err(AppError::InvalidConfig(
                "base.writer_queue_size must be > 0".into(),
            ));
        }
        if base.consumer_queue_size == 0 {
            return Err(AppError::InvalidConfig(
                "base.consumer_queue_size must be > 0".into(),
            ));
        }
        if base.writer_drain_deadline_seconds == 0 {
            return Err(AppError::InvalidConfig(
                "base.writer_drain_deadline_seconds must be > 0".into(),
            ));
        }
        if base.attr_dedup_ttl_millis <= 0 {
            return Err(AppError::InvalidConfig(
                "base.attr_dedup_ttl_millis must be > 0".into(),
            ));
        }

        // ---- postgres
        let pg = &self.postgres;
        if pg.host.trim().is_empty() {
            return Err(AppError::MissingConfig("postgres.host"));
        }
        if pg.db_name.trim().is_empty() {
            return Err(AppError::MissingConfig("postgres.db_name"));
        }
        if pg.username.trim().is_empty() {
            return Err(AppError::MissingConfig("postgres.username"));
        }
        pg.host_port()?;
        if !matches!(
            pg.ssl_mode.as_str(),
            "disable" | "allow" | "prefer" | "require" | "verify-ca" | "verify-full"
        ) {
            return Err(AppError::InvalidConfig(format!(
                "postgres.ssl_mode: unknown mode '{}'",
                pg.ssl_mode
            )));
        }
        if pg.batch_records == 0 {
            return Err(AppError::InvalidConfig(
                "postgres.batch_records must be > 0".into(),
            ));
        }
        if pg.batch_time_millis == 0 {
            return Err(AppError::InvalidConfig(
                "postgres.batch_time_millis must be > 0".into(),
            ));
        }

        // ---- kafka
        let kafka = &self.kafka;
        for key in REQUIRED_CONSUMER_KEYS {
            if !kafka.consumer_config.contains_key(*key) {
                return Err(AppError::InvalidConfig(format!(
                    "kafka.consumer_config: missing required key '{key}'"
                )));
            }
        }
        if !kafka.producer_config.contains_key("bootstrap.servers") {
            return Err(AppError::InvalidConfig(
                "kafka.producer_config: missing required key 'bootstrap.servers'".into(),
            ));
        }
        if kafka.subscribe_topic_patterns.is_empty() {
            return Err(AppError::InvalidConfig(
                "kafka.subscribe_topic_patterns must list at least one pattern".into(),
            ));
        }
        if kafka.subscription_timeout_seconds == 0 {
            return Err(AppError::InvalidConfig(
                "kafka.subscription_timeout_seconds must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// `max.poll.records` as a batch cap for the poll loop.
    pub fn max_poll_records(&self) -> usize {
        self.kafka
            .consumer_config
            .get("max.poll.records")
            .and_then(|v| v.parse().ok())
            .unwrap_or(500)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_YAML: &str = r#"
base:
  stats_interval: 60
  writer_max_threads_per_type: 2
  writer_queue_size: 100
  consumer_queue_size: 50
postgres:
  host: "db.example.net:5433"
  db_name: "bgpdata"
  username: "bgp"
  password: "secret"
  batch_records: 10
  batch_time_millis: 50
kafka:
  consumer_config:
    group.id: "agg"
    client.id: "agg-1"
    bootstrap.servers: "localhost:9092"
    auto.offset.reset: "earliest"
    max.poll.records: "200"
    session.timeout.ms: "15000"
  producer_config:
    bootstrap.servers: "localhost:9092"
  topic_subscribe_delay_millis: 100
  subscription_timeout_seconds: 60
  subscribe_topic_patterns:
    - "^bgpdata\\.parsed\\.(collector|router|peer)$"
    - "^bgpdata\\.parsed\\..*"
"#;

    pub(crate) fn sample_config() -> AppConfig {
        let mut cfg: AppConfig = serde_yaml::from_str(SAMPLE_YAML).expect("sample yaml");
        cfg.validate().expect("sample config valid");
        cfg
    }

    #[test]
    fn parses_sample_and_defaults() {
        let cfg = sample_config();
        assert_eq!(cfg.base.stats_interval, 60);
        // unspecified keys fall back to defaults
        assert_eq!(cfg.base.writer_allowed_over_queue_times, 2);
        assert_eq!(cfg.base.attr_dedup_ttl_millis, 1_200_000);
        assert_eq!(cfg.postgres.retries, 10);
        assert_eq!(cfg.max_poll_records(), 200);
    }

    #[test]
    fn splits_host_and_port() {
        let cfg = sample_config();
        let (host, port) = cfg.postgres.host_port().unwrap();
        assert_eq!(host, "db.example.net");
        assert_eq!(port, 5433);
    }

    #[test]
    fn rejects_missing_consumer_keys() {
        let mut cfg = sample_config();
        cfg.kafka.consumer_config.remove("group.id");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("group.id"));
    }

    #[test]
    fn rejects_unknown_ssl_mode() {
        let mut cfg = sample_config();
        cfg.postgres.ssl_mode = "sometimes".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_beat_yaml() {
        let mut cfg = sample_config();
        // SAFETY: test-local env mutation
        unsafe {
            env::set_var("POSTGRES_HOST", "override-host");
            env::set_var("POSTGRES_SSL_ENABLE", "true");
        }
        cfg.apply_env_overrides();
        unsafe {
            env::remove_var("POSTGRES_HOST");
            env::remove_var("POSTGRES_SSL_ENABLE");
        }
        assert_eq!(cfg.postgres.host, "override-host");
        assert!(cfg.postgres.ssl_enable);
    }
}
