use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Top-level configuration for the trafficwatch agent.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Logging verbosity (debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    #[allow(dead_code)]
    pub log_level: String,

    /// MQTT feed connection configuration.
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// CSV report configuration.
    #[serde(default)]
    pub report: ReportConfig,

    /// Prometheus health metrics server configuration.
    #[serde(default)]
    pub health: HealthConfig,

    /// How often to log feed throughput counters. Default: 60s.
    #[serde(default = "default_feed_stats_interval", with = "humantime_serde")]
    pub feed_stats_interval: Duration,
}

/// MQTT feed connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname or IP.
    #[serde(default)]
    pub host: String,

    /// Broker port. Default: 1883.
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Topic carrying controller telemetry.
    #[serde(default)]
    pub topic: String,

    /// MQTT client identifier. Default: "trafficwatch".
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Broker username. Empty disables authentication.
    #[serde(default)]
    pub username: String,

    /// Broker password.
    #[serde(default)]
    pub password: String,

    /// MQTT keep-alive interval. Default: 30s.
    #[serde(default = "default_keep_alive", with = "humantime_serde")]
    pub keep_alive: Duration,

    /// Delay between reconnect attempts. Default: 3s.
    #[serde(default = "default_reconnect_delay", with = "humantime_serde")]
    pub reconnect_delay: Duration,
}

/// CSV report configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Enable periodic report writing. Default: false.
    #[serde(default)]
    pub enabled: bool,

    /// Report file path. Overwritten on each write.
    #[serde(default)]
    pub path: String,

    /// How often to rewrite the report. Default: 5m.
    #[serde(default = "default_report_interval", with = "humantime_serde")]
    pub interval: Duration,
}

/// Prometheus health metrics server configuration.
#[derive(Debug, Deserialize)]
pub struct HealthConfig {
    /// Listen address. Default: ":9090".
    #[serde(default = "default_health_addr")]
    pub addr: String,
}

// --- Default value functions ---

fn default_log_level() -> String {
    "info".to_string()
}

fn default_feed_stats_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "trafficwatch".to_string()
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(30)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_report_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_health_addr() -> String {
    ":9090".to_string()
}

// --- Default trait impls ---

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            mqtt: MqttConfig::default(),
            report: ReportConfig::default(),
            health: HealthConfig::default(),
            feed_stats_interval: default_feed_stats_interval(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_mqtt_port(),
            topic: String::new(),
            client_id: default_client_id(),
            username: String::new(),
            password: String::new(),
            keep_alive: default_keep_alive(),
            reconnect_delay: default_reconnect_delay(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: String::new(),
            interval: default_report_interval(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            addr: default_health_addr(),
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.mqtt.host.is_empty() {
            bail!("mqtt.host is required");
        }

        if self.mqtt.topic.is_empty() {
            bail!("mqtt.topic is required");
        }

        if self.mqtt.client_id.is_empty() {
            bail!("mqtt.client_id must not be empty");
        }

        if self.mqtt.keep_alive.is_zero() {
            bail!("mqtt.keep_alive must be positive");
        }

        if self.mqtt.reconnect_delay.is_zero() {
            bail!("mqtt.reconnect_delay must be positive");
        }

        if self.report.enabled {
            if self.report.path.is_empty() {
                bail!("report.path is required when report.enabled=true");
            }

            if self.report.interval.is_zero() {
                bail!("report.interval must be positive when report.enabled=true");
            }
        }

        if self.feed_stats_interval.is_zero() {
            bail!("feed_stats_interval must be positive");
        }

        Ok(())
    }
}
