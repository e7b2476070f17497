use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ProxyConfig;
use crate::error::LoadError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub load: LoadConfig,

    #[serde(default)]
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "harload_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// What a worker does with an entry that cannot be turned into a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationErrorPolicy {
    /// Emit a status-0 result and keep replaying.
    #[default]
    Record,
    /// Emit a status-0 result, then stop this worker.
    StopWorker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_duration", with = "humantime_serde")]
    pub duration: Duration,

    /// Bounded wait for in-flight requests and sink flush after the deadline.
    #[serde(default = "default_grace", with = "humantime_serde")]
    pub grace: Duration,

    #[serde(default)]
    pub ignore_har_cookies: bool,

    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Cycle through the archive until the deadline instead of a single pass.
    #[serde(default)]
    pub repeat: bool,

    #[serde(default)]
    pub translation_error: TranslationErrorPolicy,
}

fn default_workers() -> usize {
    10
}

fn default_duration() -> Duration {
    Duration::from_secs(60)
}

fn default_grace() -> Duration {
    Duration::from_secs(2)
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            duration: default_duration(),
            grace: default_grace(),
            ignore_har_cookies: false,
            insecure_skip_verify: false,
            repeat: false,
            translation_error: TranslationErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// InfluxDB endpoint, e.g. `http://localhost:8086/hargo`.
    #[serde(default)]
    pub influx_url: Option<String>,

    /// Overrides the database taken from the influx URL path.
    #[serde(default)]
    pub influx_database: Option<String>,

    #[serde(default = "default_influx_batch_size")]
    pub influx_batch_size: usize,

    #[serde(default = "default_influx_timeout", with = "humantime_serde")]
    pub influx_timeout: Duration,

    /// Append every result as one JSON line to this file.
    #[serde(default)]
    pub jsonl_path: Option<String>,

    #[serde(default = "default_flush_interval", with = "humantime_serde")]
    pub flush_interval: Duration,
}

fn default_influx_batch_size() -> usize {
    100
}

fn default_influx_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_flush_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            influx_url: None,
            influx_database: None,
            influx_batch_size: default_influx_batch_size(),
            influx_timeout: default_influx_timeout(),
            jsonl_path: None,
            flush_interval: default_flush_interval(),
        }
    }
}

/// Validated parameters of one load test run.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    /// Capture identifier carried into every result.
    pub har_file: String,
    pub workers: usize,
    pub duration: Duration,
    pub ignore_har_cookies: bool,
    pub insecure_skip_verify: bool,
    pub translation_error: TranslationErrorPolicy,
    pub proxy: ProxyConfig,
}

impl LoadSettings {
    pub fn from_config(
        har_file: impl Into<String>,
        cfg: &LoadConfig,
        proxy: ProxyConfig,
    ) -> Result<Self, LoadError> {
        if cfg.workers == 0 {
            return Err(LoadError::Config("workers must be at least 1".to_string()));
        }
        if cfg.duration.is_zero() {
            return Err(LoadError::Config("duration must be greater than 0".to_string()));
        }
        Ok(Self {
            har_file: har_file.into(),
            workers: cfg.workers,
            duration: cfg.duration,
            ignore_har_cookies: cfg.ignore_har_cookies,
            insecure_skip_verify: cfg.insecure_skip_verify,
            translation_error: cfg.translation_error,
            proxy,
        })
    }
}
