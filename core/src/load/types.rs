use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{LoadSettings, TranslationErrorPolicy};

/// Measured outcome of replaying one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub url: String,
    /// 0 when no response was received.
    pub status: u16,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub latency_ms: u64,
    pub method: String,
    pub har_file: String,
    pub worker: usize,
    pub iteration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    pub fn is_failure(&self) -> bool {
        self.status == 0
    }

    pub(crate) fn end_of(start: DateTime<Utc>, elapsed: Duration) -> DateTime<Utc> {
        chrono::Duration::from_std(elapsed)
            .ok()
            .and_then(|d| start.checked_add_signed(d))
            .unwrap_or(start)
    }
}

/// Per-run knobs shared by all workers.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub har_file: String,
    pub ignore_har_cookies: bool,
    pub translation_error: TranslationErrorPolicy,
}

impl From<&LoadSettings> for WorkerOptions {
    fn from(s: &LoadSettings) -> Self {
        Self {
            har_file: s.har_file.clone(),
            ignore_har_cookies: s.ignore_har_cookies,
            translation_error: s.translation_error,
        }
    }
}

/// What a worker did before it exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker: usize,
    /// Entries taken from the queue; each produced exactly one result.
    pub processed: u64,
    pub failed: u64,
}
