//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `harload_core::api` instead of reaching into internal modules.

pub use crate::client::{ProxyConfig, ReplayClient, TransportSettings};
pub use crate::config::{
    load_default, AppConfig, LoadConfig, LoadSettings, LoggingConfig, SinkConfig,
    TranslationErrorPolicy,
};
pub use crate::load::{
    spawn_deadline, EntryQueue, LoadTest, RunOutcome, RunReport, TestResult, WorkerOptions,
    WorkerStats,
};
pub use crate::error::{CliError, HarError, LoadError, TranslateError};
pub use crate::har::{load_entries, Entry, EntrySupply, HarSupply, IterSupply};
pub use crate::sink::{spawn_forwarder, NullSink, ResultSink};
pub use crate::translate::{entry_to_request, ReplayRequest};
