//! The concurrent replay engine: a bounded entry queue feeding a fixed pool of
//! workers, a result stream drained into a sink, and a single deadline that
//! stops everything.

mod deadline;
mod queue;
mod run;
mod types;
mod worker;

pub use deadline::spawn_deadline;
pub use queue::EntryQueue;
pub use run::{LoadTest, RunOutcome, RunReport};
pub use types::{TestResult, WorkerOptions, WorkerStats};
pub use worker::Worker;
