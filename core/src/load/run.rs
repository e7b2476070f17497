use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{ReplayClient, TransportSettings};
use crate::config::LoadSettings;
use crate::error::LoadError;
use crate::har::EntrySupply;
use crate::sink::{spawn_forwarder, ResultSink};

use super::deadline::spawn_deadline;
use super::queue::EntryQueue;
use super::types::{TestResult, WorkerOptions, WorkerStats};
use super::worker::Worker;

/// Wires supply, workers, sink forwarder and deadline together for one run.
pub struct LoadTest {
    settings: LoadSettings,
    transport: TransportSettings,
    flush_interval: Duration,
    cancel: CancellationToken,
}

impl LoadTest {
    pub fn new(settings: LoadSettings) -> Self {
        Self {
            settings,
            transport: TransportSettings::default(),
            flush_interval: Duration::from_secs(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_transport(mut self, transport: TransportSettings) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// The run's cancellation signal. Cancelling it ends the run early, the
    /// same way the deadline does.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Starts everything and returns once the cancellation signal fires.
    ///
    /// Workers still finishing an in-flight request are not awaited here; see
    /// [`RunOutcome::join`].
    #[tracing::instrument(
        name = "load_test",
        skip_all,
        fields(har_file = %self.settings.har_file, workers = self.settings.workers)
    )]
    pub async fn run(
        self,
        supply: Box<dyn EntrySupply>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<RunOutcome, LoadError> {
        let LoadTest {
            settings,
            transport,
            flush_interval,
            cancel,
        } = self;

        if settings.workers == 0 {
            return Err(LoadError::Config("workers must be at least 1".to_string()));
        }

        tracing::info!(
            "Starting load test with {} workers. Duration {:?}.",
            settings.workers,
            settings.duration
        );

        // Build every client up front so a bad TLS/proxy setup fails before
        // anything is started.
        let clients = (0..settings.workers)
            .map(|worker| {
                ReplayClient::new(&transport, &settings.proxy, settings.insecure_skip_verify)
                    .map_err(|source| LoadError::ClientBuild { worker, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (entry_tx, queue) = EntryQueue::bounded(settings.workers);
        let (result_tx, result_rx) = mpsc::unbounded_channel::<TestResult>();
        let started = Instant::now();

        tracing::debug!(supply = supply.name(), sink = sink.name(), "starting pipeline");
        let supply = tokio::spawn(supply.produce(entry_tx, cancel.clone()));
        let forwarder = spawn_forwarder(result_rx, sink, flush_interval);
        let deadline = spawn_deadline(settings.duration, cancel.clone());

        let options = Arc::new(WorkerOptions::from(&settings));
        let workers = clients
            .into_iter()
            .enumerate()
            .map(|(id, client)| {
                let worker = Worker::new(
                    id,
                    client,
                    queue.clone(),
                    result_tx.clone(),
                    options.clone(),
                    cancel.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect::<Vec<_>>();
        drop(result_tx);

        cancel.cancelled().await;
        let elapsed = started.elapsed();
        tracing::info!(
            elapsed_ms = elapsed.as_millis() as u64,
            "Timeout of {:.1}s elapsed. Terminating load test.",
            settings.duration.as_secs_f64()
        );

        Ok(RunOutcome {
            elapsed,
            duration: settings.duration,
            workers,
            supply,
            forwarder,
            deadline,
        })
    }
}

/// Handles left running when [`LoadTest::run`] returns.
pub struct RunOutcome {
    elapsed: Duration,
    duration: Duration,
    workers: Vec<JoinHandle<WorkerStats>>,
    supply: JoinHandle<u64>,
    forwarder: JoinHandle<u64>,
    deadline: JoinHandle<()>,
}

/// Post-run accounting gathered by [`RunOutcome::join`].
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub elapsed: Duration,
    pub workers: Vec<WorkerStats>,
    /// Workers still busy when the grace period ran out; they were aborted.
    pub unfinished_workers: usize,
    pub entries_supplied: Option<u64>,
    pub results_forwarded: Option<u64>,
}

impl RunReport {
    pub fn processed(&self) -> u64 {
        self.workers.iter().map(|w| w.processed).sum()
    }

    pub fn failed(&self) -> u64 {
        self.workers.iter().map(|w| w.failed).sum()
    }
}

impl RunOutcome {
    /// Wall time from start until the cancellation signal fired.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Configured run duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Human-readable end-of-run notice.
    pub fn notice(&self) -> String {
        format!(
            "Timeout of {:.1}s elapsed. Terminating load test.",
            self.duration.as_secs_f64()
        )
    }

    /// Waits up to `grace` for workers to finish their in-flight request, then
    /// up to `grace` again for the sink to drain. Anything still running
    /// afterwards is aborted.
    pub async fn join(self, grace: Duration) -> RunReport {
        let RunOutcome {
            elapsed,
            workers,
            supply,
            forwarder,
            deadline,
            ..
        } = self;
        deadline.abort();

        let mut report = RunReport {
            elapsed,
            ..Default::default()
        };

        let until = tokio::time::Instant::now() + grace;
        for mut handle in workers {
            match tokio::time::timeout_at(until, &mut handle).await {
                Ok(Ok(stats)) => report.workers.push(stats),
                Ok(Err(e)) => tracing::error!(error = %e, "worker task failed"),
                Err(_) => {
                    handle.abort();
                    report.unfinished_workers += 1;
                }
            }
        }
        if report.unfinished_workers > 0 {
            tracing::warn!(
                unfinished = report.unfinished_workers,
                "workers still in flight after grace period"
            );
        }

        report.entries_supplied = await_within(supply, until).await;
        report.results_forwarded =
            await_within(forwarder, tokio::time::Instant::now() + grace).await;
        report
    }
}

async fn await_within<T>(mut handle: JoinHandle<T>, until: tokio::time::Instant) -> Option<T> {
    match tokio::time::timeout_at(until, &mut handle).await {
        Ok(Ok(v)) => Some(v),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "background task failed");
            None
        }
        Err(_) => {
            handle.abort();
            None
        }
    }
}
