use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::ReplayClient;
use crate::config::TranslationErrorPolicy;
use crate::har::Entry;
use crate::translate::entry_to_request;

use super::queue::EntryQueue;
use super::types::{TestResult, WorkerOptions, WorkerStats};

enum Flow {
    Continue,
    Stop,
}

/// One concurrent executor with a private client and cookie jar.
pub struct Worker {
    id: usize,
    client: ReplayClient,
    entries: EntryQueue,
    results: mpsc::UnboundedSender<TestResult>,
    options: Arc<WorkerOptions>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        client: ReplayClient,
        entries: EntryQueue,
        results: mpsc::UnboundedSender<TestResult>,
        options: Arc<WorkerOptions>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            client,
            entries,
            results,
            options,
            cancel,
        }
    }

    /// Replays entries until the cancellation token fires.
    ///
    /// Cancellation is checked before every wait and races the wait itself, so
    /// an idle worker exits without needing another entry. An in-flight request
    /// is allowed to finish and its result is still emitted.
    #[tracing::instrument(name = "worker", skip(self), fields(worker = self.id))]
    pub async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats {
            worker: self.id,
            ..Default::default()
        };

        loop {
            let entry = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = self.entries.next() => match next {
                    Some(entry) => entry,
                    None => {
                        tracing::debug!("entry queue closed");
                        break;
                    }
                },
            };

            let iter = stats.processed;
            stats.processed += 1;
            let (result, flow) = self.replay(&entry, iter).await;
            if result.is_failure() {
                stats.failed += 1;
            }
            if self.results.send(result).is_err() {
                tracing::warn!("result stream closed, stopping");
                break;
            }
            if let Flow::Stop = flow {
                break;
            }
        }

        tracing::debug!(
            processed = stats.processed,
            failed = stats.failed,
            "worker stopped"
        );
        stats
    }

    async fn replay(&self, entry: &Entry, iter: u64) -> (TestResult, Flow) {
        let req = match entry_to_request(entry, self.options.ignore_har_cookies) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(
                    iter,
                    method = %entry.method(),
                    url = %entry.url(),
                    error = %e,
                    "entry translation failed"
                );
                let now = Utc::now();
                let result = self.result(
                    entry.url().to_string(),
                    entry.method().to_string(),
                    0,
                    now,
                    std::time::Duration::ZERO,
                    iter,
                    Some(format!("translation: {e}")),
                );
                let flow = match self.options.translation_error {
                    TranslationErrorPolicy::Record => Flow::Continue,
                    TranslationErrorPolicy::StopWorker => Flow::Stop,
                };
                return (result, flow);
            }
        };

        self.client.seed_cookies(&req.url, &req.cookies);

        let url = req.url.to_string();
        let method = req.method.to_string();
        let start = Utc::now();
        let clock = Instant::now();
        let outcome = self.client.execute(&req).await;

        let result = match outcome {
            Ok(exchange) => {
                let latency = exchange.elapsed;
                let status = exchange.status.as_u16();
                tracing::info!(
                    iter,
                    status,
                    latency_ms = latency.as_millis() as u64,
                    "[{},{}] {} {} {}ms",
                    self.id,
                    iter,
                    url,
                    status,
                    latency.as_millis()
                );
                self.result(url, method, status, start, latency, iter, None)
            }
            Err(e) => {
                let latency = clock.elapsed();
                tracing::error!(
                    iter,
                    method = %method,
                    url = %url,
                    kind = e.kind(),
                    error = %e,
                    "request failed"
                );
                let cause = format!("{}: {e}", e.kind());
                self.result(url, method, 0, start, latency, iter, Some(cause))
            }
        };
        (result, Flow::Continue)
    }

    fn result(
        &self,
        url: String,
        method: String,
        status: u16,
        start: chrono::DateTime<Utc>,
        latency: std::time::Duration,
        iter: u64,
        error: Option<String>,
    ) -> TestResult {
        TestResult {
            url,
            status,
            start_time: start,
            end_time: TestResult::end_of(start, latency),
            latency_ms: latency.as_millis() as u64,
            method,
            har_file: self.options.har_file.clone(),
            worker: self.id,
            iteration: iter,
            error,
        }
    }
}
