use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::load::TestResult;

use super::ResultSink;

/// Drains the result stream into `sink` until every sender is gone.
///
/// The stream is unbounded so workers never wait on the sink. Sink errors are
/// logged and draining continues. `sink.flush` runs every `flush_interval` and
/// `sink.close` once at the end. Resolves to the number of results forwarded.
pub fn spawn_forwarder(
    mut rx: mpsc::UnboundedReceiver<TestResult>,
    sink: Arc<dyn ResultSink>,
    flush_interval: Duration,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut forwarded = 0u64;
        let mut rejected = 0u64;
        let mut tick = tokio::time::interval(flush_interval.max(Duration::from_millis(10)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.tick().await;

        loop {
            tokio::select! {
                next = rx.recv() => {
                    let Some(result) = next else { break };
                    if let Err(e) = sink.record(result).await {
                        rejected += 1;
                        tracing::warn!(sink = sink.name(), error = %e, "sink rejected result");
                    }
                    forwarded += 1;
                }
                _ = tick.tick() => {
                    if let Err(e) = sink.flush().await {
                        tracing::warn!(sink = sink.name(), error = %e, "sink flush failed");
                    }
                }
            }
        }

        if let Err(e) = sink.close().await {
            tracing::warn!(sink = sink.name(), error = %e, "sink close failed");
        }
        tracing::info!(sink = sink.name(), forwarded, rejected, "result stream drained");
        forwarded
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn result(i: u64) -> TestResult {
        let now = Utc::now();
        TestResult {
            url: format!("http://example.com/{i}"),
            status: 200,
            start_time: now,
            end_time: now,
            latency_ms: 1,
            method: "GET".to_string(),
            har_file: "t.har".to_string(),
            worker: 0,
            iteration: i,
            error: None,
        }
    }

    #[derive(Default)]
    struct FlakySink {
        seen: Mutex<Vec<u64>>,
        flushes: AtomicUsize,
    }

    #[async_trait]
    impl ResultSink for FlakySink {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn record(&self, result: TestResult) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(result.iteration);
            if result.iteration % 2 == 0 {
                anyhow::bail!("backend unavailable");
            }
            Ok(())
        }

        async fn flush(&self) -> anyhow::Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("flush unavailable")
        }
    }

    #[tokio::test]
    async fn sink_errors_do_not_stop_draining() {
        let sink = Arc::new(FlakySink::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_forwarder(rx, sink.clone(), Duration::from_secs(60));
        for i in 0..10 {
            tx.send(result(i)).unwrap();
        }
        drop(tx);

        assert_eq!(handle.await.unwrap(), 10);
        assert_eq!(*sink.seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
        assert!(sink.flushes.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn null_sink_drains_immediately() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_forwarder(rx, Arc::new(NullSink), Duration::from_millis(50));
        for i in 0..1000 {
            tx.send(result(i)).unwrap();
        }
        drop(tx);
        assert_eq!(handle.await.unwrap(), 1000);
    }

    #[derive(Default)]
    struct ClosingSink {
        recorded: AtomicUsize,
        closed_after: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl ResultSink for ClosingSink {
        fn name(&self) -> &str {
            "closing"
        }

        async fn record(&self, _result: TestResult) -> anyhow::Result<()> {
            self.recorded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) -> anyhow::Result<()> {
            let mut closed = self.closed_after.lock().unwrap();
            assert!(closed.is_none(), "closed twice");
            *closed = Some(self.recorded.load(Ordering::SeqCst));
            Ok(())
        }
    }

    #[tokio::test]
    async fn sink_is_closed_once_after_the_last_result() {
        let sink = Arc::new(ClosingSink::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_forwarder(rx, sink.clone(), Duration::from_millis(10));
        for i in 0..50 {
            tx.send(result(i)).unwrap();
        }
        drop(tx);

        assert_eq!(handle.await.unwrap(), 50);
        assert_eq!(*sink.closed_after.lock().unwrap(), Some(50));
    }
}
