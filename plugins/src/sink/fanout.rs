use std::sync::Arc;

use async_trait::async_trait;
use harload_core::api::{ResultSink, TestResult};

/// Forwards every result to each inner sink. One failing sink does not keep
/// the others from receiving the result; the first error is returned.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ResultSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn ResultSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ResultSink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn record(&self, result: TestResult) -> anyhow::Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(result.clone()).await {
                first_err.get_or_insert(e.context(format!("sink {}", sink.name())));
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.flush().await {
                first_err.get_or_insert(e.context(format!("sink {}", sink.name())));
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn close(&self) -> anyhow::Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.close().await {
                first_err.get_or_insert(e.context(format!("sink {}", sink.name())));
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
