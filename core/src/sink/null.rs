use async_trait::async_trait;

use crate::load::TestResult;

use super::ResultSink;

/// Discards every result. Used when no sink target is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    async fn record(&self, _result: TestResult) -> anyhow::Result<()> {
        Ok(())
    }
}
