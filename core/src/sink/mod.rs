mod forward;
mod null;

use async_trait::async_trait;

use crate::load::TestResult;

pub use forward::spawn_forwarder;
pub use null::NullSink;

/// Consumer of the result stream.
///
/// `record` is called from a single forwarder task in arrival order and must
/// return quickly; slow backends buffer and write in the background. `flush`
/// runs periodically and must not wait on the backend either. `close` runs
/// once after the stream ends and may wait for outstanding writes.
#[async_trait]
pub trait ResultSink: Send + Sync {
    fn name(&self) -> &str;
    async fn record(&self, result: TestResult) -> anyhow::Result<()>;
    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn close(&self) -> anyhow::Result<()> {
        self.flush().await
    }
}
