use async_trait::async_trait;
use harload_core::api::{ResultSink, TestResult};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Appends each result as one JSON object per line. The path `stdout:` writes
/// to standard output.
pub struct JsonlSink {
    path: String,
    writer: Mutex<BufWriter<Box<dyn AsyncWrite + Unpin + Send>>>,
}

impl JsonlSink {
    pub async fn open(path: &str) -> anyhow::Result<Self> {
        let writer: Box<dyn AsyncWrite + Unpin + Send> = if path == "stdout:" {
            Box::new(tokio::io::stdout())
        } else {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to open {path}: {e}"))?;
            Box::new(file)
        };
        Ok(Self {
            path: path.to_string(),
            writer: Mutex::new(BufWriter::new(writer)),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl ResultSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn record(&self, result: TestResult) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(&result)?;
        line.push('\n');
        self.writer.lock().await.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(i: u64, status: u16) -> TestResult {
        let now = Utc::now();
        TestResult {
            url: format!("http://example.com/{i}"),
            status,
            start_time: now,
            end_time: now,
            latency_ms: i,
            method: "GET".to_string(),
            har_file: "site.har".to_string(),
            worker: 1,
            iteration: i,
            error: (status == 0).then(|| "connect: refused".to_string()),
        }
    }

    #[tokio::test]
    async fn appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        let path_str = path.to_string_lossy().to_string();

        let sink = JsonlSink::open(&path_str).await.unwrap();
        sink.record(result(1, 200)).await.unwrap();
        sink.record(result(2, 0)).await.unwrap();
        sink.flush().await.unwrap();

        // Reopening appends instead of truncating.
        let again = JsonlSink::open(&path_str).await.unwrap();
        again.record(result(3, 200)).await.unwrap();
        again.flush().await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<TestResult> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0], result_like(&parsed[0], 1, 200));
        assert_eq!(parsed[1].error.as_deref(), Some("connect: refused"));
        assert!(!raw.lines().next().unwrap().contains("\"error\""));
    }

    fn result_like(r: &TestResult, i: u64, status: u16) -> TestResult {
        TestResult {
            iteration: i,
            status,
            ..r.clone()
        }
    }

    #[tokio::test]
    async fn open_fails_for_missing_directory() {
        let err = JsonlSink::open("/no/such/dir/results.jsonl")
            .await
            .err()
            .expect("expected open failure");
        assert!(err.to_string().contains("/no/such/dir"));
    }
}
