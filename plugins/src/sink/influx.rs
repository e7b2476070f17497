use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinSet;
use std::{error::Error as StdError, fmt};

use async_trait::async_trait;
use harload_core::api::{ResultSink, TestResult};
use reqwest::Url;

const BODY_PREVIEW_LIMIT: usize = 512;
const DEFAULT_DATABASE: &str = "hargo";
const MEASUREMENT: &str = "test_result";
/// Batches being written at once; `record` waits for one to finish beyond this.
const MAX_IN_FLIGHT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkHttpErrorKind {
    Timeout,
    Connect,
    Request,
    Status,
    Unknown,
}

impl SinkHttpErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SinkHttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct SinkHttpError {
    kind: SinkHttpErrorKind,
    status: Option<u16>,
    url: String,
    message: String,
    source: Option<anyhow::Error>,
}

impl SinkHttpError {
    pub fn kind(&self) -> SinkHttpErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    fn from_reqwest(err: reqwest::Error, url: String) -> Self {
        let kind = if err.is_timeout() {
            SinkHttpErrorKind::Timeout
        } else if err.is_connect() {
            SinkHttpErrorKind::Connect
        } else if err.is_request() {
            SinkHttpErrorKind::Request
        } else {
            SinkHttpErrorKind::Unknown
        };
        SinkHttpError {
            kind,
            status: err.status().map(|s| s.as_u16()),
            url,
            message: err.to_string(),
            source: Some(anyhow::Error::new(err)),
        }
    }

    fn status_error(status: u16, url: String, preview: String) -> Self {
        SinkHttpError {
            kind: SinkHttpErrorKind::Status,
            status: Some(status),
            url,
            message: preview,
            source: None,
        }
    }
}

impl fmt::Display for SinkHttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "influx write error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        write!(f, " url={}: {}", self.url, self.message)
    }
}

impl StdError for SinkHttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}

/// Escapes a tag value for the line protocol.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, ',' | ' ' | '=' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Writes results to an InfluxDB 1.x `/write` endpoint as `test_result` points.
///
/// Points are buffered and a batch is posted in the background once
/// `batch_size` is reached or on `flush`. Failed posts surface on the next
/// `flush` or `close`; `close` waits for every outstanding post.
pub struct InfluxSink {
    http: reqwest::Client,
    write_url: String,
    batch_size: usize,
    buffer: Mutex<Vec<String>>,
    in_flight: tokio::sync::Mutex<JoinSet<anyhow::Result<()>>>,
}

impl InfluxSink {
    /// `base_url` is the server URL; its first path segment, if any, names the
    /// database unless `database` overrides it.
    pub fn new(
        base_url: &str,
        database: Option<&str>,
        batch_size: usize,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            write_url: write_url(base_url, database)?,
            batch_size: batch_size.max(1),
            buffer: Mutex::new(Vec::new()),
            in_flight: tokio::sync::Mutex::new(JoinSet::new()),
        })
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    /// Renders one point in line protocol.
    pub fn line(result: &TestResult) -> String {
        let mut line = String::from(MEASUREMENT);
        let status = result.status.to_string();
        for (key, value) in [
            ("HarFile", result.har_file.as_str()),
            ("Method", result.method.as_str()),
            ("Status", status.as_str()),
            ("URL", result.url.as_str()),
        ] {
            if value.is_empty() {
                continue;
            }
            line.push(',');
            line.push_str(key);
            line.push('=');
            line.push_str(&escape_tag(value));
        }
        let ts = result.start_time.timestamp_nanos_opt().unwrap_or_default();
        line.push_str(&format!(" Latency={}i {}", result.latency_ms, ts));
        line
    }

    fn take_batch(&self, force: bool) -> Option<Vec<String>> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        if buffer.is_empty() || (!force && buffer.len() < self.batch_size) {
            return None;
        }
        Some(std::mem::take(&mut *buffer))
    }

    /// Starts posting `lines` without waiting for the response. Returns the
    /// first error among posts that already finished.
    async fn spawn_post(&self, lines: Vec<String>) -> anyhow::Result<()> {
        let mut in_flight = self.in_flight.lock().await;
        let mut first_err = reap(&mut in_flight, false).await.err();
        while in_flight.len() >= MAX_IN_FLIGHT {
            if let Some(Err(e)) = in_flight.join_next().await.map(flatten) {
                first_err.get_or_insert(e);
            }
        }
        in_flight.spawn(post(self.http.clone(), self.write_url.clone(), lines));
        first_err.map_or(Ok(()), Err)
    }
}

/// Collects finished posts, or all of them when `wait` is set.
async fn reap(
    in_flight: &mut JoinSet<anyhow::Result<()>>,
    wait: bool,
) -> anyhow::Result<()> {
    let mut first_err = None;
    loop {
        let next = if wait {
            in_flight.join_next().await
        } else {
            in_flight.try_join_next()
        };
        let Some(done) = next else { break };
        if let Err(e) = flatten(done) {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

fn flatten(
    done: Result<anyhow::Result<()>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    done.map_err(|e| anyhow::anyhow!("influx write task failed: {e}"))?
}

async fn post(http: reqwest::Client, write_url: String, lines: Vec<String>) -> anyhow::Result<()> {
    let points = lines.len();
    let resp = http
        .post(&write_url)
        .body(lines.join("\n"))
        .send()
        .await
        .map_err(|err| SinkHttpError::from_reqwest(err, write_url.clone()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(
            SinkHttpError::status_error(status.as_u16(), write_url, preview_body(&body)).into(),
        );
    }
    tracing::debug!(target: "harload.sink", points, status = status.as_u16(), "influx batch written");
    Ok(())
}

#[async_trait]
impl ResultSink for InfluxSink {
    fn name(&self) -> &str {
        "influx"
    }

    async fn record(&self, result: TestResult) -> anyhow::Result<()> {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Self::line(&result));
        match self.take_batch(false) {
            Some(batch) => self.spawn_post(batch).await,
            None => Ok(()),
        }
    }

    async fn flush(&self) -> anyhow::Result<()> {
        match self.take_batch(true) {
            Some(batch) => self.spawn_post(batch).await,
            None => reap(&mut *self.in_flight.lock().await, false).await,
        }
    }

    async fn close(&self) -> anyhow::Result<()> {
        let flushed = self.flush().await;
        let waited = reap(&mut *self.in_flight.lock().await, true).await;
        flushed.and(waited)
    }
}

fn write_url(base_url: &str, database: Option<&str>) -> anyhow::Result<String> {
    let base = Url::parse(base_url.trim())
        .map_err(|e| anyhow::anyhow!("invalid influx url {base_url:?}: {e}"))?;
    if !matches!(base.scheme(), "http" | "https") {
        anyhow::bail!("invalid influx url {base_url:?}: unsupported scheme");
    }

    let db = database
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .or_else(|| {
            base.path_segments()
                .and_then(|mut s| s.next())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let mut url = base.clone();
    url.set_path("/write");
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("db", &db);
        q.append_pair("precision", "ns");
        if !base.username().is_empty() {
            q.append_pair("u", base.username());
            q.append_pair("p", base.password().unwrap_or_default());
        }
    }
    let _ = url.set_username("");
    let _ = url.set_password(None);
    Ok(url.to_string())
}
