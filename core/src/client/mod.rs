//! Per-worker HTTP transport: private cookie jar and explicit proxy route on
//! top of `reqwest`.

mod proxy;

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::cookie::Jar;
use reqwest::{StatusCode, Url};

use crate::error::SendError;
use crate::translate::ReplayRequest;

pub use proxy::ProxyConfig;

/// Responses larger than this are not drained; their connection is dropped instead.
const MAX_DRAIN_BYTES: usize = 1 << 20;

/// Fixed transport limits applied to every worker client.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub connect_timeout: Duration,
    pub tcp_keepalive: Duration,
    /// Applied as the client's read timeout: every read after the request is
    /// written must make progress within this window, so a server that never
    /// sends its response headers fails once it elapses.
    pub response_header_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            tcp_keepalive: Duration::from_secs(30),
            response_header_timeout: Duration::from_secs(10),
            max_redirects: 10,
        }
    }
}

/// Outcome of one replayed request after redirects.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: StatusCode,
    /// Time until the final response headers arrived.
    pub elapsed: Duration,
}

/// HTTP client owned by exactly one worker.
pub struct ReplayClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
}

impl ReplayClient {
    pub fn new(
        settings: &TransportSettings,
        proxy: &ProxyConfig,
        insecure_skip_verify: bool,
    ) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(Jar::default());
        let builder = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .connect_timeout(settings.connect_timeout)
            .tcp_keepalive(settings.tcp_keepalive)
            .read_timeout(settings.response_header_timeout)
            .danger_accept_invalid_certs(insecure_skip_verify);
        let http = proxy.apply(builder).build()?;

        Ok(Self { http, jar })
    }

    /// Seeds recorded cookies for `url` into this client's jar.
    pub fn seed_cookies(&self, url: &Url, cookies: &[(String, String)]) {
        for (name, value) in cookies {
            self.jar.add_cookie_str(&format!("{name}={value}"), url);
        }
    }

    /// Sends `req`; redirects are followed by the client's policy. Resolves
    /// once the final response headers arrive; the body is drained afterwards
    /// so the connection can be reused.
    pub async fn execute(&self, req: &ReplayRequest) -> Result<Exchange, SendError> {
        let mut builder = self
            .http
            .request(req.method.clone(), req.url.clone())
            .headers(req.headers.clone());
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let resp = builder.send().await?;
        let elapsed = started.elapsed();
        let status = resp.status();
        if resp.url() != &req.url {
            tracing::debug!(from = %req.url, to = %resp.url(), "redirected");
        }
        drain(resp).await;

        Ok(Exchange { status, elapsed })
    }
}

async fn drain(mut resp: reqwest::Response) {
    let mut read = 0usize;
    while let Ok(Some(chunk)) = resp.chunk().await {
        read += chunk.len();
        if read > MAX_DRAIN_BYTES {
            break;
        }
    }
}
