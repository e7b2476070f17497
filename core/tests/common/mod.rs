#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use harload_core::api::{
    LoadConfig, LoadSettings, ProxyConfig, ResultSink, TestResult, TranslationErrorPolicy,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Keeps every result it receives.
#[derive(Default)]
pub struct CollectingSink {
    results: Mutex<Vec<TestResult>>,
}

impl CollectingSink {
    pub fn results(&self) -> Vec<TestResult> {
        self.results.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for CollectingSink {
    fn name(&self) -> &str {
        "collect"
    }

    async fn record(&self, result: TestResult) -> anyhow::Result<()> {
        self.results.lock().unwrap().push(result);
        Ok(())
    }
}

pub fn settings(workers: usize, duration: Duration) -> LoadSettings {
    let cfg = LoadConfig {
        workers,
        duration,
        translation_error: TranslationErrorPolicy::Record,
        ..Default::default()
    };
    LoadSettings::from_config("scenario.har", &cfg, ProxyConfig::Direct).unwrap()
}

/// A server that accepts connections and resets them without answering.
/// Returns its address and the number of connections accepted so far.
pub async fn reset_server() -> (SocketAddr, Arc<AtomicU64>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU64::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((sock, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = sock.set_linger(Some(Duration::ZERO));
            drop(sock);
        }
    });
    (addr, accepted)
}

/// A server that answers every request with 200 after `delay`.
pub async fn slow_server(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                loop {
                    match sock.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                    tokio::time::sleep(delay).await;
                    let resp = b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok";
                    if sock.write_all(resp).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    addr
}
