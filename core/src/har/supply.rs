use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::model::Entry;

/// Producer side of the bounded entry queue.
///
/// Implementations push entries into `tx`, waiting whenever the queue is full,
/// and return once they have nothing more to offer, the receiving side is gone,
/// or `cancel` fires. The return value is the number of entries handed over.
#[async_trait]
pub trait EntrySupply: Send + 'static {
    fn name(&self) -> &str;
    async fn produce(self: Box<Self>, tx: mpsc::Sender<Entry>, cancel: CancellationToken) -> u64;
}

/// Supplies entries from any iterator.
pub struct IterSupply<I> {
    name: String,
    iter: I,
}

impl<I> IterSupply<I>
where
    I: Iterator<Item = Entry> + Send + 'static,
{
    pub fn new(name: impl Into<String>, iter: I) -> Self {
        Self {
            name: name.into(),
            iter,
        }
    }
}

#[async_trait]
impl<I> EntrySupply for IterSupply<I>
where
    I: Iterator<Item = Entry> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(self: Box<Self>, tx: mpsc::Sender<Entry>, cancel: CancellationToken) -> u64 {
        let IterSupply { name, iter } = *self;
        let mut sent = 0u64;
        for entry in iter {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(supply = %name, sent, "entry supply cancelled");
                    return sent;
                }
                res = tx.send(entry) => {
                    if res.is_err() {
                        tracing::debug!(supply = %name, sent, "entry queue closed");
                        return sent;
                    }
                    sent += 1;
                }
            }
        }
        tracing::info!(supply = %name, sent, "entry supply exhausted");
        sent
    }
}

/// Supplies the entries of a parsed archive, once or cycling until cancelled.
pub struct HarSupply {
    har_file: String,
    entries: Vec<Entry>,
    repeat: bool,
}

impl HarSupply {
    pub fn new(har_file: impl Into<String>, entries: Vec<Entry>, repeat: bool) -> Self {
        Self {
            har_file: har_file.into(),
            entries,
            repeat,
        }
    }
}

#[async_trait]
impl EntrySupply for HarSupply {
    fn name(&self) -> &str {
        &self.har_file
    }

    async fn produce(self: Box<Self>, tx: mpsc::Sender<Entry>, cancel: CancellationToken) -> u64 {
        let HarSupply {
            har_file,
            entries,
            repeat,
        } = *self;
        if repeat {
            Box::new(IterSupply::new(har_file, entries.into_iter().cycle()))
                .produce(tx, cancel)
                .await
        } else {
            Box::new(IterSupply::new(har_file, entries.into_iter()))
                .produce(tx, cancel)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entries(n: usize) -> Vec<Entry> {
        (0..n)
            .map(|i| Entry::new("GET", format!("http://example.com/{i}")))
            .collect()
    }

    #[tokio::test]
    async fn single_pass_stops_after_last_entry() {
        let (tx, mut rx) = mpsc::channel(8);
        let supply = Box::new(HarSupply::new("a.har", entries(3), false));
        let sent = supply.produce(tx, CancellationToken::new()).await;
        assert_eq!(sent, 3);

        let mut urls = Vec::new();
        while let Some(e) = rx.recv().await {
            urls.push(e.request.url);
        }
        assert_eq!(
            urls,
            vec![
                "http://example.com/0",
                "http://example.com/1",
                "http://example.com/2"
            ]
        );
    }

    #[tokio::test]
    async fn full_queue_blocks_until_cancelled() {
        let (tx, _rx) = mpsc::channel(2);
        let cancel = CancellationToken::new();
        let supply = Box::new(HarSupply::new("a.har", entries(1), true));
        let handle = tokio::spawn(supply.produce(tx, cancel.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        cancel.cancel();
        let sent = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("supply did not observe cancellation")
            .unwrap();
        assert_eq!(sent, 2);
    }

    #[tokio::test]
    async fn closed_queue_ends_production() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let supply = Box::new(IterSupply::new("iter", entries(5).into_iter()));
        assert_eq!(supply.produce(tx, CancellationToken::new()).await, 0);
    }
}
