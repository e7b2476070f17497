use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::har::Entry;

/// Consumer side of the bounded entry queue, shared by all workers.
///
/// Each entry is handed to exactly one caller of [`EntryQueue::next`].
#[derive(Clone)]
pub struct EntryQueue {
    rx: Arc<Mutex<mpsc::Receiver<Entry>>>,
}

impl EntryQueue {
    /// Creates a queue holding at most `capacity` entries.
    pub fn bounded(capacity: usize) -> (mpsc::Sender<Entry>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Waits for the next entry. `None` once the supply is gone and the queue is empty.
    ///
    /// Cancel safe: dropping the future never loses an entry.
    pub async fn next(&self) -> Option<Entry> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn entries_go_to_exactly_one_consumer() {
        let (tx, queue) = EntryQueue::bounded(4);
        let producer = tokio::spawn(async move {
            for i in 0..100 {
                tx.send(Entry::new("GET", format!("http://example.com/{i}")))
                    .await
                    .unwrap();
            }
        });

        let mut consumers = Vec::new();
        for _ in 0..4 {
            let q = queue.clone();
            consumers.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(e) = q.next().await {
                    seen.push(e.request.url);
                }
                seen
            }));
        }

        producer.await.unwrap();
        let mut all = Vec::new();
        for c in consumers {
            all.extend(c.await.unwrap());
        }
        assert_eq!(all.len(), 100);
        assert_eq!(all.iter().collect::<HashSet<_>>().len(), 100);
    }

    #[tokio::test]
    async fn capacity_bounds_the_producer() {
        let (tx, _queue) = EntryQueue::bounded(2);
        tx.try_send(Entry::new("GET", "http://example.com/1")).unwrap();
        tx.try_send(Entry::new("GET", "http://example.com/2")).unwrap();
        assert!(tx.try_send(Entry::new("GET", "http://example.com/3")).is_err());
    }
}
