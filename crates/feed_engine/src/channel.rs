use std::time::Duration;

use feed_core::Item;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Bounded FIFO hand-off from the poll loop (single producer) to the sink worker (single consumer).
pub fn ingestion_channel(capacity: usize) -> (IngestSender, IngestReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (IngestSender { tx }, IngestReceiver { rx })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Complete,
    /// A send waited longer than the dispatch timeout; the rest of the page was dropped.
    TimedOut,
    /// The consumer is gone.
    Closed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub dispatched: usize,
    pub dropped: usize,
    pub status: DispatchStatus,
}

#[derive(Debug)]
pub struct IngestSender {
    tx: mpsc::Sender<Item>,
}

impl IngestSender {
    /// Sends a page of items in order. Each send waits at most `timeout` for room.
    pub async fn dispatch(
        &self,
        items: Vec<Item>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> DispatchReport {
        let total = items.len();
        let mut dispatched = 0;
        let stop = |dispatched: usize, status| DispatchReport {
            dispatched,
            dropped: total - dispatched,
            status,
        };

        for item in items {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return stop(dispatched, DispatchStatus::Cancelled),
                sent = tokio::time::timeout(timeout, self.tx.send(item)) => match sent {
                    Ok(Ok(())) => dispatched += 1,
                    Ok(Err(_)) => return stop(dispatched, DispatchStatus::Closed),
                    Err(_) => return stop(dispatched, DispatchStatus::TimedOut),
                },
            }
        }
        stop(dispatched, DispatchStatus::Complete)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct IngestReceiver {
    rx: mpsc::Receiver<Item>,
}

impl IngestReceiver {
    pub async fn recv(&mut self) -> Option<Item> {
        self.rx.recv().await
    }

    /// Stops intake; buffered items can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
