use std::sync::Arc;

use feed_core::Item;
use ingest_logging::{ingest_debug, ingest_info, ingest_warn};
use tokio_util::sync::CancellationToken;

use crate::channel::IngestReceiver;
use crate::store::ItemStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkReport {
    pub saved: u64,
    pub dropped: u64,
}

/// The single consumer of the ingestion channel.
pub struct SinkWorker {
    store: Arc<dyn ItemStore>,
    rx: IngestReceiver,
    report: SinkReport,
}

impl SinkWorker {
    pub fn new(store: Arc<dyn ItemStore>, rx: IngestReceiver) -> Self {
        Self {
            store,
            rx,
            report: SinkReport::default(),
        }
    }

    /// Persists items until every sender is gone or `cancel` fires.
    ///
    /// On cancellation intake stops and whatever is already buffered is still saved.
    pub async fn run(mut self, cancel: CancellationToken) -> SinkReport {
        loop {
            let next = tokio::select! {
                biased;
                item = self.rx.recv() => item,
                _ = cancel.cancelled() => break,
            };
            match next {
                Some(item) => self.persist(item).await,
                None => {
                    ingest_debug!("Ingestion channel closed by producer");
                    return self.finish();
                }
            }
        }

        self.rx.close();
        while let Some(item) = self.rx.recv().await {
            self.persist(item).await;
        }
        self.finish()
    }

    async fn persist(&mut self, item: Item) {
        match self.store.save(item).await {
            Ok(()) => self.report.saved += 1,
            Err(err) => {
                self.report.dropped += 1;
                ingest_warn!(
                    "Dropping item after failed save ({} dropped so far): {}",
                    self.report.dropped,
                    err
                );
            }
        }
    }

    fn finish(self) -> SinkReport {
        ingest_info!(
            "Sink worker stopped (saved={} dropped={})",
            self.report.saved,
            self.report.dropped
        );
        self.report
    }
}
