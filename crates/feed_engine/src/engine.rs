use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channel::ingestion_channel;
use crate::fetch::FeedClient;
use crate::poller::{PollExit, PollSettings, Poller};
use crate::sink::{SinkReport, SinkWorker};
use crate::store::ItemStore;
use crate::token::{TokenManager, TokenProvider};
use crate::EngineError;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub poll: PollSettings,
    pub channel_capacity: usize,
}

impl EngineConfig {
    pub fn new(poll: PollSettings) -> Self {
        Self {
            poll,
            channel_capacity: 256,
        }
    }
}

/// Running ingestion: one poll loop task and one sink worker task.
pub struct EngineHandle {
    cancel: CancellationToken,
    poller: JoinHandle<PollExit>,
    sink: JoinHandle<SinkReport>,
}

impl EngineHandle {
    /// Acquires the first token, then spawns both activities.
    ///
    /// Returns `EngineError::Startup` without spawning anything when no token can be had.
    pub async fn start(
        config: EngineConfig,
        client: Arc<dyn FeedClient>,
        provider: Arc<dyn TokenProvider>,
        store: Arc<dyn ItemStore>,
    ) -> Result<Self, EngineError> {
        if config.channel_capacity == 0 {
            return Err(EngineError::Config("channel capacity must be positive".into()));
        }
        if config.poll.resource.trim().is_empty() {
            return Err(EngineError::Config("feed resource must not be empty".into()));
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = ingestion_channel(config.channel_capacity);
        let mut poller = Poller::new(
            client,
            TokenManager::new(provider),
            tx,
            config.poll,
            cancel.child_token(),
        );
        poller.acquire_initial_token().await?;

        let sink = tokio::spawn(SinkWorker::new(store, rx).run(cancel.child_token()));
        let poller = tokio::spawn(poller.run());

        Ok(Self {
            cancel,
            poller,
            sink,
        })
    }

    /// Token that stops both activities when cancelled.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels, waits for the poll loop, then for the sink to drain.
    pub async fn shutdown(self) -> Result<SinkReport, EngineError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Waits until the poll loop stops on its own or through the cancellation token.
    pub async fn join(self) -> Result<SinkReport, EngineError> {
        let exit = self
            .poller
            .await
            .map_err(|err| EngineError::Task(err.to_string()))?;
        // The poll loop dropped its sender; the sink ends once the buffer is empty.
        if exit == PollExit::ChannelClosed {
            self.cancel.cancel();
        }
        self.sink
            .await
            .map_err(|err| EngineError::Task(err.to_string()))
    }
}
