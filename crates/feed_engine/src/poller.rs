use std::sync::Arc;
use std::time::Duration;

use feed_core::{settle_delay, CycleOutcome, DelayPolicy, PollState};
use ingest_logging::{ingest_debug, ingest_error, ingest_info, ingest_warn};
use tokio_util::sync::CancellationToken;

use crate::channel::{DispatchStatus, IngestSender};
use crate::decode::decode_listing;
use crate::fetch::FeedClient;
use crate::token::TokenManager;
use crate::{EngineError, ErrorClass, FetchError};

#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Feed resource to poll (a subreddit name).
    pub resource: String,
    pub policy: DelayPolicy,
    /// Upper bound on how long one send into the ingestion channel may wait.
    pub dispatch_timeout: Duration,
}

impl PollSettings {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            policy: DelayPolicy::default(),
            dispatch_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// How long to sleep before the next fetch.
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Cancelled,
    ChannelClosed,
}

/// Sequential fetch → parse → dispatch → sleep loop. Never issues concurrent fetches.
pub struct Poller {
    client: Arc<dyn FeedClient>,
    tokens: TokenManager,
    tx: IngestSender,
    settings: PollSettings,
    cancel: CancellationToken,
    state: PollState,
    delay: Duration,
    channel_closed: bool,
}

impl Poller {
    pub fn new(
        client: Arc<dyn FeedClient>,
        tokens: TokenManager,
        tx: IngestSender,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> Self {
        let delay = settings.policy.baseline;
        Self {
            client,
            tokens,
            tx,
            settings,
            cancel,
            state: PollState::NeedToken,
            delay,
            channel_closed: false,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Synchronous token acquisition before the first fetch. Failure here is fatal.
    pub async fn acquire_initial_token(&mut self) -> Result<(), EngineError> {
        self.transition(PollState::NeedToken);
        self.tokens
            .refresh()
            .await
            .map(|_| ())
            .map_err(EngineError::Startup)
    }

    /// Runs one cycle up to (not including) the sleep and returns the delay to sleep.
    pub async fn poll_once(&mut self) -> CycleReport {
        let outcome = self.cycle().await;
        self.delay = settle_delay(self.delay, &outcome, &self.settings.policy);
        self.transition(PollState::Sleeping);
        CycleReport {
            outcome,
            delay: self.delay,
        }
    }

    pub async fn run(mut self) -> PollExit {
        ingest_info!(
            "Poll loop started for {:?} (baseline {:?})",
            self.settings.resource,
            self.settings.policy.baseline
        );
        loop {
            if self.cancel.is_cancelled() {
                return self.exit(PollExit::Cancelled);
            }
            let report = self.poll_once().await;
            if self.channel_closed {
                return self.exit(PollExit::ChannelClosed);
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return self.exit(PollExit::Cancelled),
                _ = tokio::time::sleep(report.delay) => {}
            }
        }
    }

    async fn cycle(&mut self) -> CycleOutcome {
        let token = match self.tokens.valid_token().await {
            Ok(token) => token,
            Err(err) => {
                self.transition(PollState::AuthExpired);
                ingest_error!("No usable token, skipping fetch: {}", err);
                return CycleOutcome::TokenUnavailable;
            }
        };

        self.transition(PollState::Fetching);
        let fetched = self
            .client
            .fetch_page(&self.settings.resource, &token)
            .await;
        let page = match fetched {
            Ok(page) => page,
            Err(err) => return self.handle_fetch_error(err).await,
        };

        self.transition(PollState::Parsing);
        let items = match decode_listing(&page.body) {
            Ok(items) => items,
            Err(err) => {
                ingest_warn!("Discarding undecodable page: {}", err);
                return CycleOutcome::Malformed;
            }
        };

        let rate = page.rate_limit;
        if rate.is_exhausted() {
            ingest_warn!(
                "Rate limit reached (used={} remaining={}), waiting for {}s reset",
                rate.used,
                rate.remaining,
                rate.reset_seconds
            );
        } else {
            ingest_info!(
                "Rate limit used={} remaining={} reset={}s",
                rate.used,
                rate.remaining,
                rate.reset_seconds
            );
        }

        self.transition(PollState::Dispatching);
        let parsed = items.len();
        let report = self
            .tx
            .dispatch(items, self.settings.dispatch_timeout, &self.cancel)
            .await;
        match report.status {
            DispatchStatus::Complete => {
                ingest_debug!("Dispatched {} item(s)", report.dispatched);
            }
            DispatchStatus::TimedOut => {
                ingest_warn!(
                    "Sink not keeping up; dropped {} of {} item(s)",
                    report.dropped,
                    parsed
                );
            }
            DispatchStatus::Closed => {
                ingest_error!("Ingestion channel closed; {} item(s) lost", report.dropped);
                self.channel_closed = true;
            }
            DispatchStatus::Cancelled => {
                ingest_debug!("Dispatch cancelled with {} item(s) pending", report.dropped);
            }
        }

        CycleOutcome::Dispatched {
            parsed,
            dispatched: report.dispatched,
            rate_limit: rate,
        }
    }

    async fn handle_fetch_error(&mut self, err: FetchError) -> CycleOutcome {
        match err.class() {
            ErrorClass::Auth => {
                self.transition(PollState::AuthExpired);
                ingest_warn!("Feed rejected token, refreshing");
                self.tokens.invalidate();
                let refreshed = match self.tokens.refresh().await {
                    Ok(_) => true,
                    Err(auth_err) => {
                        ingest_error!("Token refresh failed: {}", auth_err);
                        false
                    }
                };
                CycleOutcome::AuthRejected { refreshed }
            }
            ErrorClass::Transport => {
                self.transition(PollState::TransientError);
                ingest_warn!("Error fetching page: {}", err);
                CycleOutcome::TransportFailed
            }
            ErrorClass::Protocol => {
                self.transition(PollState::TransientError);
                ingest_warn!("Unusable feed response: {}", err);
                CycleOutcome::ProtocolFailed {
                    status: err.status(),
                }
            }
        }
    }

    fn transition(&mut self, next: PollState) {
        if self.state != next {
            ingest_debug!("Poll state {} -> {}", self.state, next);
        }
        self.state = next;
    }

    fn exit(&self, reason: PollExit) -> PollExit {
        ingest_info!("Poll loop stopped ({:?})", reason);
        reason
    }
}
