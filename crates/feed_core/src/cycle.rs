use std::fmt;
use std::time::Duration;

use crate::{DelayPolicy, RateLimitSnapshot};

/// Where the poll loop currently is within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    NeedToken,
    Fetching,
    Parsing,
    Dispatching,
    AuthExpired,
    TransientError,
    Sleeping,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollState::NeedToken => "need-token",
            PollState::Fetching => "fetching",
            PollState::Parsing => "parsing",
            PollState::Dispatching => "dispatching",
            PollState::AuthExpired => "auth-expired",
            PollState::TransientError => "transient-error",
            PollState::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

/// How one fetch cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Page parsed; `dispatched` of `parsed` items reached the channel.
    Dispatched {
        parsed: usize,
        dispatched: usize,
        rate_limit: RateLimitSnapshot,
    },
    /// DNS, connection or timeout failure.
    TransportFailed,
    /// The feed rejected the token; `refreshed` tells whether replacement succeeded.
    AuthRejected { refreshed: bool },
    /// No usable token before fetching (expired token whose refresh failed).
    TokenUnavailable,
    /// Unexpected status or an unusable response; `status` is absent when the
    /// request never produced one (oversized body, bad URL).
    ProtocolFailed { status: Option<u16> },
    /// Body could not be parsed; nothing was dispatched.
    Malformed,
}

impl CycleOutcome {
    /// The state the cycle left from before going to sleep.
    pub fn exit_state(&self) -> PollState {
        match self {
            CycleOutcome::Dispatched { .. } => PollState::Dispatching,
            CycleOutcome::AuthRejected { .. } | CycleOutcome::TokenUnavailable => {
                PollState::AuthExpired
            }
            CycleOutcome::TransportFailed | CycleOutcome::ProtocolFailed { .. } => {
                PollState::TransientError
            }
            CycleOutcome::Malformed => PollState::Parsing,
        }
    }

    pub fn dispatched(&self) -> usize {
        match self {
            CycleOutcome::Dispatched { dispatched, .. } => *dispatched,
            _ => 0,
        }
    }
}

/// Pure transition into `Sleeping`: picks the delay for the next cycle.
///
/// Only a successfully parsed page recomputes the delay; every failure keeps
/// the previous one.
pub fn settle_delay(previous: Duration, outcome: &CycleOutcome, policy: &DelayPolicy) -> Duration {
    match outcome {
        CycleOutcome::Dispatched { rate_limit, .. } => policy.delay_for(rate_limit),
        _ => previous,
    }
}
