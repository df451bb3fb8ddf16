use std::fmt;

/// How the poll loop recovers from a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry next cycle with the delay unchanged.
    Transport,
    /// Refresh the token synchronously, skip this cycle's fetch.
    Auth,
    /// Retry next cycle with the delay unchanged.
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self.kind {
            FailureKind::Network | FailureKind::Timeout => ErrorClass::Transport,
            FailureKind::Unauthorized => ErrorClass::Auth,
            FailureKind::InvalidUrl | FailureKind::HttpStatus(_) | FailureKind::TooLarge { .. } => {
                ErrorClass::Protocol
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::Unauthorized => Some(401),
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Network,
    Timeout,
    Unauthorized,
    HttpStatus(u16),
    TooLarge { max_bytes: u64, actual: Option<u64> },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
        }
    }
}

/// Token acquisition failure. Aborts the current cycle, never the loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("token provider unreachable: {0}")]
    Transport(String),
    #[error("token provider returned status {0}")]
    Status(u16),
    #[error("malformed token response: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The one fatal condition: no token could be obtained before the first fetch.
    #[error("initial token acquisition failed: {0}")]
    Startup(#[source] AuthError),
    #[error("invalid engine configuration: {0}")]
    Config(String),
    #[error("engine task failed: {0}")]
    Task(String),
}
