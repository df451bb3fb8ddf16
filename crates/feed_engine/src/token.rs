use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ingest_logging::{ingest_debug, ingest_info};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::Instant;

use crate::fetch::FetchSettings;
use crate::AuthError;

/// Bearer credential for the feed. The secret is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    secret: String,
    expires_at: Option<Instant>,
}

impl Token {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: None,
        }
    }

    /// A lifetime too large to represent as an instant means no known expiry.
    pub fn expiring_in(secret: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_at: Instant::now().checked_add(lifetime),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self) -> Result<Token, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

fn build_client(settings: &FetchSettings) -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| AuthError::Transport(err.to_string()))
}

async fn read_token(response: reqwest::Response) -> Result<Token, AuthError> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(AuthError::Status(status.as_u16()));
    }
    let body = response
        .bytes()
        .await
        .map_err(|err| AuthError::Transport(err.to_string()))?;
    let parsed: TokenBody =
        serde_json::from_slice(&body).map_err(|err| AuthError::Malformed(err.to_string()))?;
    if parsed.access_token.trim().is_empty() {
        return Err(AuthError::Malformed("empty access_token".into()));
    }
    Ok(match parsed.expires_in {
        Some(secs) => Token::expiring_in(parsed.access_token, Duration::from_secs(secs)),
        None => Token::new(parsed.access_token),
    })
}

/// Fetches `{ "access_token": ... }` with a plain GET from a token service.
#[derive(Debug, Clone)]
pub struct EndpointTokenProvider {
    client: reqwest::Client,
    url: String,
}

impl EndpointTokenProvider {
    pub fn new(url: impl Into<String>, settings: &FetchSettings) -> Result<Self, AuthError> {
        Ok(Self {
            client: build_client(settings)?,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl TokenProvider for EndpointTokenProvider {
    async fn acquire_token(&self) -> Result<Token, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        read_token(response).await
    }
}

/// OAuth client-credentials grant against the upstream access-token URL.
#[derive(Clone)]
pub struct ClientCredentialsProvider {
    client: reqwest::Client,
    url: String,
    client_id: String,
    client_secret: String,
    user_agent: String,
}

impl ClientCredentialsProvider {
    pub fn new(
        url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        settings: &FetchSettings,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            client: build_client(settings)?,
            url: url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_agent: settings.user_agent.clone(),
        })
    }
}

#[async_trait::async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn acquire_token(&self) -> Result<Token, AuthError> {
        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(USER_AGENT, &self.user_agent)
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        read_token(response).await
    }
}

/// Sole owner of the current token. Only the poll loop drives it, so no lock.
pub struct TokenManager {
    provider: Arc<dyn TokenProvider>,
    current: Option<Token>,
}

impl TokenManager {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Drops the held token after the feed rejected it.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Asks the provider for a new token and swaps it in on success.
    ///
    /// On failure the held token is left untouched.
    pub async fn refresh(&mut self) -> Result<Token, AuthError> {
        let token = self.provider.acquire_token().await?;
        ingest_info!(
            "Token refreshed (expires_in={:?})",
            token
                .expires_at()
                .map(|at| at.saturating_duration_since(Instant::now()))
        );
        self.current = Some(token.clone());
        Ok(token)
    }

    /// Returns the held token, refreshing first when none is held or it has expired.
    pub async fn valid_token(&mut self) -> Result<Token, AuthError> {
        match &self.current {
            Some(token) if !token.is_expired_at(Instant::now()) => Ok(token.clone()),
            Some(_) => {
                ingest_debug!("Held token expired; refreshing before fetch");
                self.refresh().await
            }
            None => self.refresh().await,
        }
    }
}
