use std::time::Duration;

use bytes::{Bytes, BytesMut};
use feed_core::RateLimitSnapshot;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use url::Url;

use crate::{FailureKind, FetchError, Token};

pub const RATELIMIT_USED: &str = "x-ratelimit-used";
pub const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATELIMIT_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 4 * 1024 * 1024,
            user_agent: "feed-ingest/0.1".to_string(),
        }
    }
}

/// Raw successful response: the undecoded body plus its rate-limit counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage {
    pub body: Bytes,
    pub rate_limit: RateLimitSnapshot,
}

#[async_trait::async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_page(&self, resource: &str, token: &Token) -> Result<FeedPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFeedClient {
    client: reqwest::Client,
    base_url: Url,
    settings: FetchSettings,
}

impl ReqwestFeedClient {
    pub fn new(base_url: &str, settings: FetchSettings) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    /// `{base}/r/{resource}/new.json`, with the resource percent-encoded as one segment.
    pub fn listing_url(&self, resource: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::new(FailureKind::InvalidUrl, "base url cannot take a path"))?
            .pop_if_empty()
            .extend(["r", resource, "new.json"]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl FeedClient for ReqwestFeedClient {
    async fn fetch_page(&self, resource: &str, token: &Token) -> Result<FeedPage, FetchError> {
        let url = self.listing_url(resource)?;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .header(USER_AGENT, &self.settings.user_agent)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::new(FailureKind::Unauthorized, status.to_string()));
        }
        if status != StatusCode::OK {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, content_len));
            }
        }

        let rate_limit = read_rate_limit(response.headers());

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, next_len));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FeedPage {
            body: body.freeze(),
            rate_limit,
        })
    }
}

pub fn read_rate_limit(headers: &HeaderMap) -> RateLimitSnapshot {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    RateLimitSnapshot::from_raw(
        value(RATELIMIT_USED),
        value(RATELIMIT_REMAINING),
        value(RATELIMIT_RESET),
    )
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
