#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use feed_core::{Item, RateLimitSnapshot, StoredItem};
use feed_engine::{
    AuthError, FailureKind, FeedClient, FeedPage, FetchError, ItemStore, PersistError, Token,
    TokenProvider,
};
use serde_json::json;

pub fn listing_body(items: &[(&str, &str, i64)]) -> Bytes {
    let children: Vec<_> = items
        .iter()
        .map(|(author, title, score)| {
            json!({ "kind": "t3", "data": { "author": author, "title": title, "score": score } })
        })
        .collect();
    let body = json!({ "kind": "Listing", "data": { "children": children } });
    Bytes::from(body.to_string())
}

pub fn page(items: &[(&str, &str, i64)], remaining: i64, reset_seconds: i64) -> FeedPage {
    FeedPage {
        body: listing_body(items),
        rate_limit: RateLimitSnapshot {
            used: 1,
            remaining,
            reset_seconds,
        },
    }
}

pub fn fetch_error(kind: FailureKind) -> FetchError {
    FetchError::new(kind, "scripted")
}

/// Feed that replays a fixed list of responses and records the tokens it saw.
#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<Result<FeedPage, FetchError>>>,
    seen_tokens: Mutex<Vec<String>>,
}

impl ScriptedFeed {
    pub fn new(responses: Vec<Result<FeedPage, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            seen_tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen_tokens.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl FeedClient for ScriptedFeed {
    async fn fetch_page(&self, _resource: &str, token: &Token) -> Result<FeedPage, FetchError> {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(token.secret().to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(fetch_error(FailureKind::Network)))
    }
}

/// Issues `token-1`, `token-2`, ... and can start failing after a number of calls.
pub struct CountingTokens {
    calls: AtomicUsize,
    succeed_for: usize,
    lifetime: Option<Duration>,
}

impl CountingTokens {
    pub fn new() -> Arc<Self> {
        Self::build(usize::MAX, None)
    }

    pub fn failing_after(successes: usize) -> Arc<Self> {
        Self::build(successes, None)
    }

    pub fn expiring(lifetime: Duration) -> Arc<Self> {
        Self::build(usize::MAX, Some(lifetime))
    }

    fn build(succeed_for: usize, lifetime: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            succeed_for,
            lifetime,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenProvider for CountingTokens {
    async fn acquire_token(&self) -> Result<Token, AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n > self.succeed_for {
            return Err(AuthError::Status(503));
        }
        let secret = format!("token-{n}");
        Ok(match self.lifetime {
            Some(lifetime) => Token::expiring_in(secret, lifetime),
            None => Token::new(secret),
        })
    }
}

/// Store that records saves and fails for configured titles.
#[derive(Default)]
pub struct RecordingStore {
    saved: Mutex<Vec<Item>>,
    attempts: Mutex<Vec<String>>,
    fail_titles: Vec<String>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        })
    }

    pub fn saved(&self) -> Vec<Item> {
        self.saved.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ItemStore for RecordingStore {
    async fn save(&self, item: Item) -> Result<(), PersistError> {
        self.attempts.lock().unwrap().push(item.title.clone());
        if self.fail_titles.contains(&item.title) {
            return Err(PersistError::Unavailable("scripted failure".into()));
        }
        self.saved.lock().unwrap().push(item);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredItem>, PersistError> {
        Ok(self
            .saved()
            .into_iter()
            .enumerate()
            .map(|(i, item)| StoredItem {
                id: i as u64 + 1,
                item,
            })
            .collect())
    }
}
