//! Runtime configuration for `feed_app`.
//!
//! Read from an optional RON file, then overridden from the environment so
//! that client secrets never need to live in the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use feed_core::DelayPolicy;
use feed_engine::{EngineConfig, FetchSettings, PollSettings};
use serde::Deserialize;

pub const CONFIG_ENV: &str = "FEED_INGEST_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "feed_ingest.ron";
const DEFAULT_ACCESS_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum TokenSource {
    /// A token service answering `GET` with `{ "access_token": ... }`.
    Endpoint { url: String },
    ClientCredentials {
        url: String,
        client_id: String,
        client_secret: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LogDestination {
    File,
    Terminal,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub subreddit: String,
    pub base_delay_secs: u64,
    pub polling_enabled: bool,
    pub feed_base_url: String,
    pub user_agent: String,
    pub token: TokenSource,
    pub store_dir: PathBuf,
    pub channel_capacity: usize,
    pub dispatch_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_page_bytes: u64,
    pub log_destination: LogDestination,
    pub log_level: String,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            subreddit: "golang".to_string(),
            base_delay_secs: 2,
            polling_enabled: true,
            feed_base_url: "https://oauth.reddit.com".to_string(),
            user_agent: "feed-ingest/0.1".to_string(),
            token: TokenSource::Endpoint {
                url: "http://localhost:8081/auth".to_string(),
            },
            store_dir: PathBuf::from("./data"),
            channel_capacity: 256,
            dispatch_timeout_secs: 30,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            max_page_bytes: 4 * 1024 * 1024,
            log_destination: LogDestination::Terminal,
            log_level: "info".to_string(),
            log_file: PathBuf::from("./feed_ingest.log"),
        }
    }
}

impl AppConfig {
    /// Loads the config file named by `FEED_INGEST_CONFIG` (or the default
    /// file when present), then applies environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(subreddit) = lookup("FEED_SUBREDDIT") {
            self.subreddit = subreddit;
        }
        let id = lookup("FEED_CLIENT_ID");
        let secret = lookup("FEED_CLIENT_SECRET");
        match &mut self.token {
            TokenSource::ClientCredentials {
                client_id,
                client_secret,
                ..
            } => {
                if let Some(id) = id {
                    *client_id = id;
                }
                if let Some(secret) = secret {
                    *client_secret = secret;
                }
            }
            TokenSource::Endpoint { .. } => {
                if let (Some(client_id), Some(client_secret)) = (id, secret) {
                    self.token = TokenSource::ClientCredentials {
                        url: DEFAULT_ACCESS_TOKEN_URL.to_string(),
                        client_id,
                        client_secret,
                    };
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.subreddit.trim().is_empty() {
            bail!("subreddit must not be empty");
        }
        if self.base_delay_secs == 0 {
            bail!("base_delay_secs must be at least 1");
        }
        if self.channel_capacity == 0 {
            bail!("channel_capacity must be positive");
        }
        if let TokenSource::ClientCredentials {
            client_id,
            client_secret,
            ..
        } = &self.token
        {
            if client_id.is_empty() || client_secret.is_empty() {
                bail!("client credentials require both client_id and client_secret");
            }
        }
        Ok(())
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_page_bytes,
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let poll = PollSettings {
            resource: self.subreddit.clone(),
            policy: DelayPolicy::new(Duration::from_secs(self.base_delay_secs)),
            dispatch_timeout: Duration::from_secs(self.dispatch_timeout_secs),
        };
        EngineConfig {
            poll,
            channel_capacity: self.channel_capacity,
        }
    }
}
