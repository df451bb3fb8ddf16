use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use feed_core::{FeedStats, PostsPage};
use feed_engine::{
    ClientCredentialsProvider, EndpointTokenProvider, EngineHandle, FileItemStore, ItemStore,
    ReqwestFeedClient, TokenProvider,
};
use ingest_logging::{ingest_info, ingest_warn};

use crate::config::{AppConfig, TokenSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Poll the feed and persist items until interrupted.
    Run,
    /// Print every stored item as `{ "posts": [...] }`.
    Posts,
    /// Print the most upvoted post and per-author counts.
    Stats,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "run" => Ok(Command::Run),
            "posts" => Ok(Command::Posts),
            "stats" => Ok(Command::Stats),
            other => Err(anyhow!(
                "unknown command {other:?} (expected run, posts or stats)"
            )),
        }
    }
}

pub async fn execute(command: Command, config: &AppConfig) -> Result<()> {
    match command {
        Command::Run => run(config).await,
        Command::Posts => {
            let posts = PostsPage::new(open_store(config).await?.list_all().await?);
            println!("{}", serde_json::to_string_pretty(&posts)?);
            Ok(())
        }
        Command::Stats => {
            let items = open_store(config).await?.list_all().await?;
            let stats = FeedStats::from_items(&items);
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

async fn open_store(config: &AppConfig) -> Result<FileItemStore> {
    FileItemStore::open(&config.store_dir)
        .await
        .with_context(|| format!("failed to open item store {}", config.store_dir.display()))
}

fn token_provider(config: &AppConfig) -> Result<Arc<dyn TokenProvider>> {
    let settings = config.fetch_settings();
    let provider: Arc<dyn TokenProvider> = match &config.token {
        TokenSource::Endpoint { url } => Arc::new(EndpointTokenProvider::new(url, &settings)?),
        TokenSource::ClientCredentials {
            url,
            client_id,
            client_secret,
        } => Arc::new(ClientCredentialsProvider::new(
            url,
            client_id,
            client_secret,
            &settings,
        )?),
    };
    Ok(provider)
}

async fn run(config: &AppConfig) -> Result<()> {
    if !config.polling_enabled {
        ingest_warn!("Polling is disabled in configuration; nothing to run");
        return Ok(());
    }

    let store = Arc::new(open_store(config).await?);
    let client = Arc::new(
        ReqwestFeedClient::new(&config.feed_base_url, config.fetch_settings())
            .context("invalid feed base url")?,
    );
    let provider = token_provider(config)?;

    ingest_info!(
        "Starting ingestion of r/{} into {}",
        config.subreddit,
        store.path().display()
    );
    let engine = EngineHandle::start(config.engine_config(), client, provider, store)
        .await
        .context("failed to start ingestion")?;

    let cancel = engine.cancellation();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ingest_info!("Shutdown requested");
            cancel.cancel();
        }
    });

    let report = engine.join().await?;
    signal.abort();
    ingest_info!(
        "Ingestion stopped: {} saved, {} dropped",
        report.saved,
        report.dropped
    );
    Ok(())
}
