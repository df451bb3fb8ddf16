mod commands;
mod config;
mod logging;

use anyhow::Result;

use commands::Command;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let command = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => Command::Run,
    };

    let config = AppConfig::load()?;
    logging::initialize(
        config.log_destination,
        ingest_logging::parse_level(&config.log_level),
        &config.log_file,
    );

    commands::execute(command, &config).await
}
