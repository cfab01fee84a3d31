mod args;
mod commands;

use crate::args::ZoylaArgs;
use clap::Parser;
use tracing::{debug, info};
use zoyla_runner::configs::config_provider::{ConfigProvider, FileConfigProvider};
use zoyla_runner::error::RunnerError;
use zoyla_runner::logging::Logging;

#[tokio::main]
async fn main() -> Result<(), RunnerError> {
    let args = ZoylaArgs::parse();
    let config = FileConfigProvider::new(args.config.clone())
        .load_config()
        .await?;
    let logging = Logging::init(&config.logging)?;
    debug!("Using config: {config}");
    if logging.has_file_output() {
        info!("Writing logs to {:?}", config.logging.directory);
    }

    commands::handle(args.command, config).await
}
