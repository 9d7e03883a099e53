use anyhow::Result;
use clap::Parser;
use compose_assist::cli::{Cli, CliHandler};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set log level based on debug flag
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let handler = CliHandler::new(&cli).await?;
    handler.handle_command(cli.command).await
}
