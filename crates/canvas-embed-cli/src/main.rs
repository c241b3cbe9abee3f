use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use canvas_embed_cli::{
    cli::{Cli, Commands},
    commands::{self, CliContext},
};
use canvas_embed_config::{ConfigLoader, EmbedConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    init_logging(&cli, &config);
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Export { canvas, nodes } => {
            let ctx = CliContext::new(&cli.kiln, config)?;
            commands::export::execute(ctx, canvas, nodes).await
        }
        Commands::Append {
            canvas,
            target,
            nodes,
        } => {
            let ctx = CliContext::new(&cli.kiln, config)?;
            commands::append::execute(ctx, canvas, target, nodes).await
        }
        Commands::CopyLink { canvas, node_id } => {
            let ctx = CliContext::new(&cli.kiln, config)?;
            commands::copy_link::execute(ctx, canvas, node_id).await
        }
        Commands::Render { note } => {
            let ctx = CliContext::new(&cli.kiln, config)?;
            commands::render::execute(ctx, note).await
        }
        Commands::Commands { active, selected } => commands::list::execute(active, selected).await,
    }
}

/// `--verbose` wins over `--log-level`, which wins over the config file.
/// `RUST_LOG` directives are layered on top.
fn init_logging(cli: &Cli, config: &EmbedConfig) {
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else if let Some(level) = cli.log_level {
        level.into()
    } else {
        config.logging.level.parse().unwrap_or(LevelFilter::WARN)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}
