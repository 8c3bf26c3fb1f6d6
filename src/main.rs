use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use panelcast::app::AppContext;
use panelcast::cli::{commands, Cli, Commands};
use panelcast::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_file = match cli.command.log_file() {
        Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
        None => None,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("panelcast=info"));
    let (stdout_layer, file_layer) = match log_file {
        Some(file) => (
            None,
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
        ),
        None => (Some(fmt::layer()), None),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.database = Some(db);
    }

    let ctx = Arc::new(AppContext::new(config)?);

    match cli.command {
        Commands::Init => {
            commands::init(&ctx)?;
        }
        Commands::Run {
            interval,
            no_initial_update,
            ..
        } => {
            commands::run(ctx, interval.as_deref(), no_initial_update).await?;
        }
        Commands::Once => {
            commands::once(ctx).await?;
        }
        Commands::List { source, limit } => {
            commands::list_comics(&ctx, source.as_deref(), limit)?;
        }
        Commands::Status => {
            commands::status(&ctx)?;
        }
    }

    Ok(())
}
