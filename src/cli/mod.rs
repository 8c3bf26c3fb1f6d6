pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "panelcast")]
#[command(about = "Announces new comics from Chinese comic platforms to Telegram", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/panelcast/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and seed sources
    Init,
    /// Poll sources and deliver new comics until stopped
    Run {
        /// Poll interval (e.g., "5m", "1h", "1d"); defaults to the config value
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the cycle on start
        #[arg(long)]
        no_initial_update: bool,

        /// Log file path (default: stdout)
        #[arg(short, long)]
        log: Option<PathBuf>,
    },
    /// Run a single poll cycle
    Once,
    /// List delivered comics, newest first
    List {
        /// Only comics from this source (e.g., "Bilibili")
        #[arg(short, long)]
        source: Option<String>,

        /// Maximum number of comics to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Show sources, comic counts and credential age
    Status,
}

impl Commands {
    pub fn log_file(&self) -> Option<&PathBuf> {
        match self {
            Self::Run { log, .. } => log.as_ref(),
            _ => None,
        }
    }
}
