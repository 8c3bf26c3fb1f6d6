use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum PanelcastError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from {url}: {detail}")]
    Response { url: String, detail: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("No session credential for source: {0}")]
    CredentialMissing(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Other(String),
}

impl PanelcastError {
    /// Ledger failures end the process: without the store there is no safe
    /// way to know what was already delivered.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Migration(_))
    }
}

pub type Result<T> = std::result::Result<T, PanelcastError>;
