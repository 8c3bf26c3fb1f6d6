use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{PanelcastError, Result};
use crate::config::Config;
use crate::credential::{CredentialManager, TokenProvider};
use crate::delivery::{DeliveryPipeline, DeliverySettings};
use crate::domain::{Source, SourceKind};
use crate::fetcher::http_fetcher::{build_client, HttpFetcher};
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::sources::{build_sources, BilibiliTokenProvider, SourceAdapter};
use crate::store::sqlite::SqliteStore;
use crate::store::Store;
use crate::transport::{ChatId, TelegramTransport, Transport};

/// Everything a cycle needs, built once at startup and shared by reference.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    /// Adapters in polling order
    pub sources: Vec<Arc<dyn SourceAdapter>>,
    pub credentials: CredentialManager,
    pub normalizer: Normalizer,
    pub transport: Arc<dyn Transport>,
    pub delivery: DeliveryPipeline,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = Self::prepare_db_path(&config)?;
        let store = Arc::new(SqliteStore::new(&db_path)?);

        let client = build_client(config.poll.http_timeout(), &config.sources.user_agent)?;
        let sources = build_sources(&config.sources, client.clone())?;
        let token_provider: Arc<dyn TokenProvider> = Arc::new(BilibiliTokenProvider::new(
            client.clone(),
            &config.sources.bilibili_url,
            &config.sources.user_agent,
        )?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::with_client(client.clone()));
        let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(
            client,
            &config.telegram.api_url,
            &config.telegram.bot_token,
        ));

        Self::from_parts(config, store, sources, token_provider, fetcher, transport)
    }

    /// Assemble a context from explicit components.
    pub fn from_parts(
        config: Config,
        store: Arc<SqliteStore>,
        sources: Vec<Arc<dyn SourceAdapter>>,
        token_provider: Arc<dyn TokenProvider>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let credentials = CredentialManager::new(token_provider, config.poll.fetch_timeout());
        let delivery = DeliveryPipeline::new(
            fetcher,
            transport.clone(),
            DeliverySettings {
                subscribers: config.telegram.subscribers.clone(),
                scratch_dir: config.scratch_dir()?,
                jpeg_quality: config.delivery.jpeg_quality,
                caption_limit: config.delivery.caption_limit,
            },
        );

        Ok(Self {
            config,
            store,
            sources,
            credentials,
            normalizer: Normalizer::new(),
            transport,
            delivery,
        })
    }

    /// Seed sources and credentials on first run. Returns whether anything
    /// was seeded.
    pub fn bootstrap(&self) -> Result<bool> {
        let seeded = self
            .store
            .initialize(&self.config.sources.seeds(), &self.config.sources.user_agent)?;
        if seeded {
            tracing::info!("Ledger initialized with {} sources", SourceKind::ALL.len());
        }
        Ok(seeded)
    }

    pub fn source(&self, kind: SourceKind) -> Result<Source> {
        self.store
            .get_source(kind.name())?
            .ok_or_else(|| PanelcastError::SourceNotFound(kind.name().to_string()))
    }

    pub fn operator_id(&self) -> Option<ChatId> {
        self.config.telegram.operator_id
    }

    fn prepare_db_path(config: &Config) -> Result<PathBuf> {
        let db_path = config.database_path()?;
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(db_path)
    }
}
