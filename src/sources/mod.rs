//! Catalog adapters, one per source site.
//!
//! An adapter only talks to its site and hands back raw records; turning
//! them into [`NewComic`](crate::domain::NewComic) is the normalizer's job.

mod bilibili;
mod kuaikan;

pub use bilibili::{BilibiliComic, BilibiliSource, BilibiliTokenProvider};
pub use kuaikan::{KuaikanSource, KuaikanTopic};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::app::Result;
use crate::config::SourcesConfig;
use crate::domain::{NewComic, SessionCredential, SourceKind};

/// A catalog entry exactly as its site returned it.
#[derive(Debug, Clone)]
pub enum RawRecord {
    Bilibili(BilibiliComic),
    Kuaikan(KuaikanTopic),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch the newest catalog page. Credentialed sources fail without a
    /// credential; the rest ignore it.
    async fn fetch_catalog(&self, credential: Option<&SessionCredential>)
        -> Result<Vec<RawRecord>>;

    /// Fill in details the catalog listing lacks. Only called for comics
    /// that are not yet in the ledger.
    async fn enrich(&self, _comic: &mut NewComic) -> Result<()> {
        Ok(())
    }
}

/// All adapters, in polling order.
pub fn build_sources(
    config: &SourcesConfig,
    client: Client,
) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for kind in SourceKind::ALL {
        let base_url = config.base_url(kind);
        let adapter: Arc<dyn SourceAdapter> = match kind {
            SourceKind::Bilibili => Arc::new(BilibiliSource::new(client.clone(), base_url)?),
            SourceKind::Kuaikan => Arc::new(KuaikanSource::new(client.clone(), base_url)?),
        };
        sources.push(adapter);
    }
    Ok(sources)
}

/// Decode catalog entries one at a time, so a malformed entry is logged
/// and skipped instead of failing the whole page.
pub(crate) fn decode_entries<T: DeserializeOwned>(
    kind: SourceKind,
    entries: Vec<serde_json::Value>,
) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Dropped malformed {} catalog entry: {}", kind.name(), e);
                None
            }
        })
        .collect()
}

/// Catalog ids arrive as numbers or strings depending on the endpoint.
pub(crate) fn id_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
