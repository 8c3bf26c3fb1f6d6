use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::app::{PanelcastError, Result};
use crate::domain::{NewComic, SessionCredential, SourceKind};
use crate::sources::{decode_entries, RawRecord, SourceAdapter};

const FILTER_PATH: &str = "/search/mini/topic/multi_filter";
const NO_DESCRIPTION: &str = "No description.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KuaikanTopic {
    pub topic_id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub vertical_image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterResponse {
    #[serde(default)]
    hits: FilterHits,
}

#[derive(Debug, Default, Deserialize)]
struct FilterHits {
    #[serde(default, rename = "topicMessageList")]
    topic_message_list: Vec<serde_json::Value>,
}

/// Recently updated, free, ongoing topics on kuaikanmanhua.com.
pub struct KuaikanSource {
    client: Client,
    base_url: Url,
}

impl KuaikanSource {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Synopsis from a topic page: the first paragraph of `div.detailsBox`.
    pub fn extract_description(html: &str) -> Result<String> {
        let selector = Selector::parse("div.detailsBox p")
            .map_err(|e| PanelcastError::Other(format!("invalid selector: {}", e)))?;
        let document = Html::parse_document(html);

        let description = document
            .select(&selector)
            .next()
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        Ok(description)
    }
}

#[async_trait]
impl SourceAdapter for KuaikanSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Kuaikan
    }

    async fn fetch_catalog(
        &self,
        _credential: Option<&SessionCredential>,
    ) -> Result<Vec<RawRecord>> {
        let mut url = self.base_url.join(FILTER_PATH)?;
        url.query_pairs_mut().extend_pairs([
            ("page", "1"),
            ("size", "48"),
            ("tag_id", "0"),
            ("update_status", "1"),
            ("pay_status", "0"),
            ("label_dimension_origin", "1"),
            ("sort", "3"),
        ]);

        let response = self.client.get(url).send().await?.error_for_status()?;

        let body: FilterResponse = response.json().await?;
        let entries = body.hits.topic_message_list;
        tracing::debug!("Kuaikan returned {} catalog entries", entries.len());

        let topics: Vec<KuaikanTopic> = decode_entries(SourceKind::Kuaikan, entries);
        Ok(topics.into_iter().map(RawRecord::Kuaikan).collect())
    }

    async fn enrich(&self, comic: &mut NewComic) -> Result<()> {
        if !comic.description.is_empty() {
            return Ok(());
        }

        let html = self
            .client
            .get(&comic.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        comic.description = Self::extract_description(&html)?;
        Ok(())
    }
}
