use async_trait::async_trait;
use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::app::{PanelcastError, Result};
use crate::credential::TokenProvider;
use crate::domain::{SessionCredential, SourceKind};
use crate::sources::{decode_entries, RawRecord, SourceAdapter};

const CLASS_PAGE_PATH: &str = "/twirp/comic.v1.Comic/ClassPage";
const BUVID_PATH: &str = "/ductape/buvid";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BilibiliComic {
    pub season_id: Option<serde_json::Value>,
    pub title: Option<String>,
    /// Short blurb shown on the catalog card.
    pub evaluate: Option<String>,
    pub vertical_cover: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClassPageResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BuvidResponse {
    data: Option<BuvidData>,
}

#[derive(Debug, Deserialize)]
struct BuvidData {
    buvid3: Option<String>,
}

/// Newest-first catalog of manga.bilibili.com. Requests are signed with a
/// `buvid3` cookie.
pub struct BilibiliSource {
    client: Client,
    base_url: Url,
}

impl BilibiliSource {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for BilibiliSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Bilibili
    }

    async fn fetch_catalog(
        &self,
        credential: Option<&SessionCredential>,
    ) -> Result<Vec<RawRecord>> {
        let credential = credential
            .ok_or_else(|| PanelcastError::CredentialMissing(SourceKind::Bilibili.name().into()))?;
        let url = self.base_url.join(CLASS_PAGE_PATH)?;

        let query = json!({
            "style_id": -1,
            "area_id": -1,
            "is_finish": -1,
            "order": 3,
            "special_tag": 0,
            "page_num": 1,
            "page_size": 30,
            "is_free": -1,
        });

        let response = self
            .client
            .post(url.clone())
            .header(COOKIE, credential.cookie())
            .header(USER_AGENT, &credential.user_agent)
            .json(&query)
            .send()
            .await?
            .error_for_status()?;

        let page: ClassPageResponse = response.json().await?;
        if page.code != 0 {
            return Err(PanelcastError::Response {
                url: url.to_string(),
                detail: format!("code {}: {}", page.code, page.msg),
            });
        }

        tracing::debug!("Bilibili returned {} catalog entries", page.data.len());
        let comics: Vec<BilibiliComic> = decode_entries(SourceKind::Bilibili, page.data);
        Ok(comics.into_iter().map(RawRecord::Bilibili).collect())
    }
}

/// Mints a fresh `buvid3` session token.
pub struct BilibiliTokenProvider {
    client: Client,
    base_url: Url,
    user_agent: String,
}

impl BilibiliTokenProvider {
    pub fn new(client: Client, base_url: &str, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl TokenProvider for BilibiliTokenProvider {
    async fn fetch_fresh_token(&self) -> Result<String> {
        let url = self.base_url.join(BUVID_PATH)?;

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?;

        let body: BuvidResponse = response.json().await?;
        body.data
            .and_then(|d| d.buvid3)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| PanelcastError::Response {
                url: url.to_string(),
                detail: "missing data.buvid3".into(),
            })
    }
}
