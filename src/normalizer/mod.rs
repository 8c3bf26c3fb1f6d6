use html_escape::decode_html_entities;

use crate::domain::{NewComic, Source};
use crate::sources::{id_to_string, BilibiliComic, KuaikanTopic, RawRecord};

/// Why a raw record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Map a raw catalog record onto the canonical descriptor.
    ///
    /// `native_id`, `title`, `url` and `cover_url` must be non-empty; the
    /// description may be empty.
    pub fn normalize(
        &self,
        source: &Source,
        record: &RawRecord,
    ) -> Result<NewComic, NormalizeError> {
        let base = source.url.trim_end_matches('/');

        let comic = match record {
            RawRecord::Bilibili(raw) => Self::bilibili(source.id, base, raw)?,
            RawRecord::Kuaikan(raw) => Self::kuaikan(source.id, base, raw)?,
        };

        Ok(comic)
    }

    fn bilibili(source_id: i64, base: &str, raw: &BilibiliComic) -> Result<NewComic, NormalizeError> {
        let native_id = raw
            .season_id
            .as_ref()
            .and_then(id_to_string)
            .ok_or(NormalizeError::MissingField("season_id"))?;
        let title = required_text(raw.title.as_deref(), "title")?;
        let cover_url = required_text(raw.vertical_cover.as_deref(), "vertical_cover")?;

        Ok(NewComic {
            source_id,
            url: format!("{}/detail/mc{}", base, native_id),
            native_id,
            title,
            description: optional_text(raw.evaluate.as_deref()),
            cover_url,
        })
    }

    fn kuaikan(source_id: i64, base: &str, raw: &KuaikanTopic) -> Result<NewComic, NormalizeError> {
        let native_id = raw
            .topic_id
            .as_ref()
            .and_then(id_to_string)
            .ok_or(NormalizeError::MissingField("topic_id"))?;
        let title = required_text(raw.title.as_deref(), "title")?;
        let cover_url = required_text(raw.vertical_image_url.as_deref(), "vertical_image_url")?;

        Ok(NewComic {
            source_id,
            url: format!("{}/web/topic/{}/", base, native_id),
            native_id,
            title,
            // Filled in by the adapter once the comic is known to be new.
            description: String::new(),
            cover_url,
        })
    }
}

fn optional_text(value: Option<&str>) -> String {
    value
        .map(|v| decode_html_entities(v.trim()).trim().to_string())
        .unwrap_or_default()
}

fn required_text(value: Option<&str>, field: &'static str) -> Result<String, NormalizeError> {
    let text = optional_text(value);
    if text.is_empty() {
        Err(NormalizeError::MissingField(field))
    } else {
        Ok(text)
    }
}
