//! Fakes for the seam traits, shared by unit tests.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::app::{PanelcastError, Result};
use crate::credential::TokenProvider;
use crate::domain::{NewComic, SessionCredential, SourceKind};
use crate::fetcher::{FetchResult, Fetcher};
use crate::sources::{RawRecord, SourceAdapter};
use crate::transport::{ChatId, Transport};

/// A small RGBA PNG, which forces a color-mode conversion on re-encode.
pub fn png_cover() -> Vec<u8> {
    let image = RgbaImage::from_pixel(8, 12, image::Rgba([200, 40, 40, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: ChatId,
        text: String,
    },
    Document {
        chat_id: ChatId,
        file_name: String,
        bytes: Vec<u8>,
        caption: String,
        /// Files present in the watched directory while sending
        staged_files: usize,
    },
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failing: HashSet<ChatId>,
    watch_dir: Option<PathBuf>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(chat_ids: &[ChatId]) -> Arc<Self> {
        Arc::new(Self {
            failing: chat_ids.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn watching(dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            watch_dir: Some(dir),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat_id: id, text } if id == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn documents(&self) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Document { .. }))
            .count()
    }

    fn staged_files(&self) -> usize {
        self.watch_dir
            .as_ref()
            .and_then(|dir| std::fs::read_dir(dir).ok())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    fn outcome(&self, chat_id: ChatId) -> Result<()> {
        if self.failing.contains(&chat_id) {
            Err(PanelcastError::Transport(format!("chat {} blocked the bot", chat_id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.outcome(chat_id)?;
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        self.outcome(chat_id)?;
        let staged_files = self.staged_files();
        self.sent.lock().unwrap().push(Sent::Document {
            chat_id,
            file_name: file_name.to_string(),
            bytes,
            caption: caption.to_string(),
            staged_files,
        });
        Ok(())
    }
}

/// Answers every cover request the same way.
pub enum StaticFetcher {
    Cover(Vec<u8>),
    /// 200 with an HTML body, as an anti-bot wall would answer
    Page(&'static str),
    Status(u16),
    Unreachable,
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchResult> {
        match self {
            Self::Cover(bytes) => Ok(FetchResult::Content {
                body: bytes.clone(),
                content_type: Some("image/png".into()),
            }),
            Self::Page(html) => Ok(FetchResult::Content {
                body: html.as_bytes().to_vec(),
                content_type: Some("text/html; charset=utf-8".into()),
            }),
            Self::Status(code) => Ok(FetchResult::Status(*code)),
            Self::Unreachable => Err(PanelcastError::Other("connection reset".into())),
        }
    }
}

/// Adapter serving a fixed catalog, or failing.
pub struct FakeSource {
    kind: SourceKind,
    records: Mutex<Vec<RawRecord>>,
    fail: bool,
    fetches: AtomicUsize,
    enriched: AtomicUsize,
    seen_tokens: Mutex<Vec<Option<String>>>,
}

impl FakeSource {
    pub fn new(kind: SourceKind, records: Vec<RawRecord>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            records: Mutex::new(records),
            fail: false,
            fetches: AtomicUsize::new(0),
            enriched: AtomicUsize::new(0),
            seen_tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(kind: SourceKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            records: Mutex::new(Vec::new()),
            fail: true,
            fetches: AtomicUsize::new(0),
            enriched: AtomicUsize::new(0),
            seen_tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn set_records(&self, records: Vec<RawRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn enriched(&self) -> usize {
        self.enriched.load(Ordering::SeqCst)
    }

    pub fn seen_tokens(&self) -> Vec<Option<String>> {
        self.seen_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch_catalog(
        &self,
        credential: Option<&SessionCredential>,
    ) -> Result<Vec<RawRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens
            .lock()
            .unwrap()
            .push(credential.map(|c| c.token.clone()));
        if self.fail {
            return Err(PanelcastError::Other(format!("{} is down", self.kind.name())));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn enrich(&self, comic: &mut NewComic) -> Result<()> {
        self.enriched.fetch_add(1, Ordering::SeqCst);
        if comic.description.is_empty() {
            comic.description = "Enriched.".into();
        }
        Ok(())
    }
}

pub struct FakeTokenProvider {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeTokenProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for FakeTokenProvider {
    async fn fetch_fresh_token(&self) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            Err(PanelcastError::Other("buvid endpoint down".into()))
        } else {
            Ok(format!("fresh-{}", n))
        }
    }
}
