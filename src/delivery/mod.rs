//! Cover download, re-encoding and fan-out to subscribers.

pub mod encode;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::ComicRecord;
use crate::fetcher::{FetchResult, Fetcher};
use crate::transport::{truncate_caption, ChatId, Transport};

const FALLBACK_HEADER: &str = "No cover";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Cover attached as a document
    Delivered,
    /// Cover unavailable, text-only message sent instead
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    /// Subscribers that accepted the message
    pub sent: usize,
    /// Subscribers whose send failed
    pub failed: usize,
}

impl DeliveryReport {
    fn new(outcome: DeliveryOutcome) -> Self {
        Self {
            outcome,
            sent: 0,
            failed: 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.outcome == DeliveryOutcome::Degraded
    }
}

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub subscribers: Vec<ChatId>,
    /// Directory owned exclusively by the pipeline
    pub scratch_dir: PathBuf,
    pub jpeg_quality: u8,
    pub caption_limit: usize,
}

pub struct DeliveryPipeline {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    transport: Arc<dyn Transport>,
    settings: DeliverySettings,
}

impl DeliveryPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        transport: Arc<dyn Transport>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            fetcher,
            transport,
            settings,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.settings.scratch_dir
    }

    /// Send one comic to every subscriber.
    ///
    /// Cover problems degrade to a text message and per-subscriber send
    /// failures are only counted; an `Err` means the pipeline itself broke
    /// (e.g. the scratch directory is unwritable). The staged cover file is
    /// gone when this returns, whatever the outcome.
    pub async fn deliver(&self, comic: &ComicRecord) -> Result<DeliveryReport> {
        let (cover, content_type) = match self.fetcher.fetch(&comic.cover_url).await {
            Ok(FetchResult::Content { body, content_type }) => (body, content_type),
            Ok(FetchResult::Status(status)) => {
                warn!("Cover for {} returned HTTP {}", comic.title, status);
                return Ok(self.send_fallback(comic).await);
            }
            Err(e) => {
                warn!("Could not download cover for {}: {}", comic.title, e);
                return Ok(self.send_fallback(comic).await);
            }
        };

        if let Some(ref content_type) = content_type {
            if !is_image_type(content_type) {
                warn!(
                    "Cover for {} is not an image ({}), sending text instead",
                    comic.title, content_type
                );
                return Ok(self.send_fallback(comic).await);
            }
        }

        // Removed on drop, including on early returns and errors below.
        let staged = self.stage(&cover)?;
        let document = match encode::reencode_file(staged.path(), self.settings.jpeg_quality) {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "Could not re-encode cover for {} ({}, {} bytes): {}",
                    comic.title,
                    content_type.as_deref().unwrap_or("no content type"),
                    cover.len(),
                    e
                );
                return Ok(self.send_fallback(comic).await);
            }
        };
        debug!(
            "Cover for {} re-encoded: {} -> {} bytes",
            comic.title,
            cover.len(),
            document.len()
        );

        let caption = truncate_caption(&comic.caption(), self.settings.caption_limit);
        let file_name = comic.cover_file_name();
        let mut report = DeliveryReport::new(DeliveryOutcome::Delivered);

        for &chat_id in &self.settings.subscribers {
            match self
                .transport
                .send_document(chat_id, &file_name, document.clone(), &caption)
                .await
            {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to send {} to {}: {}", comic.title, chat_id, e);
                }
            }
        }

        info!(
            "Delivered {} to {}/{} subscribers",
            comic.title,
            report.sent,
            self.settings.subscribers.len()
        );
        Ok(report)
    }

    /// Remove everything left in the scratch directory, e.g. by a process
    /// killed mid-delivery. Returns how many files were removed.
    pub fn sweep_scratch_dir(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.settings.scratch_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Swept {} stray files from scratch directory", removed);
        }
        Ok(removed)
    }

    fn stage(&self, bytes: &[u8]) -> Result<NamedTempFile> {
        fs::create_dir_all(&self.settings.scratch_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("cover-")
            .suffix(".img")
            .tempfile_in(&self.settings.scratch_dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(file)
    }

    async fn send_fallback(&self, comic: &ComicRecord) -> DeliveryReport {
        let text = truncate_caption(
            &format!("{}\n{}", FALLBACK_HEADER, comic.caption()),
            self.settings.caption_limit,
        );
        let mut report = DeliveryReport::new(DeliveryOutcome::Degraded);

        for &chat_id in &self.settings.subscribers {
            match self.transport.send_text(chat_id, &text).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to send fallback for {} to {}: {}", comic.title, chat_id, e);
                }
            }
        }

        report
    }
}

/// CDNs sometimes answer 200 with an HTML challenge page. Generic binary
/// types are still given to the decoder.
fn is_image_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("image/")
        || mime == "application/octet-stream"
        || mime == "binary/octet-stream"
}
