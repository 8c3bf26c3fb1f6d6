//! Outbound messaging.
//!
//! - [`Transport`]: send a text or a document to one chat
//! - [`TelegramTransport`](telegram::TelegramTransport): Bot API over reqwest

pub mod telegram;

use async_trait::async_trait;

use crate::app::Result;

pub use telegram::TelegramTransport;

/// Telegram chat identifier.
pub type ChatId = i64;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()>;
}

/// Cut `text` to at most `limit` characters without splitting a character.
pub fn truncate_caption(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
