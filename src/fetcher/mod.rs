pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

#[derive(Debug)]
pub enum FetchResult {
    /// Body of a successful response
    Content {
        body: Vec<u8>,
        content_type: Option<String>,
    },
    /// Server answered with a non-success status
    Status(u16),
}

/// Plain GET of a binary resource such as a cover image.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult>;
}
