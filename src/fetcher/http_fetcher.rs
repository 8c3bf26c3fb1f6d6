use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::{FetchResult, Fetcher};

/// Build the client every outbound call goes through: bounded timeout,
/// compressed transfer and a browser user agent.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout, user_agent)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(FetchResult::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.bytes().await?.to_vec();

        Ok(FetchResult::Content { body, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), "panelcast-test").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/jpeg"))
            .mount(&server)
            .await;

        let result = fetcher()
            .fetch(&format!("{}/cover.jpg", server.uri()))
            .await
            .unwrap();

        match result {
            FetchResult::Content { body, content_type } => {
                assert_eq!(body, vec![1, 2, 3]);
                assert_eq!(content_type.as_deref(), Some("image/jpeg"));
            }
            other => panic!("expected content, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = fetcher()
            .fetch(&format!("{}/missing.jpg", server.uri()))
            .await
            .unwrap();
        assert!(matches!(result, FetchResult::Status(404)));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_millis(200), "panelcast-test").unwrap();
        let result = fetcher.fetch(&format!("{}/slow.jpg", server.uri())).await;
        assert!(result.is_err());
    }
}
