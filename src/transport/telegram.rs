use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::app::{PanelcastError, Result};
use crate::transport::{ChatId, Transport};

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramTransport {
    client: Client,
    /// `<api_url>/bot<token>`
    endpoint: String,
}

impl TelegramTransport {
    pub fn new(client: Client, api_url: &str, bot_token: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    /// The Bot API reports failures as `{"ok": false, "description": ...}`,
    /// usually alongside a 4xx status.
    async fn check(method: &str, response: Response) -> Result<()> {
        let status = response.status();
        let body: ApiResponse = response.json().await.map_err(|e| e.without_url())?;

        if body.ok {
            Ok(())
        } else {
            Err(PanelcastError::Transport(format!(
                "{} failed ({}): {}",
                method,
                status.as_u16(),
                body.description.unwrap_or_else(|| "no description".into())
            )))
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        // URLs carry the bot token, so they are stripped from errors.
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| e.without_url())?;

        Self::check("sendMessage", response).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        let document = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")?;

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", document);

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.without_url())?;

        Self::check("sendDocument", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> TelegramTransport {
        TelegramTransport::new(Client::new(), &server.uri(), "123:ABC")
    }

    #[tokio::test]
    async fn test_send_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_json(json!({"chat_id": 42, "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
            .expect(1)
            .mount(&server)
            .await;

        transport(&server).send_text(42, "hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_text_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let err = transport(&server).send_text(7, "hi").await.unwrap_err();
        match err {
            PanelcastError::Transport(msg) => assert!(msg.contains("chat not found")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_document_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendDocument"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
            .expect(1)
            .mount(&server)
            .await;

        transport(&server)
            .send_document(42, "28284.jpg", vec![0xFF, 0xD8, 0xFF], "Spring Tide")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"document\"; filename=\"28284.jpg\""));
        assert!(body.contains("Spring Tide"));
        assert!(body.contains("name=\"chat_id\""));
    }

    #[tokio::test]
    async fn test_errors_hide_token() {
        // Nothing listens on this port.
        let transport = TelegramTransport::new(Client::new(), "http://127.0.0.1:9", "SECRET");
        let err = transport.send_text(1, "hi").await.unwrap_err();
        assert!(!err.to_string().contains("SECRET"));
    }
}
