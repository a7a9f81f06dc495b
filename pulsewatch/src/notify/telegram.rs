//! Telegram Bot API トランスポート
//!
//! `POST {api}/bot<token>/sendMessage` で `chat_id` に送信する。

use super::transport::NotificationTransport;
use crate::common::error::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Telegram API 呼び出しのタイムアウト（秒）
const TELEGRAM_TIMEOUT_SECS: u64 = 10;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram トランスポート
#[derive(Clone)]
pub struct TelegramTransport {
    client: Client,
    api_url: String,
    bot_token: String,
}

impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // トークンは出力しない
        f.debug_struct("TelegramTransport")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TelegramTransport {
    /// 新しいトランスポートを作成
    pub fn new(
        api_url: impl Into<String>,
        bot_token: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TELEGRAM_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl NotificationTransport for TelegramTransport {
    async fn send(&self, destination: &str, text: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.send_message_url())
            .json(&SendMessageRequest {
                chat_id: destination,
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await
            // URLにトークンが含まれるためエラーから取り除く
            .map_err(|e| TransportError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .json::<TelegramResponse>()
            .await
            .map_err(|e| TransportError::Http(e.without_url()));

        match body {
            Ok(body) if status.is_success() && body.ok => Ok(()),
            Ok(body) => Err(TransportError::Rejected {
                status: status.as_u16(),
                message: body
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
            Err(_) if !status.is_success() => Err(TransportError::Rejected {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_posts_chat_message() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST-TOKEN/sendMessage"))
            .and(body_partial_json(json!({"chat_id": "@ops", "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
            .expect(1)
            .mount(&mock)
            .await;

        let transport = TelegramTransport::new(mock.uri(), "TEST-TOKEN").unwrap();
        transport.send("@ops", "hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_rejected_by_api() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .mount(&mock)
            .await;

        let transport = TelegramTransport::new(mock.uri(), "TEST-TOKEN").unwrap();
        let err = transport.send("@missing", "hello").await.unwrap_err();

        match err {
            TransportError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Bad Request: chat not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_server_error_without_json() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock)
            .await;

        let transport = TelegramTransport::new(mock.uri(), "TEST-TOKEN").unwrap();
        let err = transport.send("@ops", "hello").await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected { status: 502, .. }));
    }

    #[test]
    fn test_debug_hides_token() {
        let transport = TelegramTransport::new("https://api.telegram.org", "SECRET").unwrap();
        assert!(!format!("{:?}", transport).contains("SECRET"));
    }
}
