//! エンドポイントプローブ
//!
//! 単一エンドポイントに1回だけリクエストを送り、稼働状態を分類する。
//!
//! - 応答を受信した場合はステータスコードで UP/DOWN を判定し、
//!   `detail` に `Status code: <code>` を記録する
//! - タイムアウト・DNS失敗・接続拒否・TLS失敗はすべて DOWN の結果として返す
//! - 呼び出し側にエラーを返すことはない

use crate::common::error::MonitorError;
use crate::types::Outcome;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::debug;

/// プローブ実行の抽象化
///
/// 実装は失敗を含むすべての結果を値として返さなければならない。
#[async_trait]
pub trait Probe: Send + Sync {
    /// `address` に対して1回の稼働確認を行う
    async fn probe(&self, address: &str, timeout: Duration) -> Outcome;
}

/// HTTP(S) プローバー
#[derive(Clone)]
pub struct HttpProber {
    /// HTTPクライアント（タイムアウトはプローブ単位で適用する）
    client: Client,
}

impl HttpProber {
    /// 新しいプローバーを作成
    pub fn new() -> Result<Self, MonitorError> {
        let client = Client::builder()
            .user_agent(concat!("pulsewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, address: &str, timeout: Duration) -> Outcome {
        let start = Instant::now();
        let deadline = tokio::time::Instant::from_std(start + timeout);

        // タイムアウト時は送信中のフューチャーを破棄してリクエストを中断する
        let response = match tokio::time::timeout(timeout, self.client.get(address).send()).await
        {
            Err(_) => return Outcome::down(timeout_detail(timeout)),
            Ok(Err(e)) => return Outcome::down(describe_error(&e)),
            Ok(Ok(response)) => response,
        };

        let latency_ms = u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX);
        let code = response.status().as_u16();

        drain_body(response, deadline, address).await;

        Outcome::from_response(code, latency_ms)
    }
}

/// レスポンスボディを読み捨てて接続を解放する
///
/// 判定には影響しない。期限を過ぎた場合はボディを破棄する。
async fn drain_body(mut response: reqwest::Response, deadline: tokio::time::Instant, address: &str) {
    let drained = tokio::time::timeout_at(deadline, async {
        loop {
            match response.chunk().await {
                Ok(Some(_)) => continue,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        }
    })
    .await;

    match drained {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(address = %address, error = %e, "Failed to drain response body"),
        Err(_) => debug!(address = %address, "Response body drain timed out"),
    }
}

/// タイムアウト時の detail 文字列
fn timeout_detail(timeout: Duration) -> String {
    format!("Request timed out after {} seconds.", format_secs(timeout))
}

/// 秒数を表示用に整形（整数秒は小数部なし）
fn format_secs(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        duration.as_secs_f64().to_string()
    }
}

/// エラーと原因チェーンを1行のメッセージにまとめる
fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
