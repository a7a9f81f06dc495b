//! 通知トランスポート

use crate::common::error::TransportError;
use async_trait::async_trait;
use tracing::info;

/// 通知の配送契約
///
/// 配送プロトコルはこの契約の外側に閉じ込める。
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// `destination` にメッセージを送信
    async fn send(&self, destination: &str, text: &str) -> Result<(), TransportError>;
}

/// ログ出力のみのトランスポート
///
/// 認証情報が未設定のときに使用する。
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn send(&self, destination: &str, text: &str) -> Result<(), TransportError> {
        info!(destination = %destination, message = %text, "Status change alert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_transport_always_succeeds() {
        assert!(LogTransport.send("@ops", "hello").await.is_ok());
    }
}
