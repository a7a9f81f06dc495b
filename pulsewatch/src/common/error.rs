//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! 一時的な監視失敗（タイムアウト・接続エラー）はエラーではなく
//! `DOWN` の監視結果として記録されるため、ここには現れない。

use thiserror::Error;
use uuid::Uuid;

/// 監視コアのエラー型
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Endpoint not found
    #[error("Endpoint not found: {0}")]
    EndpointNotFound(Uuid),

    /// Malformed or unsupported endpoint address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for MonitorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for MonitorError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(format!("Failed to run migrations: {}", err))
    }
}

/// 通知配送のエラー型
///
/// 配送失敗はクールダウンを消費しない。
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rejected by the remote API
    #[error("Delivery rejected ({status}): {message}")]
    Rejected {
        /// HTTPステータスコード
        status: u16,
        /// リモートAPIの説明
        message: String,
    },

    /// Transport is not usable (e.g. missing credentials)
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for the monitoring core
pub type MonitorResult<T> = Result<T, MonitorError>;
