//! エンドポイントレジストリ
//!
//! 監視コアが外部のレジストリに求める読み取り契約と、
//! SQLiteによる実装を提供する。

use crate::common::error::MonitorResult;
use crate::types::Endpoint;
use async_trait::async_trait;
use uuid::Uuid;

/// SQLite実装
pub mod endpoints;

pub use endpoints::SqliteEndpointRegistry;

/// エンドポイント一覧の読み取り契約
///
/// 呼び出し時点の一時停止・削除状態を反映しなければならない。
#[async_trait]
pub trait EndpointRegistry: Send + Sync {
    /// 一時停止中を含む全エンドポイントを取得
    async fn list_endpoints(&self) -> MonitorResult<Vec<Endpoint>>;
    /// IDでエンドポイントを取得
    async fn get_endpoint(&self, id: Uuid) -> MonitorResult<Option<Endpoint>>;
}

/// 通知先の解決契約
#[async_trait]
pub trait NotificationPreferences: Send + Sync {
    /// エンドポイントに紐づく通知先（空でもよい）
    async fn destinations_for(&self, endpoint: &Endpoint) -> MonitorResult<Vec<String>>;
}
