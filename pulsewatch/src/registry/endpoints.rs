//! SQLiteベースのエンドポイントレジストリ
//!
//! 一覧はキャッシュせず、呼び出しのたびにDBから読み込む。

use super::{EndpointRegistry, NotificationPreferences};
use crate::common::error::{MonitorError, MonitorResult};
use crate::db::endpoints as db;
use crate::store::ObservationStore;
use crate::types::Endpoint;
use async_trait::async_trait;
use reqwest::Url;
use tracing::info;
use uuid::Uuid;

/// SQLiteベースのエンドポイントレジストリ
#[derive(Clone)]
pub struct SqliteEndpointRegistry {
    /// 監視結果ストア（削除時のカスケードに使用）
    store: ObservationStore,
}

impl SqliteEndpointRegistry {
    /// ストアと同じDBを使うレジストリを作成
    pub fn new(store: ObservationStore) -> Self {
        Self { store }
    }

    /// エンドポイントを登録
    ///
    /// http/https 以外や不正なURIはここで拒否し、監視コアには渡さない。
    pub async fn register(&self, address: &str) -> MonitorResult<Endpoint> {
        let address = validate_address(address)?;
        let endpoint = Endpoint::new(address);
        db::create_endpoint(self.store.pool(), &endpoint).await?;

        info!(
            endpoint_id = %endpoint.id,
            address = %endpoint.address,
            "Endpoint registered"
        );

        Ok(endpoint)
    }

    /// 一時停止・再開
    pub async fn set_paused(&self, id: Uuid, paused: bool) -> MonitorResult<()> {
        if !db::set_paused(self.store.pool(), id, paused).await? {
            return Err(MonitorError::EndpointNotFound(id));
        }
        info!(endpoint_id = %id, paused = paused, "Endpoint pause state changed");
        Ok(())
    }

    /// エンドポイントを削除（監視結果・通知先もまとめて削除）
    pub async fn delete(&self, id: Uuid) -> MonitorResult<()> {
        if !self.store.remove_endpoint(id).await? {
            return Err(MonitorError::EndpointNotFound(id));
        }
        info!(endpoint_id = %id, "Endpoint deleted");
        Ok(())
    }

    /// 通知先を追加
    pub async fn add_destination(&self, id: Uuid, destination: &str) -> MonitorResult<bool> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(MonitorError::Config(
                "Notification destination must not be empty".to_string(),
            ));
        }
        self.require(id).await?;
        Ok(db::add_destination(self.store.pool(), id, destination).await?)
    }

    /// 通知先を削除
    pub async fn remove_destination(&self, id: Uuid, destination: &str) -> MonitorResult<bool> {
        Ok(db::remove_destination(self.store.pool(), id, destination.trim()).await?)
    }

    /// 通知先一覧
    pub async fn list_destinations(&self, id: Uuid) -> MonitorResult<Vec<String>> {
        Ok(db::list_destinations(self.store.pool(), id).await?)
    }

    async fn require(&self, id: Uuid) -> MonitorResult<Endpoint> {
        self.get_endpoint(id)
            .await?
            .ok_or(MonitorError::EndpointNotFound(id))
    }
}

#[async_trait]
impl EndpointRegistry for SqliteEndpointRegistry {
    async fn list_endpoints(&self) -> MonitorResult<Vec<Endpoint>> {
        Ok(db::list_endpoints(self.store.pool()).await?)
    }

    async fn get_endpoint(&self, id: Uuid) -> MonitorResult<Option<Endpoint>> {
        Ok(db::get_endpoint(self.store.pool(), id).await?)
    }
}

#[async_trait]
impl NotificationPreferences for SqliteEndpointRegistry {
    async fn destinations_for(&self, endpoint: &Endpoint) -> MonitorResult<Vec<String>> {
        self.list_destinations(endpoint.id).await
    }
}

/// アドレスを検証して正規化する
pub fn validate_address(address: &str) -> MonitorResult<String> {
    let trimmed = address.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| MonitorError::InvalidAddress(format!("{}: {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(MonitorError::InvalidAddress(format!(
                "{}: unsupported scheme '{}'",
                trimmed, other
            )))
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(MonitorError::InvalidAddress(format!(
            "{}: missing host",
            trimmed
        )));
    }

    Ok(url.to_string())
}
