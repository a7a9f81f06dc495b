//! エンドポイント型定義

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 監視対象エンドポイント
///
/// レジストリが所有し、監視コアからは読み取り専用。
/// `id` はエンドポイントの生存期間中不変かつ一意。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// 一意識別子
    pub id: Uuid,
    /// 監視先URI（http/https）
    pub address: String,
    /// 一時停止中ならスケジューラの対象外
    pub paused: bool,
}

impl Endpoint {
    /// 新しいエンドポイントを作成（ID自動生成）
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.into(),
            paused: false,
        }
    }

    /// 監視対象か（一時停止されていないか）
    pub fn is_active(&self) -> bool {
        !self.paused
    }
}
