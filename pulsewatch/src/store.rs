//! 監視結果ストア
//!
//! 追記専用の監視ログ（SQLite）と、エンドポイントごとの最新結果の
//! インメモリインデックスを管理する。インデックスは起動時にDBから再構築し、
//! 追記のたびに更新する。

use crate::clock::SharedClock;
use crate::common::error::{MonitorError, MonitorResult};
use crate::db::{endpoints as endpoint_db, observations as db};
use crate::types::{Observation, Outcome, ProbeStatus, Uptime};
use chrono::SubsecRound;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// 監視結果ストア
#[derive(Clone)]
pub struct ObservationStore {
    /// データベースプール
    pool: SqlitePool,
    /// エンドポイントID → 最新の監視結果
    latest: Arc<RwLock<HashMap<Uuid, Observation>>>,
    /// 追記（DB書き込み＋インデックス更新）を直列化するロック
    append_lock: Arc<Mutex<()>>,
    /// 時刻ソース
    clock: SharedClock,
}

impl ObservationStore {
    /// SQLiteプールからストアを作成し、最新結果インデックスを構築する
    pub async fn new(pool: SqlitePool, clock: SharedClock) -> MonitorResult<Self> {
        let store = Self {
            pool,
            latest: Arc::new(RwLock::new(HashMap::new())),
            append_lock: Arc::new(Mutex::new(())),
            clock,
        };

        store.load_from_db().await?;

        Ok(store)
    }

    /// DBから最新結果インデックスを再構築
    async fn load_from_db(&self) -> MonitorResult<()> {
        let loaded = db::latest_per_endpoint(&self.pool).await?;

        let mut latest = self.latest.write().await;
        latest.clear();
        for observation in loaded {
            latest.insert(observation.endpoint_id, observation);
        }

        info!(
            endpoint_count = latest.len(),
            "Loaded latest observations from database"
        );

        Ok(())
    }

    /// データベースプールを取得
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 監視結果を追記
    ///
    /// IDと観測時刻を採番し、DBに永続化してから返す。
    /// 同一エンドポイント内で観測時刻が逆行しないよう、直前の結果より前の時刻は
    /// 直前の時刻に揃える。
    pub async fn append(&self, endpoint_id: Uuid, outcome: &Outcome) -> MonitorResult<Observation> {
        validate_outcome(outcome)?;

        let _guard = self.append_lock.lock().await;

        // DBの保存精度（マイクロ秒）に揃え、再起動後のインデックスと一致させる
        let mut observed_at = self.clock.now().trunc_subsecs(6);
        // 他プロセスの追記も含めて比較するためDB上の最新を参照する
        if let Some(previous) = db::latest_for_endpoint(&self.pool, endpoint_id).await? {
            if previous.observed_at > observed_at {
                observed_at = previous.observed_at;
            }
        }

        let id = db::insert_observation(&self.pool, endpoint_id, outcome, observed_at).await?;

        let observation = Observation {
            id,
            endpoint_id,
            status: outcome.status,
            latency_ms: outcome.latency_ms,
            detail: outcome.detail.clone(),
            observed_at,
        };

        self.latest
            .write()
            .await
            .insert(endpoint_id, observation.clone());

        debug!(
            endpoint_id = %endpoint_id,
            observation_id = id,
            status = %observation.status,
            "Observation appended"
        );

        Ok(observation)
    }

    /// エンドポイントの最新の監視結果
    pub async fn latest_for(&self, endpoint_id: Uuid) -> Option<Observation> {
        self.latest.read().await.get(&endpoint_id).cloned()
    }

    /// DBから最新の監視結果を読み直し、インデックスを更新する
    ///
    /// 同じDBを共有する別プロセス（CLI の手動チェックや削除）の変更を反映する。
    pub async fn refresh_latest(&self, endpoint_id: Uuid) -> MonitorResult<Option<Observation>> {
        let latest = db::latest_for_endpoint(&self.pool, endpoint_id).await?;

        let mut index = self.latest.write().await;
        match &latest {
            Some(observation) => {
                index.insert(endpoint_id, observation.clone());
            }
            None => {
                index.remove(&endpoint_id);
            }
        }

        Ok(latest)
    }

    /// 指定したエンドポイント以外をインデックスから除外する
    pub async fn retain_endpoints(&self, endpoint_ids: &HashSet<Uuid>) -> usize {
        let mut index = self.latest.write().await;
        let before = index.len();
        index.retain(|id, _| endpoint_ids.contains(id));
        before - index.len()
    }

    /// 全エンドポイントの最新の監視結果
    pub async fn latest_for_all(&self) -> HashMap<Uuid, Observation> {
        self.latest.read().await.clone()
    }

    /// 監視履歴（新しい順）
    pub async fn history(&self, endpoint_id: Uuid, limit: u32) -> MonitorResult<Vec<Observation>> {
        Ok(db::list_observations(&self.pool, endpoint_id, limit).await?)
    }

    /// 期間内の稼働率
    ///
    /// 期間内に監視結果がなければ `Uptime::NotAvailable`。
    pub async fn uptime(&self, endpoint_id: Uuid, window: Duration) -> MonitorResult<Uptime> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| MonitorError::Config(format!("Invalid uptime window: {}", e)))?;
        let since = self.clock.now() - window;

        let (up, total) = db::count_since(&self.pool, endpoint_id, since).await?;
        Ok(Uptime::from_counts(up, total))
    }

    /// エンドポイントの監視結果件数
    pub async fn count(&self, endpoint_id: Uuid) -> MonitorResult<u64> {
        Ok(db::count_for_endpoint(&self.pool, endpoint_id).await?)
    }

    /// エンドポイントを削除し、その監視結果をすべて消去する
    ///
    /// DB削除は単一トランザクションで行い、成功後にインデックスから除外する。
    pub async fn remove_endpoint(&self, endpoint_id: Uuid) -> MonitorResult<bool> {
        let _guard = self.append_lock.lock().await;

        let deleted = endpoint_db::delete_endpoint(&self.pool, endpoint_id).await?;
        self.latest.write().await.remove(&endpoint_id);

        Ok(deleted)
    }
}

/// `latency_ms` は UP のときだけ存在する
fn validate_outcome(outcome: &Outcome) -> MonitorResult<()> {
    let consistent = match outcome.status {
        ProbeStatus::Up => outcome.latency_ms.is_some(),
        ProbeStatus::Down => outcome.latency_ms.is_none(),
    };
    if consistent {
        Ok(())
    } else {
        Err(MonitorError::Internal(format!(
            "Outcome latency does not match status {}",
            outcome.status
        )))
    }
}
