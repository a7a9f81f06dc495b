//! 監視サイクル
//!
//! 1エンドポイント分の「プローブ → 追記 → 状態変化検出 → 通知」を実行し、
//! CRUD層向けの読み取りAPIと手動チェックAPIを提供する。
//!
//! 同一エンドポイントのチェック（定期・手動）はエンドポイント単位のロックで
//! 直列化し、直前の結果の読み取りと追記の間に割り込みが入らないようにする。

/// 定期チェックスケジューラ
pub mod scheduler;

pub use scheduler::{Scheduler, TickSummary};

use crate::common::error::{MonitorError, MonitorResult};
use crate::config::DEFAULT_PROBE_TIMEOUT_SECS;
use crate::notify::{should_notify, Notifier};
use crate::probe::Probe;
use crate::registry::{EndpointRegistry, NotificationPreferences};
use crate::store::ObservationStore;
use crate::types::{Endpoint, Observation, Uptime};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 監視サービス
#[derive(Clone)]
pub struct Monitor {
    /// エンドポイントレジストリ
    registry: Arc<dyn EndpointRegistry>,
    /// 通知先の解決
    preferences: Arc<dyn NotificationPreferences>,
    /// プローバー
    prober: Arc<dyn Probe>,
    /// 監視結果ストア
    store: ObservationStore,
    /// 通知器
    notifier: Notifier,
    /// プローブのタイムアウト
    probe_timeout: Duration,
    /// エンドポイント単位のチェックロック
    endpoint_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl Monitor {
    /// 新しい監視サービスを作成
    pub fn new(
        registry: Arc<dyn EndpointRegistry>,
        preferences: Arc<dyn NotificationPreferences>,
        prober: Arc<dyn Probe>,
        store: ObservationStore,
        notifier: Notifier,
    ) -> Self {
        Self {
            registry,
            preferences,
            prober,
            store,
            notifier,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            endpoint_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// プローブのタイムアウトを設定
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// エンドポイントレジストリ
    pub fn registry(&self) -> &Arc<dyn EndpointRegistry> {
        &self.registry
    }

    /// 監視結果ストア
    pub fn store(&self) -> &ObservationStore {
        &self.store
    }

    /// 単一エンドポイントのチェック
    ///
    /// プローブ自体は失敗しない。ここで返るエラーは永続化の失敗のみで、
    /// 通知の失敗は結果に影響しない。
    pub async fn check_endpoint(&self, endpoint: &Endpoint) -> MonitorResult<Observation> {
        let lock = self.endpoint_lock(endpoint.id).await;
        let _guard = lock.lock().await;

        let previous = self.store.refresh_latest(endpoint.id).await?;
        let outcome = self.prober.probe(&endpoint.address, self.probe_timeout).await;
        let current = self.store.append(endpoint.id, &outcome).await?;

        debug!(
            endpoint_id = %endpoint.id,
            status = %current.status,
            latency_ms = ?current.latency_ms,
            detail = %current.detail,
            "Endpoint checked"
        );

        if let Some(previous) = previous.as_ref() {
            if should_notify(Some(previous), &current) {
                info!(
                    endpoint_id = %endpoint.id,
                    address = %endpoint.address,
                    from = %previous.status,
                    to = %current.status,
                    "Endpoint status changed"
                );
                self.dispatch(endpoint, previous, &current).await;
            }
        }

        Ok(current)
    }

    /// 状態変化を通知先へ配送
    async fn dispatch(&self, endpoint: &Endpoint, previous: &Observation, current: &Observation) {
        let destinations = match self.preferences.destinations_for(endpoint).await {
            Ok(destinations) => destinations,
            Err(e) => {
                warn!(
                    endpoint_id = %endpoint.id,
                    error = %e,
                    "Failed to resolve notification destinations"
                );
                return;
            }
        };

        if destinations.is_empty() {
            debug!(endpoint_id = %endpoint.id, "No notification destinations configured");
            return;
        }

        let delivered = self
            .notifier
            .notify_all(&destinations, endpoint, previous, current)
            .await;

        debug!(
            endpoint_id = %endpoint.id,
            destinations = destinations.len(),
            delivered = delivered,
            "Status change dispatched"
        );
    }

    async fn endpoint_lock(&self, endpoint_id: Uuid) -> Arc<Mutex<()>> {
        self.endpoint_locks
            .lock()
            .await
            .entry(endpoint_id)
            .or_default()
            .clone()
    }

    /// 登録されていないエンドポイントのロックと最新結果を破棄する
    pub async fn retain_endpoints(&self, endpoint_ids: &HashSet<Uuid>) {
        let evicted = self.store.retain_endpoints(endpoint_ids).await;
        let mut locks = self.endpoint_locks.lock().await;
        locks.retain(|id, _| endpoint_ids.contains(id));
        if evicted > 0 {
            debug!(evicted = evicted, "Dropped observations of removed endpoints from index");
        }
    }

    #[cfg(test)]
    pub(crate) async fn tracked_lock_count(&self) -> usize {
        self.endpoint_locks.lock().await.len()
    }

    /// 手動チェック（スケジュール外で1回だけ実行）
    pub async fn record_manual_check(&self, endpoint_id: Uuid) -> MonitorResult<Observation> {
        let endpoint = self
            .registry
            .get_endpoint(endpoint_id)
            .await?
            .ok_or(MonitorError::EndpointNotFound(endpoint_id))?;

        info!(endpoint_id = %endpoint_id, "Manual check requested");
        self.check_endpoint(&endpoint).await
    }

    /// 最新の監視結果
    pub async fn get_latest_observation(&self, endpoint_id: Uuid) -> Option<Observation> {
        self.store.latest_for(endpoint_id).await
    }

    /// 監視履歴（新しい順）
    pub async fn get_history(&self, endpoint_id: Uuid, limit: u32) -> MonitorResult<Vec<Observation>> {
        self.store.history(endpoint_id, limit).await
    }

    /// 期間内の稼働率
    pub async fn get_uptime(&self, endpoint_id: Uuid, window: Duration) -> MonitorResult<Uptime> {
        self.store.uptime(endpoint_id, window).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::test_utils::test_db_pool;
    use crate::notify::test_support::RecordingTransport;
    use crate::registry::SqliteEndpointRegistry;
    use crate::types::Outcome;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;

    /// アドレスごとに結果を順に返すプローバー
    #[derive(Default)]
    pub struct ScriptedProber {
        scripts: std::sync::Mutex<HashMap<String, VecDeque<Outcome>>>,
        pub calls: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedProber {
        pub fn push(&self, address: &str, outcome: Outcome) {
            self.scripts
                .lock()
                .unwrap()
                .entry(address.to_string())
                .or_default()
                .push_back(outcome);
        }

        pub fn calls_for(&self, address: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.as_str() == address)
                .count()
        }
    }

    #[async_trait]
    impl Probe for ScriptedProber {
        async fn probe(&self, address: &str, _timeout: Duration) -> Outcome {
            self.calls.lock().unwrap().push(address.to_string());
            self.scripts
                .lock()
                .unwrap()
                .get_mut(address)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| Outcome::from_response(200, 1))
        }
    }

    pub struct Harness {
        pub monitor: Monitor,
        pub registry: SqliteEndpointRegistry,
        pub prober: Arc<ScriptedProber>,
        pub transport: Arc<RecordingTransport>,
        pub clock: ManualClock,
    }

    pub async fn harness() -> Harness {
        let pool = test_db_pool().await;
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
        let store = ObservationStore::new(pool, Arc::new(clock.clone()))
            .await
            .unwrap();
        let registry = SqliteEndpointRegistry::new(store.clone());
        let prober = Arc::new(ScriptedProber::default());
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Notifier::new(
            transport.clone(),
            Arc::new(clock.clone()),
            Duration::from_secs(3600),
        );
        let monitor = Monitor::new(
            Arc::new(registry.clone()),
            Arc::new(registry.clone()),
            prober.clone(),
            store,
            notifier,
        );
        Harness {
            monitor,
            registry,
            prober,
            transport,
            clock,
        }
    }
}
