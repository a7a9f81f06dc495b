//! 状態変化の検出と通知
//!
//! 直前の監視結果と新しい監視結果を比較し、状態が変化したときだけ
//! エンドポイント固有の通知先に通知する。同一（エンドポイント, 通知先）への
//! 通知はクールダウン期間内は抑制する。配送に失敗した通知はクールダウンを
//! 消費しない（自動再送はしない）。

/// メッセージ整形
pub mod message;
/// Telegram トランスポート
pub mod telegram;
/// トランスポート契約
pub mod transport;

pub use telegram::TelegramTransport;
pub use transport::{LogTransport, NotificationTransport};

use crate::clock::SharedClock;
use crate::types::{Endpoint, Observation};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 通知が必要か判定
///
/// 直前の結果が存在し、かつ状態が異なるときだけ true。
/// 初回の結果はベースラインであり通知しない。
pub fn should_notify(previous: Option<&Observation>, current: &Observation) -> bool {
    previous.is_some_and(|prev| prev.status != current.status)
}

type CooldownKey = (Uuid, String);

/// クールダウン付き通知器
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn NotificationTransport>,
    clock: SharedClock,
    cooldown: Duration,
    /// (エンドポイントID, 通知先) → 最終送信時刻（プロセス内のみ）
    last_sent: Mutex<HashMap<CooldownKey, DateTime<Utc>>>,
}

impl Notifier {
    /// 新しい通知器を作成
    pub fn new(
        transport: Arc<dyn NotificationTransport>,
        clock: SharedClock,
        cooldown: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                clock,
                cooldown,
                last_sent: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// 1つの通知先に通知
    ///
    /// 配送できた場合だけ true を返し、クールダウンを開始する。
    pub async fn notify(
        &self,
        destination: &str,
        endpoint: &Endpoint,
        previous: &Observation,
        current: &Observation,
    ) -> bool {
        let key = (endpoint.id, destination.to_string());

        if self.is_cooling_down(&key) {
            debug!(
                endpoint_id = %endpoint.id,
                destination = %destination,
                "Notification suppressed by cooldown"
            );
            return false;
        }

        let text = message::format_transition(endpoint, previous, current);
        match self.inner.transport.send(destination, &text).await {
            Ok(()) => {
                let now = self.inner.clock.now();
                self.last_sent().insert(key, now);
                info!(
                    endpoint_id = %endpoint.id,
                    destination = %destination,
                    from = %previous.status,
                    to = %current.status,
                    "Status change notification delivered"
                );
                true
            }
            Err(e) => {
                warn!(
                    endpoint_id = %endpoint.id,
                    destination = %destination,
                    error = %e,
                    "Failed to deliver status change notification"
                );
                false
            }
        }
    }

    /// 複数の通知先に並列で通知し、配送できた件数を返す
    ///
    /// 通知先ごとに独立しており、1件の失敗は他に影響しない。
    pub async fn notify_all(
        &self,
        destinations: &[String],
        endpoint: &Endpoint,
        previous: &Observation,
        current: &Observation,
    ) -> usize {
        let deliveries = destinations
            .iter()
            .map(|destination| self.notify(destination, endpoint, previous, current));

        futures::future::join_all(deliveries)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }

    fn is_cooling_down(&self, key: &CooldownKey) -> bool {
        let now = self.inner.clock.now();
        let last_sent = self.last_sent();
        let Some(sent_at) = last_sent.get(key) else {
            return false;
        };
        match (now - *sent_at).to_std() {
            Ok(elapsed) => elapsed < self.inner.cooldown,
            // 時計が巻き戻った場合は送信直後とみなす
            Err(_) => true,
        }
    }

    fn last_sent(&self) -> std::sync::MutexGuard<'_, HashMap<CooldownKey, DateTime<Utc>>> {
        self.inner
            .last_sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}
