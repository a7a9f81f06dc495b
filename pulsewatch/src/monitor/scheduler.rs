//! 定期チェックスケジューラ
//!
//! 固定間隔で全アクティブエンドポイントをチェックする。1回のティックでは
//! エンドポイントごとに独立してチェックし、1件の失敗が他を止めることはない。

use super::Monitor;
use crate::config::MonitorConfig;
use crate::shutdown::ShutdownController;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 1回のティックの集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// チェック対象（一時停止中を除く）のエンドポイント数
    pub active: usize,
    /// 一時停止によりスキップした数
    pub skipped_paused: usize,
    /// 監視結果を記録できた数
    pub recorded: usize,
    /// 記録に失敗した数
    pub failed: usize,
}

/// 定期チェックスケジューラ
#[derive(Clone)]
pub struct Scheduler {
    monitor: Monitor,
    check_interval: Duration,
    startup_delay: Duration,
    max_concurrency: usize,
}

impl Scheduler {
    /// 新しいスケジューラを作成
    pub fn new(monitor: Monitor, check_interval: Duration) -> Self {
        Self {
            monitor,
            check_interval,
            startup_delay: Duration::ZERO,
            max_concurrency: 1,
        }
    }

    /// 設定からスケジューラを作成
    pub fn from_config(monitor: Monitor, config: &MonitorConfig) -> Self {
        Self::new(monitor, config.check_interval)
            .with_startup_delay(config.startup_delay)
            .with_max_concurrency(config.max_concurrent_probes)
    }

    /// 起動時チェックまでの待機時間を設定
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// 同時チェック数の上限を設定（0は1として扱う）
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// 1回分のチェックを実行
    pub async fn run_tick(&self) -> TickSummary {
        let endpoints = match self.monitor.registry().list_endpoints().await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                error!(error = %e, "Failed to list endpoints, skipping tick");
                return TickSummary::default();
            }
        };

        let registered: HashSet<Uuid> = endpoints.iter().map(|e| e.id).collect();
        self.monitor.retain_endpoints(&registered).await;

        let total = endpoints.len();
        let active: Vec<_> = endpoints.into_iter().filter(|e| e.is_active()).collect();
        let mut summary = TickSummary {
            active: active.len(),
            skipped_paused: total - active.len(),
            ..TickSummary::default()
        };

        if active.is_empty() {
            debug!(
                skipped_paused = summary.skipped_paused,
                "No active endpoints to check"
            );
            return summary;
        }

        // タスクを分けてパニックも1エンドポイント内に閉じ込める
        let results: Vec<_> = stream::iter(active)
            .map(|endpoint| {
                let monitor = self.monitor.clone();
                let id = endpoint.id;
                let handle =
                    tokio::spawn(async move { monitor.check_endpoint(&endpoint).await });
                async move { (id, handle.await) }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for (endpoint_id, result) in results {
            match result {
                Ok(Ok(_)) => summary.recorded += 1,
                Ok(Err(e)) => {
                    summary.failed += 1;
                    warn!(
                        endpoint_id = %endpoint_id,
                        error = %e,
                        "Failed to record observation"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(endpoint_id = %endpoint_id, "Check task join error: {}", e);
                }
            }
        }

        info!(
            active = summary.active,
            skipped_paused = summary.skipped_paused,
            recorded = summary.recorded,
            failed = summary.failed,
            "Check tick completed"
        );

        summary
    }

    /// バックグラウンドで監視を開始
    ///
    /// 起動待機の後に1回チェックし、以降は間隔ごとにチェックする。
    /// シャットダウン要求でティックの合間に停止する。
    pub fn start(self, shutdown: ShutdownController) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(self.startup_delay) => {}
                _ = shutdown.wait() => {
                    info!("Scheduler stopped before startup check");
                    return;
                }
            }

            self.run_tick().await;
            self.run_loop(&shutdown).await;
        })
    }

    async fn run_loop(&self, shutdown: &ShutdownController) {
        let mut timer = interval(self.check_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.check_interval.as_secs_f64(),
            max_concurrency = self.max_concurrency,
            "Endpoint scheduler started"
        );

        // 最初の tick は即時に返るため、起動時チェック分として消費する
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.run_tick().await;
                }
                _ = shutdown.wait() => {
                    info!("Endpoint scheduler stopped");
                    break;
                }
            }
        }
    }
}
