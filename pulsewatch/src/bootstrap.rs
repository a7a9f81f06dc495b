//! 初期化ロジック
//!
//! データベース接続、監視結果ストア、レジストリ、通知器、監視サービスを
//! 組み立てる。`serve` と各管理コマンドが共通で使用する。

use crate::clock::{SharedClock, SystemClock};
use crate::common::error::{MonitorError, MonitorResult};
use crate::config::{MonitorConfig, NotifyConfig};
use crate::db::migrations::initialize_database;
use crate::monitor::Monitor;
use crate::notify::{LogTransport, NotificationTransport, Notifier, TelegramTransport};
use crate::probe::HttpProber;
use crate::registry::SqliteEndpointRegistry;
use crate::store::ObservationStore;
use std::sync::Arc;
use tracing::{info, warn};

/// 初期化済みコンポーネント
#[derive(Clone)]
pub struct AppContext {
    /// 監視設定
    pub config: MonitorConfig,
    /// 監視結果ストア
    pub store: ObservationStore,
    /// エンドポイントレジストリ
    pub registry: SqliteEndpointRegistry,
    /// 監視サービス
    pub monitor: Monitor,
}

/// 全コンポーネントを初期化する
pub async fn initialize(
    database_url: &str,
    config: MonitorConfig,
    notify_config: &NotifyConfig,
) -> MonitorResult<AppContext> {
    let pool = initialize_database(database_url).await?;
    let clock: SharedClock = Arc::new(SystemClock);
    let store = ObservationStore::new(pool, clock.clone()).await?;
    let registry = SqliteEndpointRegistry::new(store.clone());

    let transport = build_transport(notify_config)?;
    let notifier = Notifier::new(transport, clock, config.notify_cooldown);
    let prober = HttpProber::new()?;

    let monitor = Monitor::new(
        Arc::new(registry.clone()),
        Arc::new(registry.clone()),
        Arc::new(prober),
        store.clone(),
        notifier,
    )
    .with_probe_timeout(config.probe_timeout);

    Ok(AppContext {
        config,
        store,
        registry,
        monitor,
    })
}

/// 通知トランスポートを選択する
///
/// Telegram Bot トークンが未設定ならログ出力のみのトランスポートを使う。
pub fn build_transport(config: &NotifyConfig) -> MonitorResult<Arc<dyn NotificationTransport>> {
    match config.telegram_bot_token.as_deref() {
        Some(token) => {
            let transport = TelegramTransport::new(&config.telegram_api_url, token).map_err(|e| {
                MonitorError::Config(format!("Failed to create Telegram transport: {}", e))
            })?;
            info!(api_url = %config.telegram_api_url, "Telegram notifications enabled");
            Ok(Arc::new(transport))
        }
        None => {
            warn!("Telegram bot token is not set, alerts will only be logged");
            Ok(Arc::new(LogTransport))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeStatus;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notify_config() -> NotifyConfig {
        NotifyConfig {
            telegram_bot_token: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
        }
    }

    #[tokio::test]
    async fn test_initialize_creates_database_and_checks_endpoint() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock)
            .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("pulsewatch.db");
        let url = format!("sqlite:{}", db_path.display());

        let ctx = initialize(&url, MonitorConfig::default(), &notify_config())
            .await
            .unwrap();
        assert!(db_path.exists());

        let endpoint = ctx.registry.register(&mock.uri()).await.unwrap();
        let observation = ctx.monitor.record_manual_check(endpoint.id).await.unwrap();
        assert_eq!(observation.status, ProbeStatus::Up);
        assert_eq!(ctx.store.count(endpoint.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_initialize_restores_latest_index() {
        let temp_dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", temp_dir.path().join("p.db").display());

        let ctx = initialize(&url, MonitorConfig::default(), &notify_config())
            .await
            .unwrap();
        // 接続拒否で DOWN を記録する
        let endpoint = ctx.registry.register("http://127.0.0.1:9").await.unwrap();
        let recorded = ctx.monitor.record_manual_check(endpoint.id).await.unwrap();
        drop(ctx);

        let reopened = initialize(&url, MonitorConfig::default(), &notify_config())
            .await
            .unwrap();
        assert_eq!(
            reopened.monitor.get_latest_observation(endpoint.id).await,
            Some(recorded)
        );
    }

    #[test]
    fn test_build_transport_with_token() {
        let config = NotifyConfig {
            telegram_bot_token: Some("TOKEN".to_string()),
            ..notify_config()
        };
        assert!(build_transport(&config).is_ok());
        assert!(build_transport(&notify_config()).is_ok());
    }
}
