//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated variable names with warning logs.

use std::time::Duration;

/// デフォルトのチェック間隔（秒）
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;

/// デフォルトのプローブタイムアウト（秒）
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 15;

/// デフォルトの通知クールダウン（秒）
pub const DEFAULT_NOTIFY_COOLDOWN_SECS: u64 = 3600;

/// 起動直後のチェックまでの待機時間（秒）
pub const DEFAULT_STARTUP_DELAY_SECS: u64 = 5;

/// 同時プローブ数の上限
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 20;

/// デフォルトのデータベースURL
pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/pulsewatch.db";

/// Telegram Bot API のベースURL
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use pulsewatch::config::get_env_with_fallback;
///
/// let url = get_env_with_fallback("PULSEWATCH_DATABASE_URL", "DATABASE_URL");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Returns `default` if neither variable is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// 正の秒数を読み取る（0や不正値はデフォルト）
fn positive_secs(new_name: &str, old_name: &str, default: u64) -> Duration {
    let secs = get_env_with_fallback_parse(new_name, old_name, default);
    Duration::from_secs(if secs == 0 { default } else { secs })
}

/// 監視設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// スケジューラのチェック間隔
    pub check_interval: Duration,
    /// 1回のプローブのタイムアウト
    pub probe_timeout: Duration,
    /// 同一エンドポイント・通知先への通知の最短間隔
    pub notify_cooldown: Duration,
    /// 起動時チェックまでの待機時間
    pub startup_delay: Duration,
    /// 同時に実行するプローブ数の上限（1なら逐次）
    pub max_concurrent_probes: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            notify_cooldown: Duration::from_secs(DEFAULT_NOTIFY_COOLDOWN_SECS),
            startup_delay: Duration::from_secs(DEFAULT_STARTUP_DELAY_SECS),
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
        }
    }
}

impl MonitorConfig {
    /// Load monitor configuration from environment variables.
    pub fn from_env() -> Self {
        let check_interval = positive_secs(
            "PULSEWATCH_CHECK_INTERVAL_SECS",
            "CHECK_INTERVAL_SECS",
            DEFAULT_CHECK_INTERVAL_SECS,
        );
        let probe_timeout = positive_secs(
            "PULSEWATCH_PROBE_TIMEOUT_SECS",
            "PROBE_TIMEOUT_SECS",
            DEFAULT_PROBE_TIMEOUT_SECS,
        );
        let notify_cooldown = Duration::from_secs(get_env_with_fallback_parse(
            "PULSEWATCH_NOTIFY_COOLDOWN_SECS",
            "NOTIFY_COOLDOWN_SECS",
            DEFAULT_NOTIFY_COOLDOWN_SECS,
        ));
        let startup_delay = Duration::from_secs(get_env_with_fallback_parse(
            "PULSEWATCH_STARTUP_DELAY_SECS",
            "STARTUP_DELAY_SECS",
            DEFAULT_STARTUP_DELAY_SECS,
        ));
        let max_concurrent_probes = get_env_with_fallback_parse(
            "PULSEWATCH_MAX_CONCURRENT_PROBES",
            "MAX_CONCURRENT_PROBES",
            DEFAULT_MAX_CONCURRENT_PROBES,
        )
        .max(1);

        Self {
            check_interval,
            probe_timeout,
            notify_cooldown,
            startup_delay,
            max_concurrent_probes,
        }
    }
}

/// 通知トランスポート設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Telegram Bot トークン（未設定ならログ出力のみ）
    pub telegram_bot_token: Option<String>,
    /// Telegram Bot API のベースURL
    pub telegram_api_url: String,
}

impl NotifyConfig {
    /// Load notification transport configuration from environment variables.
    pub fn from_env() -> Self {
        let telegram_bot_token =
            get_env_with_fallback("PULSEWATCH_TELEGRAM_BOT_TOKEN", "TELEGRAM_BOT_TOKEN")
                .filter(|token| !token.trim().is_empty());
        let telegram_api_url = std::env::var("PULSEWATCH_TELEGRAM_API_URL")
            .unwrap_or_else(|_| DEFAULT_TELEGRAM_API_URL.to_string());

        Self {
            telegram_bot_token,
            telegram_api_url,
        }
    }
}

/// データベースURLを取得
///
/// 環境変数 `PULSEWATCH_DATABASE_URL`（旧: `DATABASE_URL`）から取得し、
/// 未設定の場合は `sqlite:data/pulsewatch.db` を返す。
pub fn get_database_url() -> String {
    get_env_with_fallback_or(
        "PULSEWATCH_DATABASE_URL",
        "DATABASE_URL",
        DEFAULT_DATABASE_URL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MONITOR_VARS: &[&str] = &[
        "PULSEWATCH_CHECK_INTERVAL_SECS",
        "CHECK_INTERVAL_SECS",
        "PULSEWATCH_PROBE_TIMEOUT_SECS",
        "PROBE_TIMEOUT_SECS",
        "PULSEWATCH_NOTIFY_COOLDOWN_SECS",
        "NOTIFY_COOLDOWN_SECS",
        "PULSEWATCH_STARTUP_DELAY_SECS",
        "STARTUP_DELAY_SECS",
        "PULSEWATCH_MAX_CONCURRENT_PROBES",
        "MAX_CONCURRENT_PROBES",
    ];

    fn clear_monitor_vars() {
        for name in MONITOR_VARS {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_new_name() {
        std::env::set_var("TEST_NEW_VAR", "new_value");
        std::env::remove_var("TEST_OLD_VAR");

        let result = get_env_with_fallback("TEST_NEW_VAR", "TEST_OLD_VAR");
        assert_eq!(result, Some("new_value".to_string()));

        std::env::remove_var("TEST_NEW_VAR");
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_old_name() {
        std::env::remove_var("TEST_NEW_VAR2");
        std::env::set_var("TEST_OLD_VAR2", "old_value");

        let result = get_env_with_fallback("TEST_NEW_VAR2", "TEST_OLD_VAR2");
        assert_eq!(result, Some("old_value".to_string()));

        std::env::remove_var("TEST_OLD_VAR2");
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_new_takes_precedence() {
        std::env::set_var("TEST_NEW_VAR3", "new_value");
        std::env::set_var("TEST_OLD_VAR3", "old_value");

        let result = get_env_with_fallback("TEST_NEW_VAR3", "TEST_OLD_VAR3");
        assert_eq!(result, Some("new_value".to_string()));

        std::env::remove_var("TEST_NEW_VAR3");
        std::env::remove_var("TEST_OLD_VAR3");
    }

    #[test]
    #[serial]
    fn test_monitor_config_defaults() {
        clear_monitor_vars();
        let config = MonitorConfig::from_env();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.probe_timeout, Duration::from_secs(15));
        assert_eq!(config.notify_cooldown, Duration::from_secs(3600));
    }

    #[test]
    #[serial]
    fn test_monitor_config_from_env() {
        clear_monitor_vars();
        std::env::set_var("PULSEWATCH_CHECK_INTERVAL_SECS", "60");
        std::env::set_var("PROBE_TIMEOUT_SECS", "5");
        std::env::set_var("PULSEWATCH_MAX_CONCURRENT_PROBES", "4");

        let config = MonitorConfig::from_env();
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_probes, 4);

        clear_monitor_vars();
    }

    #[test]
    #[serial]
    fn test_monitor_config_rejects_zero_values() {
        clear_monitor_vars();
        std::env::set_var("PULSEWATCH_CHECK_INTERVAL_SECS", "0");
        std::env::set_var("PULSEWATCH_MAX_CONCURRENT_PROBES", "0");

        let config = MonitorConfig::from_env();
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_probes, 1);

        clear_monitor_vars();
    }

    #[test]
    #[serial]
    fn test_notify_config_blank_token_is_none() {
        std::env::set_var("PULSEWATCH_TELEGRAM_BOT_TOKEN", "  ");
        std::env::remove_var("TELEGRAM_BOT_TOKEN");

        let config = NotifyConfig::from_env();
        assert!(config.telegram_bot_token.is_none());

        std::env::remove_var("PULSEWATCH_TELEGRAM_BOT_TOKEN");
    }

    #[test]
    #[serial]
    fn test_get_database_url_default() {
        std::env::remove_var("PULSEWATCH_DATABASE_URL");
        std::env::remove_var("DATABASE_URL");
        assert_eq!(get_database_url(), DEFAULT_DATABASE_URL);
    }
}
