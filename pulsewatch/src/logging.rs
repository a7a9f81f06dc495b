//! ロギング初期化
//!
//! 標準エラーへの出力に加え、`PULSEWATCH_LOG_DIR` が設定されていれば
//! 日次ローテーションのファイルにも出力する。

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// デフォルトのログレベル
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// ログファイル名の接頭辞
const LOG_FILE_PREFIX: &str = "pulsewatch.log";

/// ログフィルタ指定を解決する
///
/// `PULSEWATCH_LOG_LEVEL` → `RUST_LOG` → `info` の順に参照する。
pub fn resolve_filter_directive() -> String {
    std::env::var("PULSEWATCH_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// グローバルなtracingサブスクライバを初期化する
///
/// ファイル出力を有効にした場合は `WorkerGuard` を返す。プロセス終了まで
/// 保持しないとバッファ済みのログが失われる。
pub fn init() -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let directive = resolve_filter_directive();
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match std::env::var("PULSEWATCH_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
