//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

use chrono::{DateTime, SecondsFormat, Utc};

/// データベースマイグレーション
pub mod migrations;

/// エンドポイント・通知先管理
pub mod endpoints;

/// 監視結果（追記専用ログ）
pub mod observations;

/// 時刻をDB保存形式に変換
///
/// 固定精度のRFC 3339（UTC）で保存し、文字列比較で時刻順に並ぶようにする。
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// DB保存形式の時刻を解析
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
