//! pulsewatch
//!
//! HTTPエンドポイントを定期的にプローブし、監視結果を追記専用ログに記録して、
//! 稼働状態が変化したときに通知する監視サービス

#![warn(missing_docs)]

/// 共通型定義（エラー型）
pub mod common;

/// 初期化ロジック
pub mod bootstrap;

/// CLIインターフェース
pub mod cli;

/// 時刻ソース
pub mod clock;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// データベースアクセス
pub mod db;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 監視サイクルとスケジューラ
pub mod monitor;

/// 状態変化の通知
pub mod notify;

/// エンドポイントプローブ
pub mod probe;

/// エンドポイントレジストリ
pub mod registry;

/// 協調的シャットダウン
pub mod shutdown;

/// 監視結果ストア
pub mod store;

/// ドメイン型
pub mod types;
