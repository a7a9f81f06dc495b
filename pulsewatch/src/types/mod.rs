//! 型定義

/// エンドポイント
pub mod endpoint;
/// 監視結果
pub mod observation;

pub use endpoint::Endpoint;
pub use observation::{Observation, Outcome, ProbeStatus, Uptime};
