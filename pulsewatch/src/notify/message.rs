//! 通知メッセージの整形

use crate::types::{Endpoint, Observation};

/// 状態遷移の通知メッセージを作成
pub fn format_transition(endpoint: &Endpoint, previous: &Observation, current: &Observation) -> String {
    let mut lines = vec![
        format!("[pulsewatch] {} → {}", previous.status, current.status),
        format!("Endpoint: {}", endpoint.address),
    ];
    if let Some(latency) = current.latency_ms {
        lines.push(format!("Latency: {} ms", latency));
    }
    lines.push(format!("Detail: {}", current.detail));
    lines.push(format!(
        "Observed at: {}",
        current.observed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.join("\n")
}
