//! 監視結果の型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 稼働状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeStatus {
    /// 稼働中
    Up,
    /// 停止中
    Down,
}

impl ProbeStatus {
    /// ProbeStatusを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }

    /// ステータスコードから稼働状態を判定（`[200, 400)` のみ UP）
    pub fn from_status_code(code: u16) -> Self {
        if (200..400).contains(&code) {
            Self::Up
        } else {
            Self::Down
        }
    }
}

impl FromStr for ProbeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            other => Err(format!("unknown probe status: {}", other)),
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// プローブの結果（永続化前）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// 稼働状態
    pub status: ProbeStatus,
    /// ヘッダ受信までのレイテンシ（UPのときのみ）
    pub latency_ms: Option<u32>,
    /// 分類文字列
    pub detail: String,
}

impl Outcome {
    /// 応答を受信した場合の結果
    ///
    /// レイテンシはUPのときだけ保持する。
    pub fn from_response(code: u16, latency_ms: u32) -> Self {
        let status = ProbeStatus::from_status_code(code);
        Self {
            status,
            latency_ms: (status == ProbeStatus::Up).then_some(latency_ms),
            detail: format!("Status code: {}", code),
        }
    }

    /// 応答を得られなかった場合の結果
    pub fn down(detail: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Down,
            latency_ms: None,
            detail: detail.into(),
        }
    }
}

/// 監視結果（永続化済み、不変）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// 単調増加ID
    pub id: i64,
    /// エンドポイントID
    pub endpoint_id: Uuid,
    /// 稼働状態
    pub status: ProbeStatus,
    /// レイテンシ（UPのときのみ）
    pub latency_ms: Option<u32>,
    /// 分類文字列
    pub detail: String,
    /// 観測時刻
    pub observed_at: DateTime<Utc>,
}

/// 稼働率
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum Uptime {
    /// 小数点以下2桁に丸めたパーセンテージ
    Percent(f64),
    /// 期間内に監視結果がない（0%とは区別する）
    NotAvailable,
}

impl Uptime {
    /// UP件数と総件数から稼働率を計算
    pub fn from_counts(up: u64, total: u64) -> Self {
        if total == 0 {
            return Self::NotAvailable;
        }
        let percent = up as f64 / total as f64 * 100.0;
        Self::Percent((percent * 100.0).round() / 100.0)
    }

    /// パーセンテージを取得
    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Percent(p) => Some(*p),
            Self::NotAvailable => None,
        }
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{:.2}", p),
            Self::NotAvailable => write!(f, "N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_classification() {
        assert_eq!(ProbeStatus::from_status_code(200), ProbeStatus::Up);
        assert_eq!(ProbeStatus::from_status_code(301), ProbeStatus::Up);
        assert_eq!(ProbeStatus::from_status_code(399), ProbeStatus::Up);
        assert_eq!(ProbeStatus::from_status_code(400), ProbeStatus::Down);
        assert_eq!(ProbeStatus::from_status_code(404), ProbeStatus::Down);
        assert_eq!(ProbeStatus::from_status_code(503), ProbeStatus::Down);
        assert_eq!(ProbeStatus::from_status_code(199), ProbeStatus::Down);
    }

    #[test]
    fn test_outcome_from_error_response_drops_latency() {
        let outcome = Outcome::from_response(500, 42);
        assert_eq!(outcome.status, ProbeStatus::Down);
        assert_eq!(outcome.latency_ms, None);
        assert_eq!(outcome.detail, "Status code: 500");
    }

    #[test]
    fn test_outcome_from_success_keeps_latency() {
        let outcome = Outcome::from_response(200, 120);
        assert_eq!(outcome.status, ProbeStatus::Up);
        assert_eq!(outcome.latency_ms, Some(120));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("UP".parse::<ProbeStatus>().unwrap(), ProbeStatus::Up);
        assert_eq!("DOWN".parse::<ProbeStatus>().unwrap(), ProbeStatus::Down);
        assert!("online".parse::<ProbeStatus>().is_err());
    }

    #[test]
    fn test_uptime_from_counts() {
        assert_eq!(Uptime::from_counts(0, 0), Uptime::NotAvailable);
        assert_eq!(Uptime::from_counts(3, 4), Uptime::Percent(75.0));
        assert_eq!(Uptime::from_counts(0, 5), Uptime::Percent(0.0));
        assert_eq!(Uptime::from_counts(2, 3), Uptime::Percent(66.67));
    }

    #[test]
    fn test_uptime_display() {
        assert_eq!(Uptime::Percent(75.0).to_string(), "75.00");
        assert_eq!(Uptime::NotAvailable.to_string(), "N/A");
    }
}
