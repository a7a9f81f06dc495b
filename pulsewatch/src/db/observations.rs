//! 監視結果データベース操作
//!
//! `observations` テーブルは追記専用。更新は行わず、削除はエンドポイント削除時のみ。

use super::{format_timestamp, parse_timestamp};
use crate::types::{Observation, Outcome, ProbeStatus};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// 監視結果を追記し、採番されたIDを返す
pub async fn insert_observation(
    pool: &SqlitePool,
    endpoint_id: Uuid,
    outcome: &Outcome,
    observed_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO observations (endpoint_id, status, latency_ms, detail, observed_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(endpoint_id.to_string())
    .bind(outcome.status.as_str())
    .bind(outcome.latency_ms.map(i64::from))
    .bind(&outcome.detail)
    .bind(format_timestamp(observed_at))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// エンドポイントの監視履歴を新しい順に取得
pub async fn list_observations(
    pool: &SqlitePool,
    endpoint_id: Uuid,
    limit: u32,
) -> Result<Vec<Observation>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ObservationRow>(
        r#"
        SELECT id, endpoint_id, status, latency_ms, detail, observed_at
        FROM observations
        WHERE endpoint_id = ?
        ORDER BY observed_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(endpoint_id.to_string())
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Observation::try_from).collect()
}

/// エンドポイントの最新の監視結果を取得
pub async fn latest_for_endpoint(
    pool: &SqlitePool,
    endpoint_id: Uuid,
) -> Result<Option<Observation>, sqlx::Error> {
    let row = sqlx::query_as::<_, ObservationRow>(
        r#"
        SELECT id, endpoint_id, status, latency_ms, detail, observed_at
        FROM observations
        WHERE endpoint_id = ?
        ORDER BY observed_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(endpoint_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(Observation::try_from).transpose()
}

/// 各エンドポイントの最新の監視結果を取得（インデックス再構築用）
pub async fn latest_per_endpoint(pool: &SqlitePool) -> Result<Vec<Observation>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ObservationRow>(
        r#"
        SELECT o.id, o.endpoint_id, o.status, o.latency_ms, o.detail, o.observed_at
        FROM observations o
        WHERE o.id = (
            SELECT i.id
            FROM observations i
            WHERE i.endpoint_id = o.endpoint_id
            ORDER BY i.observed_at DESC, i.id DESC
            LIMIT 1
        )
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Observation::try_from).collect()
}

/// 指定時刻以降の (UP件数, 総件数) を集計
pub async fn count_since(
    pool: &SqlitePool,
    endpoint_id: Uuid,
    since: DateTime<Utc>,
) -> Result<(u64, u64), sqlx::Error> {
    let (up, total): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(CASE WHEN status = 'UP' THEN 1 ELSE 0 END), 0), COUNT(*)
        FROM observations
        WHERE endpoint_id = ? AND observed_at >= ?
        "#,
    )
    .bind(endpoint_id.to_string())
    .bind(format_timestamp(since))
    .fetch_one(pool)
    .await?;

    Ok((up.max(0) as u64, total.max(0) as u64))
}

/// エンドポイントの監視結果件数
pub async fn count_for_endpoint(pool: &SqlitePool, endpoint_id: Uuid) -> Result<u64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM observations WHERE endpoint_id = ?")
        .bind(endpoint_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count.max(0) as u64)
}

#[derive(sqlx::FromRow)]
struct ObservationRow {
    id: i64,
    endpoint_id: String,
    status: String,
    latency_ms: Option<i64>,
    detail: String,
    observed_at: String,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = sqlx::Error;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        let endpoint_id =
            Uuid::parse_str(&row.endpoint_id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let status: ProbeStatus = row
            .status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(Observation {
            id: row.id,
            endpoint_id,
            status,
            latency_ms: row.latency_ms.map(|v| v.clamp(0, u32::MAX as i64) as u32),
            detail: row.detail,
            observed_at: parse_timestamp(&row.observed_at)?,
        })
    }
}
