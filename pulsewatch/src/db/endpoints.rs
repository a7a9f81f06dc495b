//! エンドポイントデータベース操作

use super::format_timestamp;
use crate::types::Endpoint;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// エンドポイントを登録
pub async fn create_endpoint(pool: &SqlitePool, endpoint: &Endpoint) -> Result<(), sqlx::Error> {
    let registered_at = format_timestamp(Utc::now());

    sqlx::query(
        r#"
        INSERT INTO endpoints (id, address, paused, registered_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(endpoint.id.to_string())
    .bind(&endpoint.address)
    .bind(endpoint.paused)
    .bind(&registered_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// エンドポイント一覧を取得（登録順）
pub async fn list_endpoints(pool: &SqlitePool) -> Result<Vec<Endpoint>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EndpointRow>(
        r#"
        SELECT id, address, paused
        FROM endpoints
        ORDER BY registered_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// IDでエンドポイントを取得
pub async fn get_endpoint(pool: &SqlitePool, id: Uuid) -> Result<Option<Endpoint>, sqlx::Error> {
    let row = sqlx::query_as::<_, EndpointRow>(
        r#"
        SELECT id, address, paused
        FROM endpoints
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// 一時停止フラグを更新
pub async fn set_paused(pool: &SqlitePool, id: Uuid, paused: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE endpoints SET paused = ? WHERE id = ?")
        .bind(paused)
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// エンドポイントを削除
///
/// 監視結果・通知先も同一トランザクションで削除する。
pub async fn delete_endpoint(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let id = id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM observations WHERE endpoint_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM notification_destinations WHERE endpoint_id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM endpoints WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(result.rows_affected() > 0)
}

/// 通知先を追加（重複は無視）
pub async fn add_destination(
    pool: &SqlitePool,
    endpoint_id: Uuid,
    destination: &str,
) -> Result<bool, sqlx::Error> {
    let created_at = format_timestamp(Utc::now());
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO notification_destinations (endpoint_id, destination, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(endpoint_id.to_string())
    .bind(destination)
    .bind(&created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 通知先を削除
pub async fn remove_destination(
    pool: &SqlitePool,
    endpoint_id: Uuid,
    destination: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM notification_destinations WHERE endpoint_id = ? AND destination = ?",
    )
    .bind(endpoint_id.to_string())
    .bind(destination)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// エンドポイントの通知先一覧を取得
pub async fn list_destinations(
    pool: &SqlitePool,
    endpoint_id: Uuid,
) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT destination
        FROM notification_destinations
        WHERE endpoint_id = ?
        ORDER BY created_at ASC, destination ASC
        "#,
    )
    .bind(endpoint_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(d,)| d).collect())
}

#[derive(sqlx::FromRow)]
struct EndpointRow {
    id: String,
    address: String,
    paused: bool,
}

impl From<EndpointRow> for Endpoint {
    fn from(row: EndpointRow) -> Self {
        Endpoint {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            address: row.address,
            paused: row.paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db_pool;

    #[tokio::test]
    async fn test_endpoint_crud() {
        let pool = test_db_pool().await;

        // Create
        let endpoint = Endpoint::new("http://localhost:8080");
        create_endpoint(&pool, &endpoint).await.unwrap();

        // Read
        let fetched = get_endpoint(&pool, endpoint.id).await.unwrap().unwrap();
        assert_eq!(fetched, endpoint);

        // List
        let all = list_endpoints(&pool).await.unwrap();
        assert_eq!(all.len(), 1);

        // Pause
        assert!(set_paused(&pool, endpoint.id, true).await.unwrap());
        let paused = get_endpoint(&pool, endpoint.id).await.unwrap().unwrap();
        assert!(paused.paused);

        // Delete
        assert!(delete_endpoint(&pool, endpoint.id).await.unwrap());
        assert!(get_endpoint(&pool, endpoint.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_paused_unknown_endpoint() {
        let pool = test_db_pool().await;
        assert!(!set_paused(&pool, Uuid::new_v4(), true).await.unwrap());
    }

    #[tokio::test]
    async fn test_destinations_crud() {
        let pool = test_db_pool().await;
        let endpoint = Endpoint::new("http://localhost:8081");
        create_endpoint(&pool, &endpoint).await.unwrap();

        assert!(add_destination(&pool, endpoint.id, "@ops").await.unwrap());
        assert!(add_destination(&pool, endpoint.id, "12345").await.unwrap());
        // 重複は無視
        assert!(!add_destination(&pool, endpoint.id, "@ops").await.unwrap());

        let destinations = list_destinations(&pool, endpoint.id).await.unwrap();
        assert_eq!(destinations.len(), 2);
        assert!(destinations.contains(&"@ops".to_string()));

        assert!(remove_destination(&pool, endpoint.id, "@ops").await.unwrap());
        let destinations = list_destinations(&pool, endpoint.id).await.unwrap();
        assert_eq!(destinations, vec!["12345".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_endpoint_removes_destinations() {
        let pool = test_db_pool().await;
        let endpoint = Endpoint::new("http://localhost:8082");
        create_endpoint(&pool, &endpoint).await.unwrap();
        add_destination(&pool, endpoint.id, "@ops").await.unwrap();

        delete_endpoint(&pool, endpoint.id).await.unwrap();

        assert!(list_destinations(&pool, endpoint.id).await.unwrap().is_empty());
    }
}
