use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::Stop;

pub async fn insert_stop(
    pool: &SqlitePool,
    name: &str,
    osm_id: Option<i64>,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO stops (name, osm_id) VALUES (?, ?) RETURNING id",
    )
    .bind(name)
    .bind(osm_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn get_stop(pool: &SqlitePool, id: i64) -> Result<Option<Stop>, AppError> {
    let stop = sqlx::query_as::<_, Stop>("SELECT id, name, osm_id FROM stops WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(stop)
}

pub async fn find_stop_by_osm_id(pool: &SqlitePool, osm_id: i64) -> Result<Option<Stop>, AppError> {
    let stop = sqlx::query_as::<_, Stop>("SELECT id, name, osm_id FROM stops WHERE osm_id = ?")
        .bind(osm_id)
        .fetch_optional(pool)
        .await?;
    Ok(stop)
}

pub async fn list_stops(pool: &SqlitePool) -> Result<Vec<Stop>, AppError> {
    let stops = sqlx::query_as::<_, Stop>("SELECT id, name, osm_id FROM stops ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(stops)
}

/// Resolves a set of stop ids. Ids that do not exist are simply absent
/// from the result; callers compare lengths to detect unknown ids.
pub async fn stops_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Stop>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT id, name, osm_id FROM stops WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, Stop>(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    Ok(query.fetch_all(pool).await?)
}
