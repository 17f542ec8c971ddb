use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::error::AppError;
use crate::models::{Route, RouteStatus};

const ROUTE_COLUMNS: &str = "id, name, num, description, status, osm_id";

pub async fn insert_route(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    num: &str,
    description: Option<&str>,
    status: RouteStatus,
    osm_id: Option<i64>,
) -> Result<i64, AppError> {
    let row = sqlx::query(
        r#"
        INSERT INTO routes (name, num, description, status, osm_id)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(num)
    .bind(description)
    .bind(status)
    .bind(osm_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.get("id"))
}

pub async fn get_route(pool: &SqlitePool, id: i64) -> Result<Option<Route>, AppError> {
    let route = sqlx::query_as::<_, Route>(&format!(
        "SELECT {ROUTE_COLUMNS} FROM routes WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(route)
}

pub async fn find_route_by_osm_id(
    pool: &SqlitePool,
    osm_id: i64,
) -> Result<Option<Route>, AppError> {
    let route = sqlx::query_as::<_, Route>(&format!(
        "SELECT {ROUTE_COLUMNS} FROM routes WHERE osm_id = ?"
    ))
    .bind(osm_id)
    .fetch_optional(pool)
    .await?;
    Ok(route)
}

pub async fn list_routes(pool: &SqlitePool) -> Result<Vec<Route>, AppError> {
    let routes = sqlx::query_as::<_, Route>(&format!(
        "SELECT {ROUTE_COLUMNS} FROM routes ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(routes)
}

/// Returns false when no route with that id exists.
pub async fn update_route_info(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    num: &str,
    description: Option<&str>,
) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE routes SET name = ?, num = ?, description = ? WHERE id = ?")
        .bind(name)
        .bind(num)
        .bind(description)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_route_status(
    pool: &SqlitePool,
    id: i64,
    status: RouteStatus,
) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE routes SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes the route; route_stops, runs and stop_times cascade.
pub async fn delete_route(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM routes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Stop ids of a route in forward (ALLER) topology order.
pub async fn forward_stop_ids(pool: &SqlitePool, route_id: i64) -> Result<Vec<i64>, AppError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT stop_id FROM route_stops WHERE route_id = ? ORDER BY stop_order",
    )
    .bind(route_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn delete_route_stops(
    tx: &mut Transaction<'_, Sqlite>,
    route_id: i64,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM route_stops WHERE route_id = ?")
        .bind(route_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn insert_route_stop(
    tx: &mut Transaction<'_, Sqlite>,
    route_id: i64,
    stop_id: i64,
    stop_order: i64,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO route_stops (route_id, stop_id, stop_order) VALUES (?, ?, ?)")
        .bind(route_id)
        .bind(stop_id)
        .bind(stop_order)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
