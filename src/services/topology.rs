//! Route topology: the ordered stop sequence owned by each route.
//!
//! Stop lists are only ever replaced wholesale, so `stop_order` is a
//! contiguous 1..N sequence by construction.

use std::collections::HashSet;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::AppError;
use crate::models::Direction;
use crate::store;

/// Checks that every id resolves to a stored stop and that the list has
/// no duplicates.
pub async fn validate_stop_ids(pool: &SqlitePool, stop_ids: &[i64]) -> Result<(), AppError> {
    let unique: HashSet<i64> = stop_ids.iter().copied().collect();
    if unique.len() != stop_ids.len() {
        return Err(AppError::InvalidTopology(
            "Duplicate stop ids in route stop list".to_string(),
        ));
    }
    let stops = store::stops::stops_by_ids(pool, stop_ids).await?;
    if stops.len() != unique.len() {
        return Err(AppError::InvalidTopology(
            "One or more stop IDs are invalid".to_string(),
        ));
    }
    Ok(())
}

/// Inserts fresh route_stops rows numbered 1..N in the given order.
/// Callers validate the ids first and own the transaction.
pub async fn insert_ordered_stops(
    tx: &mut Transaction<'_, Sqlite>,
    route_id: i64,
    stop_ids: &[i64],
) -> Result<(), AppError> {
    for (i, stop_id) in stop_ids.iter().enumerate() {
        store::routes::insert_route_stop(tx, route_id, *stop_id, (i + 1) as i64).await?;
    }
    Ok(())
}

/// Replaces a route's entire stop list in one transaction.
pub async fn set_route_stops(
    pool: &SqlitePool,
    route_id: i64,
    stop_ids: &[i64],
) -> Result<(), AppError> {
    store::routes::get_route(pool, route_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route with id {route_id} not found")))?;
    validate_stop_ids(pool, stop_ids).await?;

    let mut tx = pool.begin().await?;
    store::routes::delete_route_stops(&mut tx, route_id).await?;
    insert_ordered_stops(&mut tx, route_id, stop_ids).await?;
    tx.commit().await?;
    Ok(())
}

/// The route's stop ids sorted by order, reversed for RETOUR.
pub async fn ordered_stop_ids(
    pool: &SqlitePool,
    route_id: i64,
    direction: Direction,
) -> Result<Vec<i64>, AppError> {
    let mut ids = store::routes::forward_stop_ids(pool, route_id).await?;
    if direction == Direction::Retour {
        ids.reverse();
    }
    Ok(ids)
}
