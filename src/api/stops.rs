use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::ErrorResponse;
use crate::error::AppError;
use crate::models::Stop;
use crate::store;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStopRequest {
    pub name: String,
    pub osm_id: Option<i64>,
}

/// Create a stop
#[utoipa::path(
    post,
    path = "/stop",
    request_body = CreateStopRequest,
    responses(
        (status = 200, description = "Created stop", body = Stop)
    ),
    tag = "stops"
)]
pub async fn create_stop(
    State(pool): State<SqlitePool>,
    Json(request): Json<CreateStopRequest>,
) -> Result<Json<Stop>, AppError> {
    let id = store::stops::insert_stop(&pool, &request.name, request.osm_id).await?;
    let stop = store::stops::get_stop(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Stop with id {id} not found")))?;
    tracing::info!(stop_id = id, name = %request.name, "created stop");
    Ok(Json(stop))
}

/// List all stops
#[utoipa::path(
    get,
    path = "/stop",
    responses(
        (status = 200, description = "All stops", body = [Stop])
    ),
    tag = "stops"
)]
pub async fn list_stops(State(pool): State<SqlitePool>) -> Result<Json<Vec<Stop>>, AppError> {
    Ok(Json(store::stops::list_stops(&pool).await?))
}

/// Get one stop
#[utoipa::path(
    get,
    path = "/stop/{stop_id}",
    params(("stop_id" = i64, Path, description = "Stop id")),
    responses(
        (status = 200, description = "Stop", body = Stop),
        (status = 404, description = "Stop not found", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn get_stop(
    State(pool): State<SqlitePool>,
    Path(stop_id): Path<i64>,
) -> Result<Json<Stop>, AppError> {
    let stop = store::stops::get_stop(&pool, stop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Stop with id {stop_id} not found")))?;
    Ok(Json(stop))
}

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/", post(create_stop).get(list_stops))
        .route("/{stop_id}", get(get_stop))
        .with_state(pool)
}
