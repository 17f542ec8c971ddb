use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use sqlx::SqlitePool;

use crate::api::ErrorResponse;
use crate::error::AppError;
use crate::models::{RunDetails, UpcomingArrival};
use crate::services::runs::{self, CreateRun};
use crate::services::schedule;

/// Create a scheduled run with its stop times
#[utoipa::path(
    post,
    path = "/run",
    request_body = CreateRun,
    responses(
        (status = 200, description = "Created run", body = RunDetails),
        (status = 400, description = "Invalid run data", body = ErrorResponse)
    ),
    tag = "runs"
)]
pub async fn create_run(
    State(pool): State<SqlitePool>,
    Json(request): Json<CreateRun>,
) -> Result<Json<RunDetails>, AppError> {
    Ok(Json(runs::create_run(&pool, &request).await?))
}

/// List all runs
#[utoipa::path(
    get,
    path = "/run",
    responses(
        (status = 200, description = "All runs", body = [RunDetails])
    ),
    tag = "runs"
)]
pub async fn list_runs(State(pool): State<SqlitePool>) -> Result<Json<Vec<RunDetails>>, AppError> {
    Ok(Json(runs::list_all_runs(&pool).await?))
}

/// Runs starting in the next 24 hours, all routes
#[utoipa::path(
    get,
    path = "/run/next24h",
    responses(
        (status = 200, description = "Runs starting in the next 24 hours", body = [RunDetails])
    ),
    tag = "runs"
)]
pub async fn runs_next24h(
    State(pool): State<SqlitePool>,
) -> Result<Json<Vec<RunDetails>>, AppError> {
    let now = Local::now().naive_local();
    Ok(Json(
        schedule::runs_next24h(&pool, None, now.date(), now.time()).await?,
    ))
}

/// Get one run with its stop times
#[utoipa::path(
    get,
    path = "/run/{run_id}",
    params(("run_id" = i64, Path, description = "Run id")),
    responses(
        (status = 200, description = "Run with stop times", body = RunDetails),
        (status = 404, description = "Run not found", body = ErrorResponse)
    ),
    tag = "runs"
)]
pub async fn get_run(
    State(pool): State<SqlitePool>,
    Path(run_id): Path<i64>,
) -> Result<Json<RunDetails>, AppError> {
    Ok(Json(runs::get_run_details(&pool, run_id).await?))
}

/// Delete a run and its stop times
#[utoipa::path(
    delete,
    path = "/run/{run_id}",
    params(("run_id" = i64, Path, description = "Run id")),
    responses(
        (status = 204, description = "Run deleted"),
        (status = 404, description = "Run not found", body = ErrorResponse)
    ),
    tag = "runs"
)]
pub async fn delete_run(
    State(pool): State<SqlitePool>,
    Path(run_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    runs::delete_run(&pool, run_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All runs of one route
#[utoipa::path(
    get,
    path = "/run/route/{route_id}",
    params(("route_id" = i64, Path, description = "Route id")),
    responses(
        (status = 200, description = "Runs of the route", body = [RunDetails]),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "runs"
)]
pub async fn runs_by_route(
    State(pool): State<SqlitePool>,
    Path(route_id): Path<i64>,
) -> Result<Json<Vec<RunDetails>>, AppError> {
    Ok(Json(runs::list_runs_for_route(&pool, route_id).await?))
}

/// Runs of one route starting in the next 24 hours
#[utoipa::path(
    get,
    path = "/run/route/{route_id}/next24h",
    params(("route_id" = i64, Path, description = "Route id")),
    responses(
        (status = 200, description = "Runs starting in the next 24 hours", body = [RunDetails]),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "runs"
)]
pub async fn runs_by_route_next24h(
    State(pool): State<SqlitePool>,
    Path(route_id): Path<i64>,
) -> Result<Json<Vec<RunDetails>>, AppError> {
    let now = Local::now().naive_local();
    Ok(Json(
        schedule::runs_next24h(&pool, Some(route_id), now.date(), now.time()).await?,
    ))
}

/// All runs serving one stop
#[utoipa::path(
    get,
    path = "/run/stop/{stop_id}",
    params(("stop_id" = i64, Path, description = "Stop id")),
    responses(
        (status = 200, description = "Runs serving the stop", body = [RunDetails]),
        (status = 404, description = "Stop not found", body = ErrorResponse)
    ),
    tag = "runs"
)]
pub async fn runs_by_stop(
    State(pool): State<SqlitePool>,
    Path(stop_id): Path<i64>,
) -> Result<Json<Vec<RunDetails>>, AppError> {
    Ok(Json(runs::list_runs_for_stop(&pool, stop_id).await?))
}

/// Upcoming arrivals at one stop within the next 24 hours
#[utoipa::path(
    get,
    path = "/run/stop/{stop_id}/next24h",
    params(("stop_id" = i64, Path, description = "Stop id")),
    responses(
        (status = 200, description = "Upcoming arrivals sorted by arrival time", body = [UpcomingArrival]),
        (status = 404, description = "Stop not found", body = ErrorResponse)
    ),
    tag = "runs"
)]
pub async fn arrivals_by_stop_next24h(
    State(pool): State<SqlitePool>,
    Path(stop_id): Path<i64>,
) -> Result<Json<Vec<UpcomingArrival>>, AppError> {
    let now = Local::now().naive_local();
    Ok(Json(
        schedule::arrivals_next24h_for_stop(&pool, stop_id, now).await?,
    ))
}

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/", post(create_run).get(list_runs))
        .route("/next24h", get(runs_next24h))
        .route("/{run_id}", get(get_run).delete(delete_run))
        .route("/route/{route_id}", get(runs_by_route))
        .route("/route/{route_id}/next24h", get(runs_by_route_next24h))
        .route("/stop/{stop_id}", get(runs_by_stop))
        .route("/stop/{stop_id}/next24h", get(arrivals_by_stop_next24h))
        .with_state(pool)
}
