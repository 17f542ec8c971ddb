use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::ErrorResponse;
use crate::error::AppError;
use crate::models::{RouteDetails, RouteStatus};
use crate::services::topology;
use crate::store;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRouteRequest {
    pub name: String,
    pub num: String,
    pub description: Option<String>,
    /// Defaults to ACTIVE.
    pub status: Option<RouteStatus>,
    pub osm_id: Option<i64>,
    /// Stop ids in forward (ALLER) order.
    pub stop_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRouteInfoRequest {
    pub id: i64,
    pub name: String,
    pub num: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRouteStopsRequest {
    pub id: i64,
    /// Replacement stop id list in forward (ALLER) order.
    pub stop_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRouteStatusRequest {
    pub id: i64,
    pub status: RouteStatus,
}

async fn route_details(pool: &SqlitePool, route_id: i64) -> Result<RouteDetails, AppError> {
    let route = store::routes::get_route(pool, route_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route with id {route_id} not found")))?;
    let stop_ids = store::routes::forward_stop_ids(pool, route_id).await?;
    Ok(RouteDetails::from_route(route, stop_ids))
}

/// Create a route with its ordered stop list
#[utoipa::path(
    post,
    path = "/route",
    request_body = CreateRouteRequest,
    responses(
        (status = 200, description = "Created route", body = RouteDetails),
        (status = 400, description = "Invalid stop id list", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn create_route(
    State(pool): State<SqlitePool>,
    Json(request): Json<CreateRouteRequest>,
) -> Result<Json<RouteDetails>, AppError> {
    topology::validate_stop_ids(&pool, &request.stop_ids).await?;

    let mut tx = pool.begin().await?;
    let route_id = store::routes::insert_route(
        &mut tx,
        &request.name,
        &request.num,
        request.description.as_deref(),
        request.status.unwrap_or(RouteStatus::Active),
        request.osm_id,
    )
    .await?;
    topology::insert_ordered_stops(&mut tx, route_id, &request.stop_ids).await?;
    tx.commit().await?;

    tracing::info!(route_id, name = %request.name, stops = request.stop_ids.len(), "created route");
    Ok(Json(route_details(&pool, route_id).await?))
}

/// Update a route's display fields
#[utoipa::path(
    put,
    path = "/route/update/info",
    request_body = UpdateRouteInfoRequest,
    responses(
        (status = 200, description = "Updated route", body = RouteDetails),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn update_route_info(
    State(pool): State<SqlitePool>,
    Json(request): Json<UpdateRouteInfoRequest>,
) -> Result<Json<RouteDetails>, AppError> {
    let updated = store::routes::update_route_info(
        &pool,
        request.id,
        &request.name,
        &request.num,
        request.description.as_deref(),
    )
    .await?;
    if !updated {
        return Err(AppError::NotFound(format!(
            "Route with id {} not found",
            request.id
        )));
    }
    Ok(Json(route_details(&pool, request.id).await?))
}

/// Replace a route's ordered stop list
#[utoipa::path(
    put,
    path = "/route/update/stops",
    request_body = UpdateRouteStopsRequest,
    responses(
        (status = 200, description = "Updated route", body = RouteDetails),
        (status = 400, description = "Invalid stop id list", body = ErrorResponse),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn update_route_stops(
    State(pool): State<SqlitePool>,
    Json(request): Json<UpdateRouteStopsRequest>,
) -> Result<Json<RouteDetails>, AppError> {
    topology::set_route_stops(&pool, request.id, &request.stop_ids).await?;
    Ok(Json(route_details(&pool, request.id).await?))
}

/// Change a route's status
#[utoipa::path(
    put,
    path = "/route/update/status",
    request_body = UpdateRouteStatusRequest,
    responses(
        (status = 200, description = "Updated route", body = RouteDetails),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn update_route_status(
    State(pool): State<SqlitePool>,
    Json(request): Json<UpdateRouteStatusRequest>,
) -> Result<Json<RouteDetails>, AppError> {
    if !store::routes::update_route_status(&pool, request.id, request.status).await? {
        return Err(AppError::NotFound(format!(
            "Route with id {} not found",
            request.id
        )));
    }
    Ok(Json(route_details(&pool, request.id).await?))
}

/// Get one route
#[utoipa::path(
    get,
    path = "/route/{route_id}",
    params(("route_id" = i64, Path, description = "Route id")),
    responses(
        (status = 200, description = "Route with ordered stop ids", body = RouteDetails),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route(
    State(pool): State<SqlitePool>,
    Path(route_id): Path<i64>,
) -> Result<Json<RouteDetails>, AppError> {
    Ok(Json(route_details(&pool, route_id).await?))
}

/// List all routes
#[utoipa::path(
    get,
    path = "/route",
    responses(
        (status = 200, description = "All routes", body = [RouteDetails])
    ),
    tag = "routes"
)]
pub async fn list_routes(
    State(pool): State<SqlitePool>,
) -> Result<Json<Vec<RouteDetails>>, AppError> {
    let routes = store::routes::list_routes(&pool).await?;
    let mut details = Vec::with_capacity(routes.len());
    for route in routes {
        let stop_ids = store::routes::forward_stop_ids(&pool, route.id).await?;
        details.push(RouteDetails::from_route(route, stop_ids));
    }
    Ok(Json(details))
}

/// Delete a route and its stop associations
#[utoipa::path(
    delete,
    path = "/route/{route_id}",
    params(("route_id" = i64, Path, description = "Route id")),
    responses(
        (status = 204, description = "Route deleted"),
        (status = 404, description = "Route not found", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn delete_route(
    State(pool): State<SqlitePool>,
    Path(route_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !store::routes::delete_route(&pool, route_id).await? {
        return Err(AppError::NotFound(format!(
            "Route with id {route_id} not found"
        )));
    }
    tracing::info!(route_id, "deleted route");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/", post(create_route).get(list_routes))
        .route("/update/info", put(update_route_info))
        .route("/update/stops", put(update_route_stops))
        .route("/update/status", put(update_route_status))
        .route("/{route_id}", get(get_route).delete(delete_route))
        .with_state(pool)
}
