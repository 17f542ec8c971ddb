pub mod routes;
pub mod runs;
pub mod stops;

pub use crate::error::ErrorResponse;

use axum::Router;
use sqlx::SqlitePool;

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .nest("/route", routes::router(pool.clone()))
        .nest("/run", runs::router(pool.clone()))
        .nest("/stop", stops::router(pool))
}
