use std::path::Path;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use route_server::config::Config;
use route_server::{api, import, MIGRATOR};

#[derive(OpenApi)]
#[openapi(
    info(title = "Route Scheduling API", version = "0.1.0"),
    paths(
        api::routes::create_route,
        api::routes::update_route_info,
        api::routes::update_route_stops,
        api::routes::update_route_status,
        api::routes::get_route,
        api::routes::list_routes,
        api::routes::delete_route,
        api::runs::create_run,
        api::runs::list_runs,
        api::runs::runs_next24h,
        api::runs::get_run,
        api::runs::delete_run,
        api::runs::runs_by_route,
        api::runs::runs_by_route_next24h,
        api::runs::runs_by_stop,
        api::runs::arrivals_by_stop_next24h,
        api::stops::create_stop,
        api::stops::list_stops,
        api::stops::get_stop,
    ),
    components(schemas(
        route_server::models::Direction,
        route_server::models::ScheduleType,
        route_server::models::RouteStatus,
        route_server::models::Stop,
        route_server::models::RouteDetails,
        route_server::models::RunDetails,
        route_server::models::StopTimeDetail,
        route_server::models::UpcomingArrival,
        route_server::services::runs::CreateRun,
        route_server::services::runs::StopTimeEntry,
        api::routes::CreateRouteRequest,
        api::routes::UpdateRouteInfoRequest,
        api::routes::UpdateRouteStopsRequest,
        api::routes::UpdateRouteStatusRequest,
        api::stops::CreateStopRequest,
        api::ErrorResponse,
    )),
    tags(
        (name = "routes", description = "Route topology management"),
        (name = "runs", description = "Scheduled runs and next-24h queries"),
        (name = "stops", description = "Stop management")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Initialize SQLite database
    let pool = SqlitePool::connect(&config.database_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    tracing::info!(migrations = MIGRATOR.migrations.len(), "Found migrations");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // One-shot timetable import; a missing or broken document must not
    // keep the server from starting.
    let schedule_file = Path::new(&config.schedule_file);
    if schedule_file.exists() {
        if let Err(e) = import::import_schedules(&pool, schedule_file).await {
            tracing::warn!(file = %config.schedule_file, error = %e, "schedule import failed");
        }
    } else {
        tracing::info!(file = %config.schedule_file, "no schedule file found, skipping import");
    }

    // Build the app
    let app = Router::new()
        .route("/", get(root))
        .merge(api::router(pool.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(addr = %config.bind_addr, "Server running");
    tracing::info!("Swagger UI: /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Route Scheduling API"
}
