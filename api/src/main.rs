use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod ai;
mod error;
mod extract;
mod identity;
mod middleware;
mod routes;
mod state;
mod store;
mod window;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nosh API",
        version = "0.1.0",
        description = "Meal tracking backend: AI-assisted food logging, meal plans, and day-bucketed progress dashboards."
    ),
    paths(
        routes::health::health_check,
        routes::dashboard::dashboard,
        routes::progress::get_progress,
        routes::progress::save_progress,
        routes::food_log::log_meal,
        routes::food_log::list_logs,
        routes::food_log::add_water,
        routes::meal_plan::generate_meal_plan,
        routes::health_tips::generate_tips,
        routes::recipes::generate_recipe,
    ),
    components(schemas(
        HealthResponse,
        nosh_core::error::ApiError,
        nosh_core::aggregate::DashboardSummary,
        nosh_core::aggregate::DailyBucket,
        nosh_core::aggregate::ProgressStatus,
        nosh_core::records::Goal,
        nosh_core::records::WorkoutFrequency,
        nosh_core::payload::MealPlan,
        nosh_core::payload::MealSection,
        nosh_core::payload::CalorieEstimate,
        nosh_core::payload::Recipe,
        routes::progress::SaveProgressRequest,
        routes::progress::SaveProgressResponse,
        routes::progress::ProgressResponse,
        routes::food_log::LogMealRequest,
        routes::food_log::LogMealResponse,
        routes::food_log::FoodLogEntry,
        routes::food_log::AddWaterRequest,
        routes::food_log::AddWaterResponse,
        nosh_core::records::PaginatedResponse<routes::food_log::FoodLogEntry>,
        routes::meal_plan::MealPlanRequest,
        routes::health_tips::TipsRequest,
        routes::health_tips::TipsResponse,
        routes::recipes::RecipeRequest,
        routes::recipes::RecipeResponse,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nosh_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Database connection
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let ai_client = ai::OpenRouterClient::from_env().expect("AI client configuration");

    let app_state = state::AppState {
        db: pool,
        ai: Arc::new(ai_client),
        tz: state::service_timezone(),
    };

    // CORS
    let cors_layer = middleware::cors::build_cors_layer();

    // Router with per-endpoint rate limiting; AI-backed routes get the
    // tightest budget since each request costs a model call
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::dashboard::router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::progress::read_router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::progress::write_router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::food_log::read_router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::food_log::write_router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::food_log::ai_router().layer(middleware::rate_limit::ai_layer()))
        .merge(routes::meal_plan::router().layer(middleware::rate_limit::ai_layer()))
        .merge(routes::health_tips::router().layer(middleware::rate_limit::ai_layer()))
        .merge(routes::recipes::router().layer(middleware::rate_limit::ai_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Nosh API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
