pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::config::Config;
use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::services::{application_service::ApplicationService, stats_service::StatsService};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub application_service: ApplicationService,
    pub stats_service: StatsService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        let application_service = ApplicationService::new(pool.clone());
        let stats_service =
            StatsService::new(application_service.clone(), config.report_timezone.clone());

        Self {
            pool,
            application_service,
            stats_service,
        }
    }
}

/// Full HTTP surface. Only submissions go through the rate limiter.
pub fn build_router(state: AppState, public_rps: u32) -> Router {
    let submit = post(routes::applications::submit_application).layer(
        axum::middleware::from_fn_with_state(RateLimiter::new(public_rps), rps_middleware),
    );

    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/applications",
            get(routes::applications::list_applications).merge(submit),
        )
        .route(
            "/applications/:id",
            get(routes::applications::get_application)
                .patch(routes::applications::update_application)
                .delete(routes::applications::delete_application),
        )
        .route("/stats", get(routes::stats::get_stats))
        .route("/api-docs/openapi.json", get(routes::docs::openapi_json))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
