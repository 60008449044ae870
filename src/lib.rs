//! Salon Booking Server
//!
//! REST JSON API for a spa/salon: service catalog, employee availability
//! computed from layered work schedules, and conflict-free booking with
//! gift card and membership settlement.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Catalog
        .route("/services", get(api::catalog::list_services))
        // Availability
        .route("/employees/available", get(api::availability::list_available_employees))
        .route("/availability/slots", get(api::availability::list_available_slots))
        // Bookings
        .route(
            "/bookings",
            get(api::bookings::list_bookings).post(api::bookings::create_booking),
        )
        .route("/bookings/mine", get(api::bookings::list_my_bookings))
        .route(
            "/bookings/:id",
            get(api::bookings::get_booking).delete(api::bookings::delete_booking),
        )
        .route("/bookings/:id/cancel", post(api::bookings::cancel_booking))
        .route("/bookings/:id/reschedule", post(api::bookings::reschedule_booking))
        .route(
            "/bookings/:id/services/:service_id",
            axum::routing::delete(api::bookings::delete_service),
        )
        .route(
            "/bookings/:id/services/:service_id/status",
            put(api::bookings::update_service_status),
        )
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
