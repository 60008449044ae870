//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{availability, bookings, catalog, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Salon Booking API",
        version = "1.0.0",
        description = "Spa and salon appointment booking REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        catalog::list_services,
        // Availability
        availability::list_available_employees,
        availability::list_available_slots,
        // Bookings
        bookings::create_booking,
        bookings::list_bookings,
        bookings::list_my_bookings,
        bookings::get_booking,
        bookings::cancel_booking,
        bookings::reschedule_booking,
        bookings::delete_booking,
        bookings::update_service_status,
        bookings::delete_service,
    ),
    components(
        schemas(
            health::HealthResponse,
            crate::error::ErrorResponse,
            // Catalog
            crate::models::Service,
            // Employees & schedules
            crate::models::Employee,
            crate::models::ScheduleEntry,
            crate::models::schedule::Shift,
            crate::models::Slot,
            // Bookings
            crate::models::Booking,
            crate::models::BookingService,
            crate::models::BookingStatus,
            crate::models::ServiceStatus,
            crate::models::PaymentMethod,
            crate::models::booking::PaymentDetails,
            crate::models::booking::CreateBooking,
            crate::models::booking::RequestedService,
            crate::models::booking::PaymentDetailsRequest,
            crate::models::booking::RescheduleBooking,
            crate::models::booking::UpdateServiceStatus,
            crate::models::booking::ServiceStatusChange,
            crate::models::booking::ServiceRemoval,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "catalog", description = "Bookable services"),
        (name = "availability", description = "Working employees and free slots"),
        (name = "bookings", description = "Booking creation and service status changes")
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
