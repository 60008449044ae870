//! Booking endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{
            BookingQuery, CreateBooking, RescheduleBooking, ServiceRemoval, ServiceStatusChange,
            UpdateServiceStatus,
        },
        parse_date, Booking,
    },
    AppState,
};

use super::ClientIdentity;

/// Create a booking, assigning employees to every requested service
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    params(
        ("X-Client-Id" = Option<i32>, Header, description = "Requesting client, when not given in the body")
    ),
    request_body = CreateBooking,
    responses(
        (status = 201, description = "Booking created", body = Booking),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "No client identity"),
        (status = 404, description = "Service, employee or gift card not found"),
        (status = 409, description = "Requested time is already booked")
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    identity: Option<ClientIdentity>,
    Json(request): Json<CreateBooking>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let client_id = request
        .client_id
        .or(identity.map(|ClientIdentity(id)| id))
        .ok_or_else(|| AppError::Authentication("Client identity required".to_string()))?;

    let booking = state.services.bookings.create_booking(client_id, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// List bookings by appointment date range
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    params(BookingQuery),
    responses(
        (status = 200, description = "Bookings in range", body = Vec<Booking>),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingQuery>,
) -> AppResult<Json<Vec<Booking>>> {
    let start = query
        .start_date
        .as_deref()
        .map(|d| parse_date(d, "start_date"))
        .transpose()?;
    let end = query
        .end_date
        .as_deref()
        .map(|d| parse_date(d, "end_date"))
        .transpose()?;

    let bookings = state.services.bookings.list_bookings(start, end).await?;
    Ok(Json(bookings))
}

/// List the requesting client's bookings
#[utoipa::path(
    get,
    path = "/bookings/mine",
    tag = "bookings",
    params(
        ("X-Client-Id" = i32, Header, description = "Requesting client")
    ),
    responses(
        (status = 200, description = "Client bookings, newest first", body = Vec<Booking>),
        (status = 401, description = "No client identity")
    )
)]
pub async fn list_my_bookings(
    State(state): State<AppState>,
    ClientIdentity(client_id): ClientIdentity,
) -> AppResult<Json<Vec<Booking>>> {
    let bookings = state.services.bookings.list_client_bookings(client_id).await?;
    Ok(Json(bookings))
}

/// Get a booking by ID
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = i32, Path, description = "Booking ID"),
        ("X-Client-Id" = Option<i32>, Header, description = "Restrict to this client's bookings")
    ),
    responses(
        (status = 200, description = "Booking details", body = Booking),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    identity: Option<ClientIdentity>,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    let client_id = identity.map(|ClientIdentity(id)| id);
    let booking = state.services.bookings.get_booking(id, client_id).await?;
    Ok(Json(booking))
}

/// Cancel every service of a booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    params(
        ("id" = i32, Path, description = "Booking ID"),
        ("X-Client-Id" = Option<i32>, Header, description = "Restrict to this client's bookings")
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    identity: Option<ClientIdentity>,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    let client_id = identity.map(|ClientIdentity(id)| id);
    let booking = state.services.bookings.cancel_booking(id, client_id).await?;
    Ok(Json(booking))
}

/// Move the requesting client's booking to a new start
#[utoipa::path(
    post,
    path = "/bookings/{id}/reschedule",
    tag = "bookings",
    params(
        ("id" = i32, Path, description = "Booking ID"),
        ("X-Client-Id" = i32, Header, description = "Requesting client")
    ),
    request_body = RescheduleBooking,
    responses(
        (status = 200, description = "Booking rescheduled", body = Booking),
        (status = 400, description = "Nothing left to reschedule"),
        (status = 401, description = "No client identity"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "New time is already booked")
    )
)]
pub async fn reschedule_booking(
    State(state): State<AppState>,
    ClientIdentity(client_id): ClientIdentity,
    Path(id): Path<i32>,
    Json(request): Json<RescheduleBooking>,
) -> AppResult<Json<Booking>> {
    let booking = state
        .services
        .bookings
        .reschedule_booking(id, Some(client_id), request.new_date_time)
        .await?;
    Ok(Json(booking))
}

/// Delete a booking
#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = i32, Path, description = "Booking ID")
    ),
    responses(
        (status = 204, description = "Booking deleted"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.bookings.delete_booking(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change the status of one service inside a booking
#[utoipa::path(
    put,
    path = "/bookings/{id}/services/{service_id}/status",
    tag = "bookings",
    params(
        ("id" = i32, Path, description = "Booking ID"),
        ("service_id" = i32, Path, description = "Booking service ID")
    ),
    request_body = UpdateServiceStatus,
    responses(
        (status = 200, description = "Status updated", body = ServiceStatusChange),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Booking or service not found"),
        (status = 409, description = "Re-activated service overlaps another booking")
    )
)]
pub async fn update_service_status(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(i32, i32)>,
    Json(request): Json<UpdateServiceStatus>,
) -> AppResult<Json<ServiceStatusChange>> {
    let change = state
        .services
        .bookings
        .set_service_status(id, service_id, &request.status)
        .await?;
    Ok(Json(change))
}

/// Remove one service from a booking
#[utoipa::path(
    delete,
    path = "/bookings/{id}/services/{service_id}",
    tag = "bookings",
    params(
        ("id" = i32, Path, description = "Booking ID"),
        ("service_id" = i32, Path, description = "Booking service ID")
    ),
    responses(
        (status = 200, description = "Service removed", body = ServiceRemoval),
        (status = 404, description = "Booking or service not found")
    )
)]
pub async fn delete_service(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(i32, i32)>,
) -> AppResult<Json<ServiceRemoval>> {
    let removal = state.services.bookings.delete_service(id, service_id).await?;
    Ok(Json(removal))
}
