//! Availability endpoints (working employees and bookable slots)

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{parse_date, Employee, Slot},
    AppState,
};

/// Query parameters for available employees
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeesQuery {
    /// Service to be performed
    pub service_id: i32,
    /// Day (YYYY-MM-DD)
    pub date: String,
}

/// Query parameters for available slots
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SlotsQuery {
    pub employee_id: i32,
    pub service_id: i32,
    /// Day (YYYY-MM-DD)
    pub date: String,
}

/// List active employees working on a date
#[utoipa::path(
    get,
    path = "/employees/available",
    tag = "availability",
    params(EmployeesQuery),
    responses(
        (status = 200, description = "Employees working that day", body = Vec<Employee>),
        (status = 400, description = "Invalid date"),
        (status = 404, description = "Service not found")
    )
)]
pub async fn list_available_employees(
    State(state): State<AppState>,
    Query(query): Query<EmployeesQuery>,
) -> AppResult<Json<Vec<Employee>>> {
    let date = parse_date(&query.date, "date")?;
    let employees = state
        .services
        .availability
        .list_available_employees(query.service_id, date)
        .await?;
    Ok(Json(employees))
}

/// List an employee's 15-minute slots for a service on a date
#[utoipa::path(
    get,
    path = "/availability/slots",
    tag = "availability",
    params(SlotsQuery),
    responses(
        (status = 200, description = "All candidate slots with their availability", body = Vec<Slot>),
        (status = 400, description = "Invalid date"),
        (status = 404, description = "Employee or service not found")
    )
)]
pub async fn list_available_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<Vec<Slot>>> {
    let date = parse_date(&query.date, "date")?;
    let slots = state
        .services
        .availability
        .list_available_slots(query.employee_id, query.service_id, date)
        .await?;
    Ok(Json(slots))
}
