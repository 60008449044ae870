//! Service catalog endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, models::Service, AppState};

/// List bookable services, popular first
#[utoipa::path(
    get,
    path = "/services",
    tag = "catalog",
    responses(
        (status = 200, description = "Active services", body = Vec<Service>)
    )
)]
pub async fn list_services(State(state): State<AppState>) -> AppResult<Json<Vec<Service>>> {
    let services = state.services.catalog.list_available_services().await?;
    Ok(Json(services))
}
