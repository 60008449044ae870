//! API handlers for the salon booking REST endpoints

pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::{error::AppError, AppState};

/// Header carrying the client id, set by the upstream authentication layer
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Extractor for the requesting client
pub struct ClientIdentity(pub i32);

#[async_trait]
impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing X-Client-Id header".to_string()))?;

        let client_id = value
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::Authentication("Invalid X-Client-Id header".to_string()))?;

        Ok(ClientIdentity(client_id))
    }
}
