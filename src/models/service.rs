//! Bookable service (catalog entry)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Service offered by the salon
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Service {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Price in the salon currency
    #[schema(value_type = String)]
    pub price: Decimal,
    /// Duration in minutes
    pub duration: i32,
    pub is_active: bool,
    pub is_popular: bool,
}
