//! Gift cards repository for database operations

use sqlx::{postgres::PgRow, types::Json, PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{gift_card::GiftCardUsage, GiftCard, GiftCardStatus},
};

const GIFT_CARD_COLUMNS: &str = "id, code, value, remaining_value, status, expiry_date, usage_history";

#[derive(Clone)]
pub struct GiftCardsRepository {
    pool: Pool<Postgres>,
}

impl GiftCardsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get gift card by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<GiftCard>> {
        let row = sqlx::query(&format!("SELECT {} FROM gift_cards WHERE id = $1", GIFT_CARD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(gift_card_from_row).transpose()
    }

    /// Get gift card by its code (case-insensitive)
    pub async fn get_by_code(&self, code: &str) -> AppResult<Option<GiftCard>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM gift_cards WHERE UPPER(code) = UPPER($1)",
            GIFT_CARD_COLUMNS
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(gift_card_from_row).transpose()
    }

    /// Load a gift card and lock its row until the surrounding transaction ends
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<GiftCard>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM gift_cards WHERE id = $1 FOR UPDATE",
            GIFT_CARD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        row.as_ref().map(gift_card_from_row).transpose()
    }

    /// Write back balance, status and usage history
    pub async fn save(&self, conn: &mut PgConnection, card: &GiftCard) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE gift_cards
            SET remaining_value = $1, status = $2, usage_history = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(card.remaining_value)
        .bind(card.status.as_str())
        .bind(Json(&card.usage_history))
        .bind(card.id)
        .execute(conn)
        .await?;

        Ok(())
    }
}

fn gift_card_from_row(row: &PgRow) -> AppResult<GiftCard> {
    let status: String = row.get("status");
    let status: GiftCardStatus = status.parse().map_err(AppError::Internal)?;
    let usage_history: Option<Json<Vec<GiftCardUsage>>> = row.get("usage_history");

    Ok(GiftCard {
        id: row.get("id"),
        code: row.get("code"),
        value: row.get("value"),
        remaining_value: row.get("remaining_value"),
        status,
        expiry_date: row.get("expiry_date"),
        usage_history: usage_history.map(|Json(h)| h).unwrap_or_default(),
    })
}
