//! Gift card model and balance rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Gift card lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum GiftCardStatus {
    Active,
    #[serde(rename = "Partially Used")]
    PartiallyUsed,
    Used,
    Expired,
    Cancelled,
}

impl GiftCardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GiftCardStatus::Active => "Active",
            GiftCardStatus::PartiallyUsed => "Partially Used",
            GiftCardStatus::Used => "Used",
            GiftCardStatus::Expired => "Expired",
            GiftCardStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for GiftCardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GiftCardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(GiftCardStatus::Active),
            "Partially Used" => Ok(GiftCardStatus::PartiallyUsed),
            "Used" => Ok(GiftCardStatus::Used),
            "Expired" => Ok(GiftCardStatus::Expired),
            "Cancelled" => Ok(GiftCardStatus::Cancelled),
            _ => Err(format!("Invalid gift card status: {}", s)),
        }
    }
}

/// One redemption or forfeiture event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GiftCardUsage {
    #[schema(value_type = String)]
    pub amount_used: Decimal,
    /// Client the amount was charged for
    pub used_by: Option<i32>,
    pub booking_id: Option<i32>,
    pub notes: String,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GiftCard {
    pub id: i32,
    pub code: String,
    /// Initial value
    #[schema(value_type = String)]
    pub value: Decimal,
    #[schema(value_type = String)]
    pub remaining_value: Decimal,
    pub status: GiftCardStatus,
    pub expiry_date: Option<DateTime<Utc>>,
    /// Append-only usage log
    pub usage_history: Vec<GiftCardUsage>,
}

pub const REDEEMED_AT_BOOKING: &str = "Redeemed at booking creation";
pub const FORFEITED_NO_SHOW: &str = "Auto-forfeited due to no-show";

impl GiftCard {
    /// Why the card cannot be charged right now, if it cannot
    pub fn unusable_reason(&self, now: DateTime<Utc>) -> Option<String> {
        match self.status {
            GiftCardStatus::Used | GiftCardStatus::Expired | GiftCardStatus::Cancelled => {
                return Some(format!("gift card is {}", self.status));
            }
            GiftCardStatus::Active | GiftCardStatus::PartiallyUsed => {}
        }
        if self.remaining_value <= Decimal::ZERO {
            return Some("gift card has no remaining balance".to_string());
        }
        match self.expiry_date {
            Some(expiry) if expiry < now => Some("gift card has expired".to_string()),
            _ => None,
        }
    }

    /// Charge the card for a booking.
    ///
    /// The amount is `min(requested, remaining, cap)`; a missing or non-positive
    /// request means "as much as allowed". Returns the amount actually taken.
    pub fn redeem(
        &mut self,
        requested: Option<Decimal>,
        cap: Decimal,
        used_by: Option<i32>,
        booking_id: Option<i32>,
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        let max_allowed = self.remaining_value.min(cap);
        let amount = requested
            .filter(|r| *r > Decimal::ZERO)
            .map_or(max_allowed, |r| r.min(max_allowed));
        if amount <= Decimal::ZERO {
            return None;
        }
        self.debit(amount, used_by, booking_id, REDEEMED_AT_BOOKING, now);
        Some(amount)
    }

    /// Take up to `amount` from the remaining balance without service delivered
    pub fn forfeit(
        &mut self,
        amount: Decimal,
        used_by: Option<i32>,
        booking_id: Option<i32>,
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        if self.remaining_value <= Decimal::ZERO || amount <= Decimal::ZERO {
            return None;
        }
        let taken = amount.min(self.remaining_value);
        self.debit(taken, used_by, booking_id, FORFEITED_NO_SHOW, now);
        Some(taken)
    }

    fn debit(
        &mut self,
        amount: Decimal,
        used_by: Option<i32>,
        booking_id: Option<i32>,
        notes: &str,
        now: DateTime<Utc>,
    ) {
        self.remaining_value = (self.remaining_value - amount).max(Decimal::ZERO);
        self.usage_history.push(GiftCardUsage {
            amount_used: amount,
            used_by,
            booking_id,
            notes: notes.to_string(),
            used_at: now,
        });
        self.refresh_status();
    }

    fn refresh_status(&mut self) {
        if self.remaining_value <= Decimal::ZERO {
            self.status = GiftCardStatus::Used;
        } else if self.remaining_value < self.value {
            self.status = GiftCardStatus::PartiallyUsed;
        }
    }
}
