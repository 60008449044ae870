//! Gift card settlement around bookings

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Forfeiture, PaymentDetailsRequest, Redemption},
        Booking, PaymentMethod, ServiceStatus,
    },
    repository::Store,
};

#[derive(Clone)]
pub struct GiftCardsService {
    store: Arc<dyn Store>,
}

impl GiftCardsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve the card a gift card payment refers to, by id or by code.
    ///
    /// The card's usability is only decided at commit time, under the row lock.
    pub async fn prepare_redemption(
        &self,
        details: &PaymentDetailsRequest,
        code: Option<&str>,
    ) -> AppResult<Redemption> {
        if details.redeem_amount.map_or(false, |a| a < Decimal::ZERO) {
            return Err(AppError::Validation("redeem_amount cannot be negative".to_string()));
        }

        let card = match (details.gift_card_id, code.map(str::trim).filter(|c| !c.is_empty())) {
            (Some(id), _) => self
                .store
                .get_gift_card(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Gift card with id {} not found", id)))?,
            (None, Some(code)) => self
                .store
                .get_gift_card_by_code(code)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Gift card {} not found", code)))?,
            (None, None) => {
                return Err(AppError::Validation(
                    "Gift card payment requires gift_card_id or gift_card_code".to_string(),
                ))
            }
        };

        Ok(Redemption {
            gift_card_id: card.id,
            requested: details.redeem_amount,
        })
    }
}

/// Forfeiture owed when a gift card booking has just become all no-show.
///
/// `was_all_no_show` is the state before the status change; a booking that
/// already was all no-show never forfeits twice.
pub fn forfeiture_for(was_all_no_show: bool, booking: &Booking) -> Option<Forfeiture> {
    if was_all_no_show || !booking.is_all(ServiceStatus::NoShow) {
        return None;
    }
    if booking.payment_method != Some(PaymentMethod::GiftCard) {
        return None;
    }
    let gift_card_id = booking.payment_details.gift_card_id?;
    let amount = booking
        .payment_details
        .redeemed_amount
        .filter(|a| *a > Decimal::ZERO)?;

    Some(Forfeiture { gift_card_id, amount })
}
