//! Repository layer for database operations

pub mod bookings;
pub mod catalog;
pub mod employees;
pub mod gift_cards;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        booking::{amount_due, Forfeiture, HeldInterval, NewBooking, PaymentDetails, Redemption},
        Booking, Employee, GiftCard, Service,
    },
};

/// Persistent storage consumed by the booking services.
///
/// Lookups return `Ok(None)` when the entity does not exist. The three write
/// operations (`commit_booking`, `modify_booking`, `delete_booking`) are atomic:
/// they either apply every change, gift card included, or none.
#[async_trait]
pub trait Store: Send + Sync {
    /// Connectivity check used by the readiness endpoint
    async fn ping(&self) -> AppResult<()>;

    // ---- Employees ----
    async fn get_employee(&self, id: i32) -> AppResult<Option<Employee>>;
    /// Active employees in ascending id order
    async fn list_active_employees(&self) -> AppResult<Vec<Employee>>;

    // ---- Catalog ----
    async fn get_service(&self, id: i32) -> AppResult<Option<Service>>;
    async fn list_active_services(&self) -> AppResult<Vec<Service>>;

    // ---- Gift cards ----
    async fn get_gift_card(&self, id: i32) -> AppResult<Option<GiftCard>>;
    async fn get_gift_card_by_code(&self, code: &str) -> AppResult<Option<GiftCard>>;

    // ---- Bookings ----
    async fn get_booking(&self, id: i32) -> AppResult<Option<Booking>>;
    async fn list_client_bookings(&self, client_id: i32) -> AppResult<Vec<Booking>>;
    /// Bookings whose appointment date falls in `[start, end]`
    async fn list_bookings_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<Booking>>;
    /// Held service intervals overlapping `date`, optionally for one employee
    async fn held_intervals_on(
        &self,
        date: NaiveDate,
        employee_id: Option<i32>,
    ) -> AppResult<Vec<HeldInterval>>;

    // ---- Booking numbers ----
    async fn booking_number_exists(&self, number: &str) -> AppResult<bool>;
    /// Highest booking number with `prefix` and exactly `len` characters
    async fn highest_booking_number(&self, prefix: &str, len: usize) -> AppResult<Option<String>>;
    /// Next value of the per-day booking number counter (starts at 1)
    async fn next_booking_sequence(&self, day: NaiveDate) -> AppResult<i64>;

    // ---- Writes ----
    /// Insert a booking after re-checking every assigned interval under a
    /// per-day lock. Overlap yields `Conflict`, a taken booking number yields
    /// `DuplicateBookingNumber`. The redemption, if any, is applied to the
    /// row-locked gift card in the same transaction.
    async fn commit_booking(
        &self,
        booking: NewBooking,
        redemption: Option<Redemption>,
    ) -> AppResult<Booking>;
    /// Run `edit` on the current state of a booking while holding its row
    /// lock, then persist the result in the same transaction. Held services
    /// are re-checked against other bookings under the per-day lock; an
    /// overlap yields `Conflict`. Returns the booking as edited.
    async fn modify_booking(&self, id: i32, edit: BookingEdit) -> AppResult<Booking>;
    /// Returns false when the booking did not exist
    async fn delete_booking(&self, id: i32) -> AppResult<bool>;
}

/// What to persist once an edit has been applied to a locked booking
pub enum EditOutcome {
    /// Write the edited booking back, forfeiting gift card balance if given
    Save(Option<Forfeiture>),
    /// Remove the booking and its services
    Delete,
}

/// Edit applied to a booking read under its lock; an error aborts the write
pub type BookingEdit = Box<dyn FnOnce(&mut Booking) -> AppResult<EditOutcome> + Send>;

/// Postgres-backed store holding the connection pool and the per-table repositories
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub employees: employees::EmployeesRepository,
    pub catalog: catalog::CatalogRepository,
    pub bookings: bookings::BookingsRepository,
    pub gift_cards: gift_cards::GiftCardsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            employees: employees::EmployeesRepository::new(pool.clone()),
            catalog: catalog::CatalogRepository::new(pool.clone()),
            bookings: bookings::BookingsRepository::new(pool.clone()),
            gift_cards: gift_cards::GiftCardsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl Store for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_employee(&self, id: i32) -> AppResult<Option<Employee>> {
        self.employees.get_by_id(id).await
    }

    async fn list_active_employees(&self) -> AppResult<Vec<Employee>> {
        self.employees.list_active().await
    }

    async fn get_service(&self, id: i32) -> AppResult<Option<Service>> {
        self.catalog.get_by_id(id).await
    }

    async fn list_active_services(&self) -> AppResult<Vec<Service>> {
        self.catalog.list_active().await
    }

    async fn get_gift_card(&self, id: i32) -> AppResult<Option<GiftCard>> {
        self.gift_cards.get_by_id(id).await
    }

    async fn get_gift_card_by_code(&self, code: &str) -> AppResult<Option<GiftCard>> {
        self.gift_cards.get_by_code(code).await
    }

    async fn get_booking(&self, id: i32) -> AppResult<Option<Booking>> {
        self.bookings.get_by_id(id).await
    }

    async fn list_client_bookings(&self, client_id: i32) -> AppResult<Vec<Booking>> {
        self.bookings.list_for_client(client_id).await
    }

    async fn list_bookings_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<Booking>> {
        self.bookings.list_between(start, end).await
    }

    async fn held_intervals_on(
        &self,
        date: NaiveDate,
        employee_id: Option<i32>,
    ) -> AppResult<Vec<HeldInterval>> {
        self.bookings.held_intervals_on(date, employee_id).await
    }

    async fn booking_number_exists(&self, number: &str) -> AppResult<bool> {
        self.bookings.number_exists(number).await
    }

    async fn highest_booking_number(&self, prefix: &str, len: usize) -> AppResult<Option<String>> {
        self.bookings.highest_number(prefix, len).await
    }

    async fn next_booking_sequence(&self, day: NaiveDate) -> AppResult<i64> {
        self.bookings.next_sequence(day).await
    }

    async fn commit_booking(
        &self,
        booking: NewBooking,
        redemption: Option<Redemption>,
    ) -> AppResult<Booking> {
        self.bookings.commit(booking, redemption, &self.gift_cards).await
    }

    async fn modify_booking(&self, id: i32, edit: BookingEdit) -> AppResult<Booking> {
        self.bookings.modify(id, edit, &self.gift_cards).await
    }

    async fn delete_booking(&self, id: i32) -> AppResult<bool> {
        self.bookings.delete(id).await
    }
}

/// Outcome of charging a gift card while committing a booking
pub(crate) struct Settlement {
    pub payment_details: PaymentDetails,
    pub final_amount: Decimal,
    /// Whether the card balance changed and must be written back
    pub charged: bool,
}

/// Charge `card` for a booking being committed.
///
/// An unusable card leaves the balance alone and records the reason in the
/// payment details; the booking still goes through.
pub(crate) fn settle_redemption(
    card: &mut GiftCard,
    redemption: &Redemption,
    booking: &NewBooking,
    booking_id: i32,
    now: DateTime<Utc>,
) -> Settlement {
    let mut payment_details = booking.payment_details.clone();

    if let Some(reason) = card.unusable_reason(now) {
        tracing::warn!(
            "Skipping redemption of gift card {} for booking {}: {}",
            card.id,
            booking.booking_number,
            reason
        );
        payment_details.redemption_skipped = Some(reason);
        return Settlement {
            payment_details,
            final_amount: booking.final_amount,
            charged: false,
        };
    }

    match card.redeem(
        redemption.requested,
        booking.total_amount,
        Some(booking.client_id),
        Some(booking_id),
        now,
    ) {
        Some(amount) => {
            tracing::debug!("Redeemed {} from gift card {}", amount, card.id);
            payment_details.redeemed_amount = Some(amount);
            Settlement {
                final_amount: amount_due(
                    booking.total_amount,
                    booking.discount_amount,
                    booking.tax_amount,
                    booking.payment_method,
                    Some(amount),
                ),
                payment_details,
                charged: true,
            }
        }
        None => Settlement {
            payment_details,
            final_amount: booking.final_amount,
            charged: false,
        },
    }
}
