//! Data models for the salon booking server

pub mod booking;
pub mod employee;
pub mod gift_card;
pub mod schedule;
pub mod service;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{AppError, AppResult};

// Re-export commonly used types
pub use booking::{Booking, BookingService, BookingStatus, PaymentMethod, ServiceStatus};
pub use employee::Employee;
pub use gift_card::{GiftCard, GiftCardStatus};
pub use schedule::{ScheduleEntry, Slot, WorkSchedule};
pub use service::Service;

/// Parse a calendar date (YYYY-MM-DD)
pub fn parse_date(value: &str, field: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid {} (use YYYY-MM-DD)", field)))
}

/// Parse an appointment given either as a date or as an RFC 3339 date-time.
///
/// Returns the calendar day and the instant services default to; a bare date
/// defaults to midnight.
pub fn parse_appointment(value: &str) -> AppResult<(NaiveDate, DateTime<Utc>)> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        let instant = instant.with_timezone(&Utc);
        return Ok((instant.date_naive(), instant));
    }
    let date = parse_date(value, "appointment_date")?;
    Ok((date, date.and_time(chrono::NaiveTime::MIN).and_utc()))
}
