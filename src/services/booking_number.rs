//! Human-readable booking numbers: `BK` + `yymmdd` + a disambiguator

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{error::AppResult, repository::Store};

#[derive(Clone)]
pub struct BookingNumberGenerator {
    store: Arc<dyn Store>,
    sequential_attempts: u32,
}

/// Prefix shared by every booking number issued on the day of `now`
pub fn day_prefix(now: DateTime<Utc>) -> String {
    format!("BK{}", now.format("%y%m%d"))
}

impl BookingNumberGenerator {
    pub fn new(store: Arc<dyn Store>, sequential_attempts: u32) -> Self {
        Self {
            store,
            sequential_attempts,
        }
    }

    /// Issue a booking number not used by any persisted booking.
    ///
    /// Tries, in order: timestamp digits plus a random suffix, a sequential
    /// 4-digit counter, and finally the store's per-day counter (6 digits).
    pub async fn generate(&self, now: DateTime<Utc>) -> AppResult<String> {
        let prefix = day_prefix(now);

        let millis = now.timestamp_millis().rem_euclid(1_000_000);
        let suffix: u32 = rand::thread_rng().gen_range(0..99);
        let candidate = format!("{}{:06}{:02}", prefix, millis, suffix);
        if !self.store.booking_number_exists(&candidate).await? {
            return Ok(candidate);
        }
        tracing::debug!("Booking number {} taken, switching to sequential numbering", candidate);

        let sequential_len = prefix.len() + 4;
        for _ in 0..self.sequential_attempts {
            let next = match self.store.highest_booking_number(&prefix, sequential_len).await? {
                Some(highest) => highest[prefix.len()..].parse::<u32>().unwrap_or(0) + 1,
                None => 1,
            };
            if next > 9999 {
                break;
            }
            let candidate = format!("{}{:04}", prefix, next);
            if !self.store.booking_number_exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        tracing::warn!("Sequential booking numbers exhausted for {}, using day counter", prefix);
        let sequence = self.store.next_booking_sequence(now.date_naive()).await?;
        Ok(format!("{}{:06}", prefix, sequence))
    }
}
