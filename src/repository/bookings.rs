//! Bookings repository for database operations

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, types::Json, PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Forfeiture, HeldInterval, Interval, NewBooking, PaymentDetails, Redemption},
        Booking, BookingService, BookingStatus, PaymentMethod, ServiceStatus,
    },
};

use super::{gift_cards::GiftCardsRepository, settle_redemption, BookingEdit, EditOutcome};

/// First key of the per-day advisory lock taken around booking writes
const BOOKING_LOCK_CLASS: i32 = 0x5A4C;

const BOOKING_NUMBER_CONSTRAINT: &str = "bookings_booking_number_key";

const BOOKING_COLUMNS: &str = r#"
    id, booking_number, client_id, appointment_date, total_amount, total_duration,
    discount_amount, tax_amount, final_amount, payment_method, payment_details,
    status, notes, created_at, updated_at
"#;

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get booking by ID, services included
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut conn = self.pool.acquire().await?;
                Ok(attach_services(&mut conn, vec![row]).await?.pop())
            }
            None => Ok(None),
        }
    }

    /// Bookings of a client, newest appointment first
    pub async fn list_for_client(&self, client_id: i32) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookings WHERE client_id = $1 ORDER BY appointment_date DESC, created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        attach_services(&mut conn, rows).await
    }

    /// Bookings with an appointment date in `[start, end]`; open bounds are unbounded
    pub async fn list_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM bookings
            WHERE ($1::date IS NULL OR appointment_date >= $1)
              AND ($2::date IS NULL OR appointment_date <= $2)
            ORDER BY appointment_date, id
            "#,
            BOOKING_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        attach_services(&mut conn, rows).await
    }

    /// Held service intervals touching the given day
    pub async fn held_intervals_on(
        &self,
        date: NaiveDate,
        employee_id: Option<i32>,
    ) -> AppResult<Vec<HeldInterval>> {
        let (day_start, day_end) = day_bounds(date);
        let rows = sqlx::query(
            r#"
            SELECT employee_id, start_time, end_time
            FROM booking_services
            WHERE status = ANY($1)
              AND start_time < $3 AND end_time > $2
              AND ($4::int IS NULL OR employee_id = $4)
            ORDER BY start_time
            "#,
        )
        .bind(held_statuses())
        .bind(day_start)
        .bind(day_end)
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| HeldInterval {
                employee_id: r.get("employee_id"),
                interval: Interval::new(r.get("start_time"), r.get("end_time")),
            })
            .collect())
    }

    pub async fn number_exists(&self, number: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bookings WHERE booking_number = $1)")
                .bind(number)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Highest booking number with the given prefix and exact length
    pub async fn highest_number(&self, prefix: &str, len: usize) -> AppResult<Option<String>> {
        let number: Option<String> = sqlx::query_scalar(
            r#"
            SELECT booking_number FROM bookings
            WHERE booking_number LIKE $1 || '%' AND LENGTH(booking_number) = $2
            ORDER BY booking_number DESC
            LIMIT 1
            "#,
        )
        .bind(prefix)
        .bind(len as i32)
        .fetch_optional(&self.pool)
        .await?;
        Ok(number)
    }

    /// Atomically bump and return the booking number counter of a day
    pub async fn next_sequence(&self, day: NaiveDate) -> AppResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO booking_number_sequences (day, last_value) VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET last_value = booking_number_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }

    /// Insert a booking behind the per-day lock, re-checking overlaps, and
    /// apply the gift card redemption in the same transaction
    pub async fn commit(
        &self,
        new: NewBooking,
        redemption: Option<Redemption>,
        gift_cards: &GiftCardsRepository,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let intervals: Vec<Interval> = new.services.iter().map(|s| s.interval()).collect();
        lock_days(&mut tx, &intervals).await?;

        for svc in &new.services {
            if interval_taken(&mut tx, svc.employee_id, svc.interval(), None).await? {
                return Err(AppError::Conflict(format!(
                    "Employee {} is already booked between {} and {}",
                    svc.employee_id,
                    svc.start_time.format("%H:%M"),
                    svc.end_time.format("%H:%M")
                )));
            }
        }

        let now = Utc::now();
        let mut payment_details = new.payment_details.clone();
        let mut final_amount = new.final_amount;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO bookings (
                booking_number, client_id, appointment_date, total_amount, total_duration,
                discount_amount, tax_amount, final_amount, payment_method, payment_details,
                status, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING id
            "#,
        )
        .bind(&new.booking_number)
        .bind(new.client_id)
        .bind(new.appointment_date)
        .bind(new.total_amount)
        .bind(new.total_duration)
        .bind(new.discount_amount)
        .bind(new.tax_amount)
        .bind(final_amount)
        .bind(new.payment_method.map(|m| m.as_str()))
        .bind(Json(&payment_details))
        .bind(new.status.as_str())
        .bind(&new.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_number_taken(&e) {
                AppError::DuplicateBookingNumber(new.booking_number.clone())
            } else {
                AppError::Database(e)
            }
        })?;

        let mut services = Vec::with_capacity(new.services.len());
        for (position, svc) in new.services.iter().enumerate() {
            let service_row_id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO booking_services (
                    booking_id, position, service_id, employee_id, price, duration,
                    start_time, end_time, status, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id
                "#,
            )
            .bind(id)
            .bind(position as i32)
            .bind(svc.service_id)
            .bind(svc.employee_id)
            .bind(svc.price)
            .bind(svc.duration)
            .bind(svc.start_time)
            .bind(svc.end_time)
            .bind(ServiceStatus::Confirmed.as_str())
            .bind(&svc.notes)
            .fetch_one(&mut *tx)
            .await?;

            services.push(BookingService {
                id: service_row_id,
                service_id: svc.service_id,
                employee_id: svc.employee_id,
                price: svc.price,
                duration: svc.duration,
                start_time: svc.start_time,
                end_time: svc.end_time,
                status: ServiceStatus::Confirmed,
                notes: svc.notes.clone(),
            });
        }

        if let Some(redemption) = redemption {
            let mut card = gift_cards
                .lock(&mut tx, redemption.gift_card_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Gift card with id {} not found", redemption.gift_card_id))
                })?;

            let settlement = settle_redemption(&mut card, &redemption, &new, id, now);
            if settlement.charged {
                gift_cards.save(&mut tx, &card).await?;
            }
            payment_details = settlement.payment_details;
            final_amount = settlement.final_amount;

            sqlx::query("UPDATE bookings SET final_amount = $1, payment_details = $2 WHERE id = $3")
                .bind(final_amount)
                .bind(Json(&payment_details))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Booking {
            id,
            booking_number: new.booking_number,
            client_id: new.client_id,
            appointment_date: new.appointment_date,
            services,
            total_amount: new.total_amount,
            total_duration: new.total_duration,
            discount_amount: new.discount_amount,
            tax_amount: new.tax_amount,
            final_amount,
            payment_method: new.payment_method,
            payment_details,
            status: new.status,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an edit to a booking read under `FOR UPDATE` and persist it in
    /// the same transaction
    pub async fn modify(
        &self,
        id: i32,
        edit: BookingEdit,
        gift_cards: &GiftCardsRepository,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {} FROM bookings WHERE id = $1 FOR UPDATE", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))?;
        let mut booking = attach_services(&mut tx, vec![row])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))?;

        match edit(&mut booking)? {
            EditOutcome::Delete => {
                sqlx::query("DELETE FROM bookings WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            EditOutcome::Save(forfeiture) => {
                booking.updated_at = Utc::now();
                persist(&mut tx, &booking, forfeiture, gift_cards).await?;
            }
        }

        tx.commit().await?;
        Ok(booking)
    }

    /// Delete a booking and its services
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Load the services of the given booking rows and build the bookings
async fn attach_services(conn: &mut PgConnection, rows: Vec<PgRow>) -> AppResult<Vec<Booking>> {
    let ids: Vec<i32> = rows.iter().map(|r| r.get("id")).collect();
    let service_rows = sqlx::query(
        r#"
        SELECT id, booking_id, service_id, employee_id, price, duration,
               start_time, end_time, status, notes
        FROM booking_services
        WHERE booking_id = ANY($1)
        ORDER BY booking_id, position
        "#,
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    let mut by_booking: HashMap<i32, Vec<BookingService>> = HashMap::new();
    for row in &service_rows {
        let status: String = row.get("status");
        by_booking
            .entry(row.get("booking_id"))
            .or_default()
            .push(BookingService {
                id: row.get("id"),
                service_id: row.get("service_id"),
                employee_id: row.get("employee_id"),
                price: row.get("price"),
                duration: row.get("duration"),
                start_time: row.get("start_time"),
                end_time: row.get("end_time"),
                status: status.parse().map_err(AppError::Internal)?,
                notes: row.get("notes"),
            });
    }

    rows.iter()
        .map(|row| {
            let id: i32 = row.get("id");
            booking_from_row(row, by_booking.remove(&id).unwrap_or_default())
        })
        .collect()
}

fn booking_from_row(row: &PgRow, services: Vec<BookingService>) -> AppResult<Booking> {
    let status: String = row.get("status");
    let payment_method: Option<String> = row.get("payment_method");
    let payment_details: Option<Json<PaymentDetails>> = row.get("payment_details");

    Ok(Booking {
        id: row.get("id"),
        booking_number: row.get("booking_number"),
        client_id: row.get("client_id"),
        appointment_date: row.get("appointment_date"),
        services,
        total_amount: row.get("total_amount"),
        total_duration: row.get("total_duration"),
        discount_amount: row.get::<Option<Decimal>, _>("discount_amount").unwrap_or_default(),
        tax_amount: row.get::<Option<Decimal>, _>("tax_amount").unwrap_or_default(),
        final_amount: row.get("final_amount"),
        payment_method: payment_method
            .map(|m| m.parse::<PaymentMethod>())
            .transpose()
            .map_err(AppError::Internal)?,
        payment_details: payment_details.map(|Json(d)| d).unwrap_or_default(),
        status: status.parse::<BookingStatus>().map_err(AppError::Internal)?,
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Write back services, totals and payment details of a locked booking and
/// apply the forfeiture, if any, to the row-locked gift card
async fn persist(
    conn: &mut PgConnection,
    booking: &Booking,
    forfeiture: Option<Forfeiture>,
    gift_cards: &GiftCardsRepository,
) -> AppResult<()> {
    let intervals: Vec<Interval> = booking.services.iter().map(|s| s.interval()).collect();
    lock_days(&mut *conn, &intervals).await?;

    // Held services must not land on top of someone else's booking
    for svc in booking.services.iter().filter(|s| s.status.is_held()) {
        if interval_taken(&mut *conn, svc.employee_id, svc.interval(), Some(booking.id)).await? {
            return Err(AppError::Conflict(format!(
                "Employee {} is already booked between {} and {}",
                svc.employee_id,
                svc.start_time.format("%H:%M"),
                svc.end_time.format("%H:%M")
            )));
        }
    }

    let kept: Vec<i32> = booking.services.iter().map(|s| s.id).collect();
    sqlx::query("DELETE FROM booking_services WHERE booking_id = $1 AND NOT (id = ANY($2))")
        .bind(booking.id)
        .bind(&kept)
        .execute(&mut *conn)
        .await?;

    for svc in &booking.services {
        sqlx::query(
            r#"
            UPDATE booking_services
            SET status = $1, notes = $2, start_time = $3, end_time = $4
            WHERE id = $5 AND booking_id = $6
            "#,
        )
        .bind(svc.status.as_str())
        .bind(&svc.notes)
        .bind(svc.start_time)
        .bind(svc.end_time)
        .bind(svc.id)
        .bind(booking.id)
        .execute(&mut *conn)
        .await?;
    }

    sqlx::query(
        r#"
        UPDATE bookings
        SET appointment_date = $1, total_amount = $2, total_duration = $3, final_amount = $4,
            payment_details = $5, status = $6, notes = $7, updated_at = $8
        WHERE id = $9
        "#,
    )
    .bind(booking.appointment_date)
    .bind(booking.total_amount)
    .bind(booking.total_duration)
    .bind(booking.final_amount)
    .bind(Json(&booking.payment_details))
    .bind(booking.status.as_str())
    .bind(&booking.notes)
    .bind(booking.updated_at)
    .bind(booking.id)
    .execute(&mut *conn)
    .await?;

    if let Some(forfeiture) = forfeiture {
        match gift_cards.lock(&mut *conn, forfeiture.gift_card_id).await? {
            Some(mut card) => {
                if let Some(taken) = card.forfeit(
                    forfeiture.amount,
                    Some(booking.client_id),
                    Some(booking.id),
                    Utc::now(),
                ) {
                    gift_cards.save(&mut *conn, &card).await?;
                    tracing::info!(
                        "Forfeited {} from gift card {} after no-show on booking {}",
                        taken,
                        card.id,
                        booking.booking_number
                    );
                }
            }
            None => tracing::warn!(
                "Gift card {} of booking {} no longer exists, nothing to forfeit",
                forfeiture.gift_card_id,
                booking.booking_number
            ),
        }
    }

    Ok(())
}

fn held_statuses() -> Vec<&'static str> {
    ServiceStatus::HELD.iter().map(|s| s.as_str()).collect()
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Take the advisory lock of every day the intervals touch, in ascending order
async fn lock_days(conn: &mut PgConnection, intervals: &[Interval]) -> AppResult<()> {
    let mut days = BTreeSet::new();
    for interval in intervals {
        let mut day = interval.start.date_naive();
        let last = interval.end.date_naive();
        while day <= last {
            days.insert(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }

    for day in days {
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(BOOKING_LOCK_CLASS)
            .bind(day.num_days_from_ce())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn interval_taken(
    conn: &mut PgConnection,
    employee_id: i32,
    interval: Interval,
    exclude_booking: Option<i32>,
) -> AppResult<bool> {
    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM booking_services
            WHERE employee_id = $1
              AND status = ANY($2)
              AND start_time < $4 AND end_time > $3
              AND ($5::int IS NULL OR booking_id <> $5)
        )
        "#,
    )
    .bind(employee_id)
    .bind(held_statuses())
    .bind(interval.start)
    .bind(interval.end)
    .bind(exclude_booking)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

fn is_number_taken(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.constraint() == Some(BOOKING_NUMBER_CONSTRAINT))
}
