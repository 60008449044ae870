//! In-memory store, used by tests and local runs without a database

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{HeldInterval, Interval, NewBooking, Redemption},
        Booking, BookingService, Employee, GiftCard, Service, ServiceStatus,
    },
};

use super::{settle_redemption, BookingEdit, EditOutcome, Store};

#[derive(Default)]
struct State {
    employees: BTreeMap<i32, Employee>,
    services: BTreeMap<i32, Service>,
    gift_cards: BTreeMap<i32, GiftCard>,
    bookings: BTreeMap<i32, Booking>,
    sequences: HashMap<NaiveDate, i64>,
    last_booking_id: i32,
    last_booking_service_id: i32,
}

impl State {
    fn held(&self) -> impl Iterator<Item = (i32, &BookingService)> + '_ {
        self.bookings.values().flat_map(|b| {
            b.services
                .iter()
                .filter(|s| s.status.is_held())
                .map(move |s| (b.id, s))
        })
    }

    fn find_overlap(&self, employee_id: i32, interval: Interval, exclude_booking: Option<i32>) -> bool {
        self.held().any(|(booking_id, s)| {
            Some(booking_id) != exclude_booking
                && s.employee_id == employee_id
                && s.interval().overlaps(&interval)
        })
    }
}

/// Store keeping everything behind one async mutex.
///
/// Every operation runs under the lock, so writes are atomic the same way
/// the Postgres transactions are.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_employee(&self, employee: Employee) {
        self.state.lock().await.employees.insert(employee.id, employee);
    }

    pub async fn insert_service(&self, service: Service) {
        self.state.lock().await.services.insert(service.id, service);
    }

    pub async fn insert_gift_card(&self, card: GiftCard) {
        self.state.lock().await.gift_cards.insert(card.id, card);
    }

    /// Number of persisted bookings
    pub async fn booking_count(&self) -> usize {
        self.state.lock().await.bookings.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_employee(&self, id: i32) -> AppResult<Option<Employee>> {
        Ok(self.state.lock().await.employees.get(&id).cloned())
    }

    async fn list_active_employees(&self) -> AppResult<Vec<Employee>> {
        let state = self.state.lock().await;
        Ok(state.employees.values().filter(|e| e.is_active).cloned().collect())
    }

    async fn get_service(&self, id: i32) -> AppResult<Option<Service>> {
        Ok(self.state.lock().await.services.get(&id).cloned())
    }

    async fn list_active_services(&self) -> AppResult<Vec<Service>> {
        let state = self.state.lock().await;
        Ok(state.services.values().filter(|s| s.is_active).cloned().collect())
    }

    async fn get_gift_card(&self, id: i32) -> AppResult<Option<GiftCard>> {
        Ok(self.state.lock().await.gift_cards.get(&id).cloned())
    }

    async fn get_gift_card_by_code(&self, code: &str) -> AppResult<Option<GiftCard>> {
        let state = self.state.lock().await;
        Ok(state
            .gift_cards
            .values()
            .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
            .cloned())
    }

    async fn get_booking(&self, id: i32) -> AppResult<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn list_client_bookings(&self, client_id: i32) -> AppResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.client_id == client_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| {
            b.appointment_date
                .cmp(&a.appointment_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(bookings)
    }

    async fn list_bookings_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| start.map_or(true, |s| b.appointment_date >= s))
            .filter(|b| end.map_or(true, |e| b.appointment_date <= e))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.appointment_date, b.id));
        Ok(bookings)
    }

    async fn held_intervals_on(
        &self,
        date: NaiveDate,
        employee_id: Option<i32>,
    ) -> AppResult<Vec<HeldInterval>> {
        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day = Interval::new(day_start, day_start + chrono::Duration::days(1));

        let state = self.state.lock().await;
        let mut held: Vec<HeldInterval> = state
            .held()
            .filter(|(_, s)| employee_id.map_or(true, |id| s.employee_id == id))
            .filter(|(_, s)| s.interval().overlaps(&day))
            .map(|(_, s)| HeldInterval {
                employee_id: s.employee_id,
                interval: s.interval(),
            })
            .collect();
        held.sort_by_key(|h| h.interval.start);
        Ok(held)
    }

    async fn booking_number_exists(&self, number: &str) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.bookings.values().any(|b| b.booking_number == number))
    }

    async fn highest_booking_number(&self, prefix: &str, len: usize) -> AppResult<Option<String>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .map(|b| &b.booking_number)
            .filter(|n| n.starts_with(prefix) && n.len() == len)
            .max()
            .cloned())
    }

    async fn next_booking_sequence(&self, day: NaiveDate) -> AppResult<i64> {
        let mut state = self.state.lock().await;
        let counter = state.sequences.entry(day).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn commit_booking(
        &self,
        new: NewBooking,
        redemption: Option<Redemption>,
    ) -> AppResult<Booking> {
        let mut state = self.state.lock().await;

        for svc in &new.services {
            if state.find_overlap(svc.employee_id, svc.interval(), None) {
                return Err(AppError::Conflict(format!(
                    "Employee {} is already booked between {} and {}",
                    svc.employee_id,
                    svc.start_time.format("%H:%M"),
                    svc.end_time.format("%H:%M")
                )));
            }
        }
        if state.bookings.values().any(|b| b.booking_number == new.booking_number) {
            return Err(AppError::DuplicateBookingNumber(new.booking_number));
        }

        let now = Utc::now();
        let id = state.last_booking_id + 1;

        let mut payment_details = new.payment_details.clone();
        let mut final_amount = new.final_amount;
        if let Some(redemption) = &redemption {
            let card = state.gift_cards.get_mut(&redemption.gift_card_id).ok_or_else(|| {
                AppError::NotFound(format!("Gift card with id {} not found", redemption.gift_card_id))
            })?;
            let settlement = settle_redemption(card, redemption, &new, id, now);
            payment_details = settlement.payment_details;
            final_amount = settlement.final_amount;
        }

        state.last_booking_id = id;
        let mut services = Vec::with_capacity(new.services.len());
        for svc in new.services {
            state.last_booking_service_id += 1;
            services.push(BookingService {
                id: state.last_booking_service_id,
                service_id: svc.service_id,
                employee_id: svc.employee_id,
                price: svc.price,
                duration: svc.duration,
                start_time: svc.start_time,
                end_time: svc.end_time,
                status: ServiceStatus::Confirmed,
                notes: svc.notes,
            });
        }

        let booking = Booking {
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
        };
        state.bookings.insert(id, booking.clone());
        Ok(booking)
    }

    async fn modify_booking(&self, id: i32, edit: BookingEdit) -> AppResult<Booking> {
        let mut state = self.state.lock().await;

        let mut booking = state
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))?;

        let forfeiture = match edit(&mut booking)? {
            EditOutcome::Delete => {
                state.bookings.remove(&id);
                return Ok(booking);
            }
            EditOutcome::Save(forfeiture) => forfeiture,
        };

        for svc in booking.services.iter().filter(|s| s.status.is_held()) {
            if state.find_overlap(svc.employee_id, svc.interval(), Some(booking.id)) {
                return Err(AppError::Conflict(format!(
                    "Employee {} is already booked between {} and {}",
                    svc.employee_id,
                    svc.start_time.format("%H:%M"),
                    svc.end_time.format("%H:%M")
                )));
            }
        }

        let now = Utc::now();
        if let Some(forfeiture) = forfeiture {
            match state.gift_cards.get_mut(&forfeiture.gift_card_id) {
                Some(card) => {
                    card.forfeit(forfeiture.amount, Some(booking.client_id), Some(booking.id), now);
                }
                None => tracing::warn!(
                    "Gift card {} of booking {} no longer exists, nothing to forfeit",
                    forfeiture.gift_card_id,
                    booking.booking_number
                ),
            }
        }

        booking.updated_at = now;
        state.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn delete_booking(&self, id: i32) -> AppResult<bool> {
        Ok(self.state.lock().await.bookings.remove(&id).is_some())
    }
}
