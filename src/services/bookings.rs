//! Bookings service: employee assignment, commit and service status changes

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    config::BookingConfig,
    error::{AppError, AppResult},
    models::{
        booking::{
            amount_due, CreateBooking, EmployeeChoice, HeldInterval, Interval, NewBooking,
            NewBookingService, PaymentDetails, Redemption, RequestedService, ServiceRemoval,
            ServiceStatusChange,
        },
        parse_appointment, Booking, BookingStatus, Employee, PaymentMethod, ServiceStatus,
    },
    repository::{EditOutcome, Store},
};

use super::{
    booking_number::BookingNumberGenerator,
    gift_cards::{forfeiture_for, GiftCardsService},
    schedules,
};

/// Attempts at committing with a fresh booking number after a duplicate
const NUMBER_RETRIES: u32 = 5;

/// Call-local view of who is busy when, seeded from store snapshots of the
/// days touched so far and extended with every interval assigned during the call.
#[derive(Debug, Default)]
struct IntervalIndex {
    by_employee: HashMap<i32, Vec<Interval>>,
    loaded_days: HashSet<NaiveDate>,
}

impl IntervalIndex {
    /// Days the interval touches that have no snapshot yet; marks them loaded
    fn missing_days(&mut self, interval: &Interval) -> Vec<NaiveDate> {
        let mut missing = Vec::new();
        let mut day = interval.start.date_naive();
        // Half-open: ending at midnight does not touch the next day
        let last = (interval.end - Duration::nanoseconds(1)).date_naive();
        while day <= last {
            if self.loaded_days.insert(day) {
                missing.push(day);
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        missing
    }

    fn add_held(&mut self, held: Vec<HeldInterval>) {
        for h in held {
            self.hold(h.employee_id, h.interval);
        }
    }

    fn is_free(&self, employee_id: i32, interval: &Interval) -> bool {
        self.by_employee
            .get(&employee_id)
            .map_or(true, |taken| !taken.iter().any(|t| t.overlaps(interval)))
    }

    fn hold(&mut self, employee_id: i32, interval: Interval) {
        self.by_employee.entry(employee_id).or_default().push(interval);
    }
}

#[derive(Clone)]
pub struct BookingsService {
    store: Arc<dyn Store>,
    numbers: BookingNumberGenerator,
    gift_cards: GiftCardsService,
    commit_retries: u32,
}

impl BookingsService {
    pub fn new(store: Arc<dyn Store>, config: &BookingConfig) -> Self {
        Self {
            numbers: BookingNumberGenerator::new(store.clone(), config.sequential_attempts),
            gift_cards: GiftCardsService::new(store.clone()),
            store,
            commit_retries: config.commit_retries,
        }
    }

    /// Assign employees to every requested service and commit the booking.
    ///
    /// Nothing is persisted unless every service could be assigned. When the
    /// store rejects the commit because of a concurrent booking, bookings that
    /// used "any" employee are re-assigned from a fresh snapshot.
    pub async fn create_booking(&self, client_id: i32, request: CreateBooking) -> AppResult<Booking> {
        request.validate()?;
        let (date, default_start) = parse_appointment(&request.appointment_date)?;

        let discount = non_negative(request.discount_amount, "discount_amount")?;
        let tax = non_negative(request.tax_amount, "tax_amount")?;

        let details = request.payment_details.clone().unwrap_or_default();
        let code = request.gift_card_code.as_deref();
        let payment_method = request.payment_method.or_else(|| {
            (details.gift_card_id.is_some() || code.is_some()).then_some(PaymentMethod::GiftCard)
        });

        let redemption = match payment_method {
            Some(PaymentMethod::GiftCard) => Some(self.gift_cards.prepare_redemption(&details, code).await?),
            _ => None,
        };
        let payment_details = PaymentDetails {
            gift_card_id: redemption.as_ref().map(|r| r.gift_card_id),
            redeem_amount: redemption.as_ref().and_then(|r| r.requested),
            membership_id: match payment_method {
                Some(PaymentMethod::Membership) => details.membership_id,
                _ => None,
            },
            ..PaymentDetails::default()
        };

        let uses_any = request.services.iter().any(|s| s.employee == EmployeeChoice::Any);
        let mut attempt = 0;
        loop {
            let services = self.assign(default_start, &request.services).await?;

            let total_amount: Decimal = services.iter().map(|s| s.price).sum();
            let total_duration: i32 = services.iter().map(|s| s.duration).sum();
            let draft = NewBooking {
                booking_number: String::new(),
                client_id,
                appointment_date: date,
                services,
                total_amount,
                total_duration,
                discount_amount: discount,
                tax_amount: tax,
                final_amount: amount_due(total_amount, discount, tax, payment_method, None),
                payment_method,
                payment_details: payment_details.clone(),
                status: BookingStatus::Confirmed,
                notes: request.notes.clone(),
            };

            match self.commit(draft, redemption.clone()).await {
                Err(AppError::Conflict(msg)) if uses_any && attempt < self.commit_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Booking commit rejected ({}), re-assigning employees (attempt {}/{})",
                        msg,
                        attempt,
                        self.commit_retries
                    );
                }
                Ok(booking) => {
                    tracing::info!(
                        "Booking {} created for client {} on {} ({} services)",
                        booking.booking_number,
                        client_id,
                        date,
                        booking.services.len()
                    );
                    return Ok(booking);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolve one employee and interval per requested service, in order
    async fn assign(
        &self,
        default_start: DateTime<Utc>,
        items: &[RequestedService],
    ) -> AppResult<Vec<NewBookingService>> {
        let mut index = IntervalIndex::default();
        let mut candidates: Option<Vec<Employee>> = None;
        let mut assigned = Vec::with_capacity(items.len());

        for item in items {
            let service_id = item
                .service_id
                .ok_or_else(|| AppError::Validation("Service id missing on one of the service entries".to_string()))?;
            let service = self
                .store
                .get_service(service_id)
                .await?
                .filter(|s| s.is_active)
                .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", service_id)))?;

            let start = item.start_time.unwrap_or(default_start);
            let end = match item.end_time {
                Some(end) if end > start => end,
                _ => start + Duration::minutes(i64::from(service.duration)),
            };
            let interval = Interval::new(start, end);
            for day in index.missing_days(&interval) {
                index.add_held(self.store.held_intervals_on(day, None).await?);
            }
            let day = start.date_naive();

            let employee_id = match item.employee {
                EmployeeChoice::Any => {
                    if candidates.is_none() {
                        candidates = Some(self.store.list_active_employees().await?);
                    }
                    candidates
                        .iter()
                        .flatten()
                        .find(|e| schedules::is_working_on(e, day) && index.is_free(e.id, &interval))
                        .map(|e| e.id)
                        .ok_or_else(|| {
                            AppError::Conflict(format!(
                                "No employee available for {} at {}",
                                service.name,
                                start.format("%Y-%m-%d %H:%M")
                            ))
                        })?
                }
                EmployeeChoice::Specific(id) => {
                    self.store
                        .get_employee(id)
                        .await?
                        .filter(|e| e.is_active)
                        .ok_or_else(|| AppError::NotFound(format!("Employee with id {} not found", id)))?;
                    if !index.is_free(id, &interval) {
                        return Err(AppError::Conflict(format!(
                            "Employee {} is already booked between {} and {}",
                            id,
                            start.format("%H:%M"),
                            end.format("%H:%M")
                        )));
                    }
                    id
                }
            };

            tracing::debug!(
                "Assigned service {} to employee {} at {}",
                service_id,
                employee_id,
                start.format("%H:%M")
            );
            index.hold(employee_id, interval);
            assigned.push(NewBookingService {
                service_id,
                employee_id,
                price: service.price,
                duration: service.duration,
                start_time: start,
                end_time: end,
                notes: item.notes.clone(),
            });
        }

        Ok(assigned)
    }

    /// Commit with a freshly generated number, regenerating it when taken
    async fn commit(&self, mut draft: NewBooking, redemption: Option<Redemption>) -> AppResult<Booking> {
        let mut tries = 0;
        loop {
            draft.booking_number = self.numbers.generate(Utc::now()).await?;
            match self.store.commit_booking(draft.clone(), redemption.clone()).await {
                Err(AppError::DuplicateBookingNumber(number)) if tries < NUMBER_RETRIES => {
                    tries += 1;
                    tracing::warn!("Booking number {} was taken at commit, regenerating", number);
                }
                other => return other,
            }
        }
    }

    /// Get a booking; when `client_id` is given, only that client's booking
    pub async fn get_booking(&self, id: i32, client_id: Option<i32>) -> AppResult<Booking> {
        self.store
            .get_booking(id)
            .await?
            .filter(|b| client_id.map_or(true, |c| b.client_id == c))
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))
    }

    pub async fn list_client_bookings(&self, client_id: i32) -> AppResult<Vec<Booking>> {
        self.store.list_client_bookings(client_id).await
    }

    /// Bookings with an appointment date in `[start, end]`
    pub async fn list_bookings(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<Booking>> {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(AppError::Validation("end_date is before start_date".to_string()));
            }
        }
        self.store.list_bookings_between(start, end).await
    }

    /// Change one service's status and recompute the booking status from
    /// the current statuses of its services.
    ///
    /// When the change leaves a gift card booking entirely no-show, the
    /// redeemed amount is forfeited in the same commit.
    pub async fn set_service_status(
        &self,
        booking_id: i32,
        service_id: i32,
        status: &str,
    ) -> AppResult<ServiceStatusChange> {
        let status = ServiceStatus::from_request(status)
            .ok_or_else(|| AppError::Validation(format!("Invalid service status: {}", status)))?;

        let booking = self
            .store
            .modify_booking(
                booking_id,
                Box::new(move |booking: &mut Booking| {
                    let was_all_no_show = booking.is_all(ServiceStatus::NoShow);
                    let service = booking
                        .services
                        .iter_mut()
                        .find(|s| s.id == service_id)
                        .ok_or_else(|| service_not_found(service_id))?;
                    service.status = status;
                    booking.recompute_status();
                    Ok(EditOutcome::Save(forfeiture_for(was_all_no_show, booking)))
                }),
            )
            .await?;

        tracing::info!(
            "Booking {} service {} set to {}, booking now {}",
            booking.booking_number,
            service_id,
            status,
            booking.status
        );

        Ok(ServiceStatusChange {
            booking_id,
            service_id,
            status,
            booking_status: booking.status,
        })
    }

    /// Remove one service; the booking goes away with its last service
    pub async fn delete_service(&self, booking_id: i32, service_id: i32) -> AppResult<ServiceRemoval> {
        let booking = self
            .store
            .modify_booking(
                booking_id,
                Box::new(move |booking: &mut Booking| {
                    let before = booking.services.len();
                    booking.services.retain(|s| s.id != service_id);
                    if booking.services.len() == before {
                        return Err(service_not_found(service_id));
                    }
                    if booking.services.is_empty() {
                        return Ok(EditOutcome::Delete);
                    }
                    booking.recompute_totals();
                    booking.recompute_status();
                    Ok(EditOutcome::Save(None))
                }),
            )
            .await?;

        let booking_deleted = booking.services.is_empty();
        if booking_deleted {
            tracing::info!("Booking {} removed with its last service", booking.booking_number);
        }

        Ok(ServiceRemoval {
            booking_id,
            service_id,
            booking_deleted,
        })
    }

    /// Cancel every service of a booking
    pub async fn cancel_booking(&self, id: i32, client_id: Option<i32>) -> AppResult<Booking> {
        let booking = self
            .store
            .modify_booking(
                id,
                Box::new(move |booking: &mut Booking| {
                    ensure_owner(booking, client_id)?;
                    for service in booking.services.iter_mut() {
                        service.status = ServiceStatus::Cancelled;
                    }
                    booking.recompute_status();
                    Ok(EditOutcome::Save(None))
                }),
            )
            .await?;

        tracing::info!("Booking {} cancelled", booking.booking_number);
        Ok(booking)
    }

    /// Move a booking so its earliest active service starts at `new_start`.
    ///
    /// Every service is shifted by the same amount, so gaps between them are
    /// kept. The new intervals go through the same overlap check as a new
    /// booking; employees are kept as assigned.
    pub async fn reschedule_booking(
        &self,
        id: i32,
        client_id: Option<i32>,
        new_start: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let booking = self
            .store
            .modify_booking(
                id,
                Box::new(move |booking: &mut Booking| {
                    ensure_owner(booking, client_id)?;
                    let first = booking
                        .services
                        .iter()
                        .filter(|s| s.status.is_held())
                        .map(|s| s.start_time)
                        .min()
                        .ok_or_else(|| {
                            AppError::Validation(format!(
                                "Booking {} has no active service to reschedule",
                                booking.booking_number
                            ))
                        })?;
                    let shift = new_start - first;
                    for service in booking.services.iter_mut() {
                        service.start_time += shift;
                        service.end_time += shift;
                    }
                    booking.appointment_date = new_start.date_naive();
                    Ok(EditOutcome::Save(None))
                }),
            )
            .await?;

        tracing::info!(
            "Booking {} rescheduled to {}",
            booking.booking_number,
            new_start.format("%Y-%m-%d %H:%M")
        );
        Ok(booking)
    }

    pub async fn delete_booking(&self, id: i32) -> AppResult<()> {
        if !self.store.delete_booking(id).await? {
            return Err(AppError::NotFound(format!("Booking with id {} not found", id)));
        }
        Ok(())
    }
}

fn service_not_found(service_id: i32) -> AppError {
    AppError::NotFound(format!("Service {} not found in booking", service_id))
}

/// Bookings of other clients read as missing
fn ensure_owner(booking: &Booking, client_id: Option<i32>) -> AppResult<()> {
    match client_id {
        Some(client) if booking.client_id != client => {
            Err(AppError::NotFound(format!("Booking with id {} not found", booking.id)))
        }
        _ => Ok(()),
    }
}

fn non_negative(value: Option<Decimal>, field: &str) -> AppResult<Decimal> {
    let value = value.unwrap_or(Decimal::ZERO);
    if value < Decimal::ZERO {
        return Err(AppError::Validation(format!("{} cannot be negative", field)));
    }
    Ok(value)
}
