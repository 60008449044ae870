//! Availability service: bookable slots and working employees

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{HeldInterval, Interval},
        Employee, Slot,
    },
    repository::Store,
};

use super::schedules::{self, SLOT_MINUTES};

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn Store>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Slots an employee could serve a service at on a date.
    ///
    /// Slots overlapping a held booking are returned with `available = false`
    /// rather than dropped.
    pub async fn list_available_slots(
        &self,
        employee_id: i32,
        service_id: i32,
        date: NaiveDate,
    ) -> AppResult<Vec<Slot>> {
        let employee = self
            .store
            .get_employee(employee_id)
            .await?
            .filter(|e| e.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Employee with id {} not found", employee_id)))?;
        let service = self
            .store
            .get_service(service_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", service_id)))?;

        let entry = match schedules::resolve(&employee, date) {
            Some(entry) if entry.is_working => entry,
            _ => {
                tracing::debug!("Employee {} is not working on {}", employee_id, date);
                return Ok(Vec::new());
            }
        };

        let held = self.store.held_intervals_on(date, Some(employee_id)).await?;
        let periods = schedules::slot_periods(entry, date);

        Ok(mark_slots(periods, &held, service.duration))
    }

    /// Active employees working on a date, for a given service
    pub async fn list_available_employees(
        &self,
        service_id: i32,
        date: NaiveDate,
    ) -> AppResult<Vec<Employee>> {
        self.store
            .get_service(service_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", service_id)))?;

        let employees = self.store.list_active_employees().await?;
        Ok(employees
            .into_iter()
            .filter(|e| schedules::is_working_on(e, date))
            .collect())
    }
}

/// Flag each slot against held intervals and compute whether the service
/// fits in the run of free slots starting there, within the same period.
pub fn mark_slots(periods: Vec<Vec<Slot>>, held: &[HeldInterval], duration: i32) -> Vec<Slot> {
    let needed = (i64::from(duration.max(1)) + SLOT_MINUTES - 1) / SLOT_MINUTES;
    let needed = needed as usize;

    let mut out = Vec::new();
    for mut slots in periods {
        for slot in slots.iter_mut() {
            let interval = Interval::new(slot.start_time, slot.end_time);
            slot.available = !held.iter().any(|h| h.interval.overlaps(&interval));
        }

        let mut run = 0usize;
        for slot in slots.iter_mut().rev() {
            run = if slot.available { run + 1 } else { 0 };
            slot.fits_service = run >= needed;
        }

        out.extend(slots);
    }
    out
}
