//! Schedule resolution and slot generation

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::{booking::Interval, Employee, ScheduleEntry, Slot};

/// Width of a candidate slot, in minutes
pub const SLOT_MINUTES: i64 = 15;

/// Effective schedule entry of an employee on a date.
///
/// A date-keyed entry wins over the weekday entry, even when it marks the day
/// off. The legacy schedule is only consulted when `work_schedule` is missing
/// or has neither key.
pub fn resolve(employee: &Employee, date: NaiveDate) -> Option<&ScheduleEntry> {
    if let Some(schedule) = &employee.work_schedule {
        if let Some(entry) = schedule.date(date) {
            tracing::debug!("Employee {} uses date override for {}", employee.id, date);
            return Some(entry);
        }
        if let Some(entry) = schedule.weekday(date.weekday()) {
            return Some(entry);
        }
    }

    employee
        .legacy_work_schedule
        .as_ref()
        .and_then(|legacy| legacy.weekday(date.weekday()))
}

/// Whether the resolved entry marks the employee as working on that date
pub fn is_working_on(employee: &Employee, date: NaiveDate) -> bool {
    resolve(employee, date).map_or(false, |entry| entry.is_working)
}

/// Minutes since midnight of an `HH:MM` clock value; `24:00` is the end of the day
pub fn parse_clock(value: &str) -> Option<i64> {
    let mut parts = value.trim().split(':');
    let hours: i64 = parts.next()?.trim().parse().ok()?;
    let minutes: i64 = parts.next()?.trim().parse().ok()?;
    // Seconds are tolerated but ignored
    if let Some(seconds) = parts.next() {
        seconds.trim().parse::<u32>().ok()?;
    }
    if parts.next().is_some() || !(0..60).contains(&minutes) {
        return None;
    }
    match hours {
        0..=23 => Some(hours * 60 + minutes),
        24 if minutes == 0 => Some(24 * 60),
        _ => None,
    }
}

fn at_clock(date: NaiveDate, minutes: i64) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc() + Duration::minutes(minutes)
}

fn period(date: NaiveDate, start: &str, end: &str) -> Option<Interval> {
    let (Some(from), Some(to)) = (parse_clock(start), parse_clock(end)) else {
        tracing::warn!("Skipping working period with unreadable bounds {}-{}", start, end);
        return None;
    };
    if to <= from {
        tracing::warn!("Skipping empty working period {}-{}", start, end);
        return None;
    }
    Some(Interval::new(at_clock(date, from), at_clock(date, to)))
}

/// Working periods of an entry on a date, in declaration order.
///
/// `shifts_data` is authoritative when non-empty; otherwise the single
/// start/end pair is used when the day is a working day.
pub fn working_periods(entry: &ScheduleEntry, date: NaiveDate) -> Vec<Interval> {
    if !entry.shifts_data.is_empty() {
        return entry
            .shifts_data
            .iter()
            .filter_map(|shift| period(date, &shift.start_time, &shift.end_time))
            .collect();
    }

    match (entry.is_working, &entry.start_time, &entry.end_time) {
        (true, Some(start), Some(end)) => period(date, start, end).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// 15-minute slots starting at the period start while before its end.
/// The last slot is not clipped to the period end.
pub fn slots_for_period(period: Interval) -> Vec<Slot> {
    let step = Duration::minutes(SLOT_MINUTES);
    let mut slots = Vec::new();
    let mut t = period.start;
    while t < period.end {
        slots.push(Slot {
            time: t.format("%H:%M").to_string(),
            start_time: t,
            end_time: t + step,
            available: true,
            fits_service: false,
        });
        t += step;
    }
    slots
}

/// Candidate slots of a resolved entry, grouped by working period
pub fn slot_periods(entry: &ScheduleEntry, date: NaiveDate) -> Vec<Vec<Slot>> {
    working_periods(entry, date).into_iter().map(slots_for_period).collect()
}

/// Candidate slots of a resolved entry, all periods flattened in order
pub fn generate_slots(entry: &ScheduleEntry, date: NaiveDate) -> Vec<Slot> {
    slot_periods(entry, date).into_iter().flatten().collect()
}
