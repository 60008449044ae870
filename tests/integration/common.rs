//! Shared fixtures: a small salon seeded into the in-memory store

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use salon_booking_server::{
    config::BookingConfig,
    models::{
        booking::{CreateBooking, EmployeeChoice, RequestedService},
        Employee, GiftCard, GiftCardStatus, PaymentMethod, ScheduleEntry, Service, WorkSchedule,
    },
    repository::memory::MemoryStore,
    services::Services,
};

/// A Monday
pub const DAY: &str = "2025-06-02";

pub const HAIRCUT: i32 = 1;
pub const FACIAL: i32 = 2;
pub const MASSAGE: i32 = 3;

pub fn at(time: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&format!("{}T{}:00Z", DAY, time))
        .unwrap()
        .with_timezone(&Utc)
}

pub fn employee(id: i32, name: &str, schedule: WorkSchedule) -> Employee {
    Employee {
        id,
        first_name: name.to_string(),
        last_name: "Doe".to_string(),
        position: Some("Stylist".to_string()),
        is_active: true,
        work_schedule: Some(schedule),
        legacy_work_schedule: None,
    }
}

pub fn service(id: i32, name: &str, price: i64, duration: i32, popular: bool) -> Service {
    Service {
        id,
        name: name.to_string(),
        description: None,
        category: None,
        price: Decimal::from(price),
        duration,
        is_active: true,
        is_popular: popular,
    }
}

pub fn gift_card(id: i32, code: &str, value: i64) -> GiftCard {
    GiftCard {
        id,
        code: code.to_string(),
        value: Decimal::from(value),
        remaining_value: Decimal::from(value),
        status: GiftCardStatus::Active,
        expiry_date: None,
        usage_history: Vec::new(),
    }
}

pub fn weekdays(start: &str, end: &str) -> WorkSchedule {
    ["monday", "tuesday", "wednesday", "thursday", "friday"]
        .iter()
        .fold(WorkSchedule::new(), |schedule, day| {
            schedule.with(day, ScheduleEntry::working(start, end))
        })
}

/// Three employees working Monday 09:00-17:00 and three services
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_employee(employee(1, "Alice", weekdays("09:00", "17:00"))).await;
    store.insert_employee(employee(2, "Bruno", weekdays("09:00", "17:00"))).await;
    store.insert_employee(employee(3, "Chloe", weekdays("09:00", "17:00"))).await;
    store.insert_service(service(HAIRCUT, "Haircut", 35, 30, false)).await;
    store.insert_service(service(FACIAL, "Facial", 50, 45, true)).await;
    store.insert_service(service(MASSAGE, "Massage", 80, 60, true)).await;
    store
}

pub fn services_over(store: Arc<MemoryStore>) -> Services {
    Services::new(store, &BookingConfig::default())
}

pub fn booking_request(items: Vec<(i32, EmployeeChoice, &str)>) -> CreateBooking {
    CreateBooking {
        client_id: None,
        appointment_date: DAY.to_string(),
        services: items
            .into_iter()
            .map(|(service_id, employee, start)| RequestedService {
                service_id: Some(service_id),
                employee,
                start_time: Some(at(start)),
                end_time: None,
                notes: None,
            })
            .collect(),
        notes: None,
        payment_method: Some(PaymentMethod::Card),
        payment_details: None,
        gift_card_code: None,
        discount_amount: None,
        tax_amount: None,
    }
}
