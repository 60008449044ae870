//! Booking number uniqueness across one day, fallbacks included

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use salon_booking_server::{
    models::{
        booking::{NewBooking, PaymentDetails},
        BookingStatus,
    },
    repository::{memory::MemoryStore, Store},
    services::booking_number::{day_prefix, BookingNumberGenerator},
};

fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-02T08:15:42.123Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn empty_booking(number: String) -> NewBooking {
    NewBooking {
        booking_number: number,
        client_id: 1,
        appointment_date: fixed_now().date_naive(),
        services: Vec::new(),
        total_amount: Decimal::ZERO,
        total_duration: 0,
        discount_amount: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        final_amount: Decimal::ZERO,
        payment_method: None,
        payment_details: PaymentDetails::default(),
        status: BookingStatus::Confirmed,
        notes: None,
    }
}

async fn issue(store: &Arc<MemoryStore>, generator: &BookingNumberGenerator, count: usize) -> Vec<String> {
    let mut numbers = Vec::with_capacity(count);
    for _ in 0..count {
        let number = generator.generate(fixed_now()).await.unwrap();
        store.commit_booking(empty_booking(number.clone()), None).await.unwrap();
        numbers.push(number);
    }
    numbers
}

#[tokio::test]
async fn test_unique_with_sequential_fallback() {
    let store = Arc::new(MemoryStore::new());
    let generator = BookingNumberGenerator::new(store.clone(), 10);

    // Same instant every time: only 99 primary numbers exist
    let numbers = issue(&store, &generator, 130).await;

    let unique: HashSet<&String> = numbers.iter().collect();
    assert_eq!(unique.len(), numbers.len());

    let prefix = day_prefix(fixed_now());
    assert!(numbers.iter().all(|n| n.starts_with(&prefix)));
    let sequential: Vec<&String> = numbers.iter().filter(|n| n.len() == prefix.len() + 4).collect();
    assert!(sequential.len() >= 31);
    assert!(sequential.contains(&&format!("{}0001", prefix)));
}

#[tokio::test]
async fn test_unique_with_day_counter_fallback() {
    let store = Arc::new(MemoryStore::new());
    let generator = BookingNumberGenerator::new(store.clone(), 0);

    let numbers = issue(&store, &generator, 120).await;

    let unique: HashSet<&String> = numbers.iter().collect();
    assert_eq!(unique.len(), numbers.len());

    let prefix = day_prefix(fixed_now());
    let counted: Vec<&String> = numbers.iter().filter(|n| n.len() == prefix.len() + 6).collect();
    assert!(counted.len() >= 21);
    assert!(counted.contains(&&format!("{}000001", prefix)));
}
