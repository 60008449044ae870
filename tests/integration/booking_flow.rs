//! End-to-end booking flows through the services over the in-memory store

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio_test::{assert_err, assert_ok};

use salon_booking_server::{
    models::{
        booking::EmployeeChoice::{Any, Specific},
        Booking, BookingStatus, ScheduleEntry, ServiceStatus,
    },
    repository::Store,
    AppError,
};

use crate::common::*;

fn day() -> NaiveDate {
    NaiveDate::parse_from_str(DAY, "%Y-%m-%d").unwrap()
}

fn assert_no_overlaps(bookings: &[Booking]) {
    let held: Vec<_> = bookings
        .iter()
        .flat_map(|b| b.services.iter())
        .filter(|s| s.status.is_held())
        .collect();
    for (i, a) in held.iter().enumerate() {
        for b in &held[i + 1..] {
            if a.employee_id == b.employee_id {
                assert!(
                    !a.interval().overlaps(&b.interval()),
                    "employee {} double-booked: {:?} / {:?}",
                    a.employee_id,
                    a.interval(),
                    b.interval()
                );
            }
        }
    }
}

#[tokio::test]
async fn test_catalog_lists_popular_first() {
    let store = seeded_store().await;
    let mut retired = service(9, "Aromatherapy", 40, 30, true);
    retired.is_active = false;
    store.insert_service(retired).await;
    let services = services_over(store);

    let names: Vec<String> = services
        .catalog
        .list_available_services()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, ["Facial", "Massage", "Haircut"]);
}

#[tokio::test]
async fn test_slots_follow_bookings_and_overrides() {
    let store = seeded_store().await;
    let services = services_over(store.clone());

    let slots = services
        .availability
        .list_available_slots(1, MASSAGE, day())
        .await
        .unwrap();
    assert_eq!(slots.len(), 32);
    assert!(slots.iter().all(|s| s.available));

    assert_ok!(
        services
            .bookings
            .create_booking(50, booking_request(vec![(HAIRCUT, Specific(1), "10:00")]))
            .await
    );

    let slots = services
        .availability
        .list_available_slots(1, MASSAGE, day())
        .await
        .unwrap();
    let taken: Vec<&str> = slots.iter().filter(|s| !s.available).map(|s| s.time.as_str()).collect();
    assert_eq!(taken, ["10:00", "10:15"]);
    let nine_fifteen = slots.iter().find(|s| s.time == "09:15").unwrap();
    assert!(!nine_fifteen.fits_service, "a massage from 09:15 would run into 10:00");

    // A date override turns the day into a short afternoon shift
    let mut alice = employee(1, "Alice", weekdays("09:00", "17:00"));
    if let Some(schedule) = alice.work_schedule.as_mut() {
        schedule.set(DAY, ScheduleEntry::with_shifts(&[("13:00", "14:00")]));
    }
    store.insert_employee(alice).await;
    let slots = services
        .availability
        .list_available_slots(1, MASSAGE, day())
        .await
        .unwrap();
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0].time, "13:00");

    let missing = assert_err!(services.availability.list_available_slots(99, MASSAGE, day()).await);
    assert!(matches!(missing, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_available_employees_skip_days_off() {
    let store = seeded_store().await;
    let mut bruno = employee(2, "Bruno", weekdays("09:00", "17:00"));
    if let Some(schedule) = bruno.work_schedule.as_mut() {
        schedule.set(DAY, ScheduleEntry::off());
    }
    store.insert_employee(bruno).await;
    let mut gone = employee(4, "Dana", weekdays("09:00", "17:00"));
    gone.is_active = false;
    store.insert_employee(gone).await;
    let services = services_over(store);

    let ids: Vec<i32> = services
        .availability
        .list_available_employees(FACIAL, day())
        .await
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, [1, 3]);

    let sunday = day() - chrono::Duration::days(1);
    assert!(services
        .availability
        .list_available_employees(FACIAL, sunday)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_no_overlap_after_many_creates() {
    let store = seeded_store().await;
    let services = services_over(store.clone());

    let requests = [
        vec![(MASSAGE, Any, "09:00")],
        vec![(MASSAGE, Any, "09:30")],
        vec![(HAIRCUT, Specific(3), "09:00"), (FACIAL, Any, "09:30")],
        vec![(FACIAL, Specific(1), "10:00")],
        vec![(HAIRCUT, Any, "10:15")],
        vec![(MASSAGE, Any, "09:45"), (HAIRCUT, Any, "09:45")],
        vec![(HAIRCUT, Specific(2), "10:30")],
    ];

    let mut created = 0;
    for (client, items) in requests.into_iter().enumerate() {
        match services.bookings.create_booking(client as i32 + 1, booking_request(items)).await {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert!(created >= 5);

    let all = store.list_bookings_between(Some(day()), Some(day())).await.unwrap();
    assert_eq!(all.len(), created);
    assert_no_overlaps(&all);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_for_one_slot() {
    let store = seeded_store().await;
    let services = services_over(store.clone());

    let mut handles = Vec::new();
    for client in 0..8 {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services
                .bookings
                .create_booking(client, booking_request(vec![(MASSAGE, Specific(2), "11:00")]))
                .await
        }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(store.booking_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_any_requests_spread_over_staff() {
    let store = seeded_store().await;
    let services = services_over(store.clone());

    let mut handles = Vec::new();
    for client in 0..6 {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services
                .bookings
                .create_booking(client, booking_request(vec![(MASSAGE, Any, "14:00")]))
                .await
        }));
    }

    let mut employees = HashSet::new();
    for handle in handles {
        if let Ok(booking) = handle.await.unwrap() {
            assert!(employees.insert(booking.services[0].employee_id));
        }
    }
    assert_eq!(employees.len(), 3);

    let all = store.list_bookings_between(None, None).await.unwrap();
    assert_no_overlaps(&all);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reschedules_into_one_slot() {
    let store = seeded_store().await;
    let services = services_over(store.clone());

    let mut ids = Vec::new();
    for (client, start) in [(1, "09:00"), (2, "11:00"), (3, "13:00")] {
        let booking = assert_ok!(
            services
                .bookings
                .create_booking(client, booking_request(vec![(MASSAGE, Specific(1), start)]))
                .await
        );
        ids.push(booking.id);
    }

    let mut handles = Vec::new();
    for id in ids {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services.bookings.reschedule_booking(id, None, at("15:00")).await
        }));
    }

    let mut moved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => moved += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(moved, 1);

    let all = store.list_bookings_between(None, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_no_overlaps(&all);
}

#[tokio::test]
async fn test_gift_card_lifecycle() {
    let store = seeded_store().await;
    store.insert_gift_card(gift_card(1, "SPA-GIFT-01", 100)).await;
    let services = services_over(store.clone());

    let mut request = booking_request(vec![(MASSAGE, Specific(1), "10:00")]);
    request.payment_method = None;
    request.gift_card_code = Some("SPA-GIFT-01".to_string());
    request.payment_details = Some(salon_booking_server::models::booking::PaymentDetailsRequest {
        redeem_amount: Some(Decimal::from(30)),
        ..Default::default()
    });
    let booking = services.bookings.create_booking(42, request).await.unwrap();

    assert_eq!(booking.payment_details.redeemed_amount, Some(Decimal::from(30)));
    assert_eq!(booking.final_amount, Decimal::from(50));
    let card = store.get_gift_card(1).await.unwrap().unwrap();
    assert_eq!(card.remaining_value, Decimal::from(70));
    assert_eq!(card.usage_history[0].booking_id, Some(booking.id));
    assert_eq!(card.usage_history[0].used_by, Some(42));

    let change = services
        .bookings
        .set_service_status(booking.id, booking.services[0].id, "no-show")
        .await
        .unwrap();
    assert_eq!(change.status, ServiceStatus::NoShow);
    assert_eq!(change.booking_status, BookingStatus::NoShow);

    let card = store.get_gift_card(1).await.unwrap().unwrap();
    assert_eq!(card.remaining_value, Decimal::from(40));
    assert_eq!(card.usage_history.len(), 2);
}

#[tokio::test]
async fn test_admin_listing_by_range() {
    let store = seeded_store().await;
    let services = services_over(store);

    services
        .bookings
        .create_booking(1, booking_request(vec![(HAIRCUT, Any, "09:00")]))
        .await
        .unwrap();
    let mut next_day = booking_request(vec![(HAIRCUT, Any, "09:00")]);
    next_day.appointment_date = "2025-06-03T09:00:00Z".to_string();
    next_day.services[0].start_time = None;
    let tuesday = services.bookings.create_booking(1, next_day).await.unwrap();
    assert_eq!(tuesday.services[0].start_time.to_rfc3339(), "2025-06-03T09:00:00+00:00");

    let only_monday = services
        .bookings
        .list_bookings(Some(day()), Some(day()))
        .await
        .unwrap();
    assert_eq!(only_monday.len(), 1);

    let everything = services.bookings.list_bookings(None, None).await.unwrap();
    assert_eq!(everything.len(), 2);

    let mine = services.bookings.list_client_bookings(1).await.unwrap();
    assert_eq!(mine[0].id, tuesday.id);

    let backwards = services
        .bookings
        .list_bookings(Some(day()), Some(day() - chrono::Duration::days(1)))
        .await;
    assert!(matches!(backwards, Err(AppError::Validation(_))));
}
