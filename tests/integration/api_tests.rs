//! API smoke tests against a running server with a seeded database

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Client id sent through the upstream identity header
const CLIENT_ID: &str = "1";

/// First active service and first employee working on `date`
async fn pick_service_and_employee(client: &Client, date: &str) -> (i64, i64) {
    let services: Value = client
        .get(format!("{}/services", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse services");
    let service_id = services[0]["id"].as_i64().expect("No service seeded");

    let employees: Value = client
        .get(format!("{}/employees/available?service_id={}&date={}", BASE_URL, service_id, date))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse employees");
    let employee_id = employees[0]["id"].as_i64().expect("Nobody works that day");

    (service_id, employee_id)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_list_services() {
    let client = Client::new();

    let response = client
        .get(format!("{}/services", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_slots_then_book_then_cancel() {
    let client = Client::new();
    let date = (chrono::Utc::now() + chrono::Duration::days(7)).format("%Y-%m-%d").to_string();
    let (service_id, employee_id) = pick_service_and_employee(&client, &date).await;

    let slots: Value = client
        .get(format!(
            "{}/availability/slots?employee_id={}&service_id={}&date={}",
            BASE_URL, employee_id, service_id, date
        ))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse slots");
    let slot = slots
        .as_array()
        .and_then(|s| s.iter().find(|slot| slot["fits_service"] == true))
        .expect("No free slot");

    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .header("X-Client-Id", CLIENT_ID)
        .json(&json!({
            "appointment_date": date,
            "services": [
                { "service": service_id, "employee": employee_id, "start_time": slot["start_time"] }
            ],
            "payment_method": "cash"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let booking_id = body["id"].as_i64().expect("No booking ID");

    let response = client
        .post(format!("{}/bookings/{}/cancel", BASE_URL, booking_id))
        .header("X-Client-Id", CLIENT_ID)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "cancelled");

    let response = client
        .delete(format!("{}/bookings/{}", BASE_URL, booking_id))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_my_bookings_requires_identity() {
    let client = Client::new();

    let response = client
        .get(format!("{}/bookings/mine", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
