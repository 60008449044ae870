//! HTTP layer tests: the full router over the in-memory store, no server needed

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use salon_booking_server::{create_router, AppConfig, AppState};

use crate::common::*;

async fn app() -> Router {
    let store = seeded_store().await;
    let state = AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(services_over(store)),
    };
    create_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, client: Option<i32>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(client) = client {
        request = request.header("X-Client-Id", client.to_string());
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn massage_at(time: &str, employee: Value) -> Value {
    json!({
        "appointment_date": DAY,
        "services": [
            { "service": MASSAGE, "employee": employee, "start_time": at(time) }
        ],
        "payment_method": "cash"
    })
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_slots_endpoint() {
    let app = app().await;
    let uri = format!("/api/v1/availability/slots?employee_id=1&service_id={}&date={}", HAIRCUT, DAY);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let slots = body.as_array().unwrap();
    assert_eq!(slots.len(), 32);
    assert_eq!(slots[0]["time"], "09:00");
    assert_eq!(slots[0]["available"], true);

    let uri = format!("/api/v1/availability/slots?employee_id=1&service_id={}&date=02-06-2025", HAIRCUT);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_booking_round_trip() {
    let app = app().await;

    let (status, body) = send(&app, Method::POST, "/api/v1/bookings", Some(11), Some(massage_at("10:00", json!(1)))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["client_id"], 11);
    assert_eq!(body["status"], "confirmed");
    assert!(body["booking_number"].as_str().unwrap().starts_with("BK"));
    let booking_id = body["id"].as_i64().unwrap();
    let service_row = body["services"][0]["id"].as_i64().unwrap();

    // Same employee, overlapping time
    let (status, body) = send(&app, Method::POST, "/api/v1/bookings", Some(12), Some(massage_at("10:30", json!("1")))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SlotTaken");

    // "any" lands on the next free employee
    let (status, body) = send(&app, Method::POST, "/api/v1/bookings", Some(12), Some(massage_at("10:30", json!("any")))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["services"][0]["employee_id"], 2);

    let (status, body) = send(&app, Method::GET, "/api/v1/bookings/mine", Some(11), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/bookings/{}", booking_id);
    let (status, _) = send(&app, Method::GET, &uri, Some(12), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/bookings/{}/services/{}/status", booking_id, service_row);
    let (status, body) = send(&app, Method::PUT, &uri, None, Some(json!({ "status": "started" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in-progress");
    assert_eq!(body["booking_status"], "started");

    let uri = format!("/api/v1/bookings/{}/services/{}", booking_id, service_row);
    let (status, body) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking_deleted"], true);

    let uri = format!("/api/v1/bookings/{}", booking_id);
    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_requires_identity_and_services() {
    let app = app().await;

    let (status, body) = send(&app, Method::POST, "/api/v1/bookings", None, Some(massage_at("10:00", json!(1)))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthenticated");

    let (status, _) = send(&app, Method::GET, "/api/v1/bookings/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let empty = json!({ "client_id": 5, "appointment_date": DAY, "services": [] });
    let (status, _) = send(&app, Method::POST, "/api/v1/bookings", None, Some(empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_date = json!({
        "client_id": 5,
        "appointment_date": "next monday",
        "services": [{ "service": HAIRCUT, "employee": "any" }]
    });
    let (status, _) = send(&app, Method::POST, "/api/v1/bookings", None, Some(bad_date)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_and_employees_endpoints() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/services", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Facial");

    let uri = format!("/api/v1/employees/available?service_id={}&date={}", FACIAL, DAY);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[0]["work_schedule"]["monday"]["start_time"], "09:00");

    let uri = format!("/api/v1/employees/available?service_id=999&date={}", DAY);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");
}

#[tokio::test]
async fn test_reschedule_endpoint() {
    let app = app().await;

    let (status, body) = send(&app, Method::POST, "/api/v1/bookings", Some(21), Some(massage_at("10:00", json!(1)))).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/bookings/{}/reschedule", body["id"].as_i64().unwrap());

    let (status, _) = send(&app, Method::POST, "/api/v1/bookings", Some(22), Some(massage_at("14:00", json!(1)))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, Method::POST, &uri, None, Some(json!({ "new_date_time": at("15:00") }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, &uri, Some(22), Some(json!({ "new_date_time": at("15:00") }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::POST, &uri, Some(21), Some(json!({ "newDateTime": at("14:30") }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SlotTaken");

    let (status, body) = send(&app, Method::POST, &uri, Some(21), Some(json!({ "new_date_time": at("15:00") }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"][0]["start_time"], json!(at("15:00")));
    assert_eq!(body["services"][0]["end_time"], json!(at("16:00")));
}
