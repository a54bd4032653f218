mod common;

use booking_service::dtos::AvailabilityResponse;
use booking_service::models::{Booking, BookingStatus, DayStatus, PaymentStatus};
use common::{dec, TestApp};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

const USER_HEADER: &str = "X-User-ID";

async fn create(app: &TestApp, start: &str, end: &str) -> reqwest::Response {
    app.client
        .post(app.url("/bookings"))
        .header(USER_HEADER, app.advertiser_id.to_string())
        .json(&json!({
            "billboard_id": app.billboard_id,
            "start_date": start,
            "end_date": end,
        }))
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn health_and_metrics_respond() {
    let app = TestApp::spawn().await;

    let health = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert!(health.headers().contains_key("x-request-id"));
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let ready = app.client.get(app.url("/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    create(&app, "2026-05-05", "2026-05-07").await;
    let metrics = app.client.get(app.url("/metrics")).send().await.unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let text = metrics.text().await.unwrap();
    assert!(text.contains("booking_transitions_total"));
    assert!(text.contains("booking_http_requests_total"));
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::spawn().await;
    let response = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "req-abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-abc-123");
}

#[tokio::test]
async fn create_returns_201_and_overlap_returns_409() {
    let app = TestApp::spawn().await;

    let created = create(&app, "2026-05-05", "2026-05-07").await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let booking: Booking = created.json().await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.advertiser_id, app.advertiser_id);
    assert_eq!(booking.pricing.total_amount, dec("4071.00"));

    let conflict = create(&app, "2026-05-07", "2026-05-08").await;
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    let body: Value = conflict.json().await.unwrap();
    assert_eq!(body["code"], "DATE_RANGE_UNAVAILABLE");

    let invalid = create(&app, "2026-05-07", "2026-05-05").await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    let body: Value = invalid.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_DATE_RANGE");
}

#[tokio::test]
async fn create_requires_an_identity_and_cannot_impersonate() {
    let app = TestApp::spawn().await;

    let anonymous = app
        .client
        .post(app.url("/bookings"))
        .json(&json!({
            "billboard_id": app.billboard_id,
            "start_date": "2026-05-05",
            "end_date": "2026-05-07",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let impersonating = app
        .client
        .post(app.url("/bookings"))
        .header(USER_HEADER, Uuid::new_v4().to_string())
        .json(&json!({
            "billboard_id": app.billboard_id,
            "advertiser_id": app.advertiser_id,
            "start_date": "2026-05-05",
            "end_date": "2026-05-07",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(impersonating.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn availability_reports_pending_and_booked_days() {
    let app = TestApp::spawn().await;
    let first: Booking = create(&app, "2026-05-05", "2026-05-06").await.json().await.unwrap();
    create(&app, "2026-05-08", "2026-05-08").await;

    let approve = app
        .client
        .post(app.url(&format!("/bookings/{}/approve", first.booking_id)))
        .header(USER_HEADER, app.owner_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(approve.status(), StatusCode::OK);

    let response = app
        .client
        .get(app.url(&format!(
            "/billboards/{}/availability?from=2026-05-04&to=2026-05-09",
            app.billboard_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let availability: AvailabilityResponse = response.json().await.unwrap();
    let statuses: Vec<_> = availability.days.iter().map(|d| d.status).collect();
    assert_eq!(
        statuses,
        vec![
            DayStatus::Available,
            DayStatus::Booked,
            DayStatus::Booked,
            DayStatus::Available,
            DayStatus::Pending,
            DayStatus::Available,
        ]
    );

    let reversed = app
        .client
        .get(app.url(&format!(
            "/billboards/{}/availability?from=2026-05-09&to=2026-05-04",
            app.billboard_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(reversed.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .client
        .get(app.url(&format!(
            "/billboards/{}/availability?from=2026-05-04&to=2026-05-09",
            Uuid::new_v4()
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_payment_flow_over_http() {
    let app = TestApp::spawn().await;
    let booking: Booking = create(&app, "2026-05-05", "2026-05-07").await.json().await.unwrap();
    let base = format!("/bookings/{}", booking.booking_id);

    let discount = app
        .client
        .post(app.url(&format!("{}/discount?percent=20", base)))
        .header(USER_HEADER, app.owner_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(discount.status(), StatusCode::OK);
    let discounted: Booking = discount.json().await.unwrap();
    assert_eq!(discounted.pricing.total_amount, dec("3256.80"));

    let limits: Value = app
        .client
        .get(app.url(&format!("{}/discount-limits", base)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(limits["is_weekend_window"], false);
    assert_eq!(limits["current_discount_percent"], "20");

    app.client
        .post(app.url(&format!("{}/approve", base)))
        .header(USER_HEADER, app.owner_id.to_string())
        .send()
        .await
        .unwrap();
    let initiated = app
        .client
        .post(app.url(&format!("{}/payment/initiate", base)))
        .send()
        .await
        .unwrap();
    assert_eq!(initiated.status(), StatusCode::OK);

    let paid = app
        .client
        .post(app.url(&format!("{}/payment/paid", base)))
        .json(&json!({ "payment_reference": "pay_http" }))
        .send()
        .await
        .unwrap();
    assert_eq!(paid.status(), StatusCode::OK);
    let paid: Booking = paid.json().await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert!(paid.pricing.locked);

    let locked = app
        .client
        .delete(app.url(&format!("{}/discount", base)))
        .header(USER_HEADER, app.owner_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(locked.status(), StatusCode::LOCKED);
    let body: Value = locked.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_LOCKED");

    let audit: Value = app
        .client
        .get(app.url(&format!("{}/audit", base)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let actions: Vec<_> = audit["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        actions,
        vec![
            "CREATED",
            "DISCOUNT_APPLIED",
            "APPROVED",
            "PAYMENT_INITIATED",
            "PAID"
        ]
    );
}

#[tokio::test]
async fn payment_failure_body_is_optional() {
    let app = TestApp::spawn().await;
    let booking = app.book("2026-05-05", "2026-05-07").await;
    app.engine
        .approve_booking(booking.booking_id, app.owner())
        .await
        .unwrap();
    app.engine.initiate_payment(booking.booking_id).await.unwrap();

    let failed = app
        .client
        .post(app.url(&format!("/bookings/{}/payment/failed", booking.booking_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::OK);
    let failed: Booking = failed.json().await.unwrap();
    assert_eq!(failed.payment_status, PaymentStatus::Failed);
}

#[tokio::test]
async fn price_preview_endpoint() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url(&format!(
            "/billboards/{}/price-preview?from=2026-05-08&to=2026-05-10&discount_percent=20",
            app.billboard_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["discount_limits"]["is_weekend_window"], true);
    assert_eq!(body["discount_limits"]["max_discount_percent"], "20");
    assert_eq!(body["breakdown"]["total_amount"], "3256.80");

    let over_cap = app
        .client
        .get(app.url(&format!(
            "/billboards/{}/price-preview?from=2026-05-08&to=2026-05-10&discount_percent=21",
            app.billboard_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(over_cap.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_booking_is_404_and_wrong_actor_is_403() {
    let app = TestApp::spawn().await;

    let missing = app
        .client
        .get(app.url(&format!("/bookings/{}", Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["code"], "BOOKING_NOT_FOUND");

    let booking = app.book("2026-05-05", "2026-05-07").await;
    let forbidden = app
        .client
        .post(app.url(&format!("/bookings/{}/approve", booking.booking_id)))
        .header(USER_HEADER, app.advertiser_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    let body: Value = forbidden.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");
}
