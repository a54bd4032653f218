mod common;

use booking_service::engine::ErrorKind;
use booking_service::models::{AuditAction, BookingStatus, PlatformPolicy};
use common::{d, dec, test_policy, TestApp};
use rust_decimal::Decimal;

#[tokio::test]
async fn weekday_discount_reprices_the_booking() {
    let app = TestApp::spawn().await;
    let booking = app.book("2026-05-05", "2026-05-07").await;
    assert_eq!(booking.pricing.total_amount, dec("4071.00"));

    let discounted = app
        .engine
        .apply_discount(booking.booking_id, dec("20"), app.owner())
        .await
        .unwrap();
    let p = &discounted.pricing;
    assert_eq!(p.original_base_amount, dec("3000.00"));
    assert_eq!(p.discount_amount, dec("600.00"));
    assert_eq!(p.base_amount, dec("2400.00"));
    assert_eq!(p.commission_amount, dec("360.00"));
    assert_eq!(p.gst_amount, dec("496.80"));
    assert_eq!(p.total_amount, dec("3256.80"));
    assert!(p.is_balanced());

    let entry = app
        .engine
        .audit_history(booking.booking_id)
        .await
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(entry.action, AuditAction::DiscountApplied);
    assert_eq!(entry.details["old_percent"], "0");
    assert_eq!(entry.details["new_percent"], "20");
}

#[tokio::test]
async fn weekend_ranges_get_the_lower_cap() {
    let app = TestApp::spawn().await;
    // Fri..Sun
    let weekend = app.book("2026-05-08", "2026-05-10").await;

    let limits = app.engine.discount_limits(weekend.booking_id).await.unwrap();
    assert!(limits.is_weekend_window);
    assert_eq!(limits.max_discount_percent, dec("20"));
    assert_eq!(limits.booking_id, Some(weekend.booking_id));

    let err = app
        .engine
        .apply_discount(weekend.booking_id, dec("25"), app.owner())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DISCOUNT_EXCEEDS_LIMIT");

    assert!(app
        .engine
        .apply_discount(weekend.booking_id, dec("20"), app.owner())
        .await
        .is_ok());

    // Mon..Thu of the following week takes the weekday cap.
    let weekday = app.book("2026-05-11", "2026-05-14").await;
    let limits = app.engine.discount_limits(weekday.booking_id).await.unwrap();
    assert!(!limits.is_weekend_window);
    assert_eq!(limits.max_discount_percent, dec("30"));
    let discounted = app
        .engine
        .apply_discount(weekday.booking_id, dec("25"), app.owner())
        .await
        .unwrap();
    assert_eq!(discounted.pricing.discount_percent, dec("25"));
}

#[tokio::test]
async fn discount_is_owner_only_and_validated() {
    let app = TestApp::spawn().await;
    let booking = app.book("2026-05-05", "2026-05-07").await;

    let err = app
        .engine
        .apply_discount(booking.booking_id, dec("10"), app.advertiser())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = app
        .engine
        .apply_discount(booking.booking_id, dec("-1"), app.owner())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = app
        .engine
        .apply_discount(booking.booking_id, dec("10.125"), app.owner())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn removing_a_discount_restores_the_original_price() {
    let app = TestApp::spawn().await;
    let booking = app.book("2026-05-05", "2026-05-07").await;

    app.engine
        .apply_discount(booking.booking_id, dec("12.5"), app.owner())
        .await
        .unwrap();
    let restored = app
        .engine
        .remove_discount(booking.booking_id, app.owner())
        .await
        .unwrap();
    assert_eq!(restored.pricing, booking.pricing);

    // Removing it again changes nothing.
    app.engine
        .remove_discount(booking.booking_id, app.owner())
        .await
        .unwrap();

    let actions: Vec<_> = app
        .engine
        .audit_history(booking.booking_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Created,
            AuditAction::DiscountApplied,
            AuditAction::DiscountRemoved,
        ]
    );
}

#[tokio::test]
async fn discount_cannot_change_once_paid() {
    let app = TestApp::spawn().await;
    let paid = app.book_and_pay("2026-05-05", "2026-05-07", "pay_lock").await;

    let err = app
        .engine
        .apply_discount(paid.booking_id, dec("10"), app.owner())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_LOCKED");
    assert_eq!(err.kind(), ErrorKind::Locking);

    let err = app
        .engine
        .remove_discount(paid.booking_id, app.owner())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_LOCKED");

    let unchanged = app.engine.get_booking(paid.booking_id).await.unwrap();
    assert_eq!(unchanged.pricing, paid.pricing);
}

#[tokio::test]
async fn locked_pricing_ignores_later_rate_and_policy_changes() {
    let app = TestApp::spawn().await;
    let paid = app.book_and_pay("2026-05-05", "2026-05-07", "pay_snap").await;

    app.rates.set_price_per_day(app.billboard_id, dec("2500"));
    app.policies
        .replace(PlatformPolicy {
            commission_percent: dec("25"),
            gst_percent: dec("28"),
            ..test_policy()
        })
        .await;

    let reread = app.engine.get_booking(paid.booking_id).await.unwrap();
    assert_eq!(reread.pricing, paid.pricing);
    assert_eq!(reread.pricing.price_per_day, dec("1000"));
    assert_eq!(reread.pricing.commission_percent, dec("15"));
    assert_eq!(reread.pricing.gst_percent, dec("18"));

    // Completion does not touch the snapshot either.
    app.clock.advance(chrono::Duration::days(10));
    let completed = app.engine.complete_booking(paid.booking_id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(completed.pricing, paid.pricing);
}

#[tokio::test]
async fn unpaid_discount_changes_use_the_current_rate_and_policy() {
    let app = TestApp::spawn().await;
    let booking = app.book("2026-05-05", "2026-05-06").await;

    app.rates.set_price_per_day(app.billboard_id, dec("1200"));
    app.policies
        .replace(PlatformPolicy {
            commission_percent: dec("10"),
            ..test_policy()
        })
        .await;

    let repriced = app
        .engine
        .apply_discount(booking.booking_id, dec("10"), app.owner())
        .await
        .unwrap();
    let p = &repriced.pricing;
    // 1200 * 2 = 2400; -10% = 2160; +10% = 216; +18% of 2376 = 427.68
    assert_eq!(p.price_per_day, dec("1200"));
    assert_eq!(p.base_amount, dec("2160"));
    assert_eq!(p.commission_amount, dec("216"));
    assert_eq!(p.gst_amount, dec("427.68"));
    assert_eq!(p.total_amount, dec("2803.68"));

    // The payment lock keeps exactly the breakdown that was last computed.
    app.engine
        .approve_booking(booking.booking_id, app.owner())
        .await
        .unwrap();
    app.rates.set_price_per_day(app.billboard_id, dec("5000"));
    let paid = app.engine.mark_paid(booking.booking_id, "pay_x").await.unwrap();
    assert_eq!(paid.pricing.total_amount, dec("2803.68"));
    assert!(paid.pricing.locked);
}

#[tokio::test]
async fn price_preview_persists_nothing() {
    let app = TestApp::spawn().await;

    let preview = app
        .engine
        .preview_price(app.billboard_id, d("2026-05-05"), d("2026-05-07"), Some(dec("20")))
        .await
        .unwrap();
    assert_eq!(preview.breakdown.total_amount, dec("3256.80"));
    assert!(!preview.breakdown.locked);
    assert!(!preview.discount_limits.is_weekend_window);

    let plain = app
        .engine
        .preview_price(app.billboard_id, d("2026-05-05"), d("2026-05-07"), None)
        .await
        .unwrap();
    assert_eq!(plain.breakdown.discount_amount, Decimal::ZERO);
    assert_eq!(plain.breakdown.total_amount, dec("4071"));

    let err = app
        .engine
        .preview_price(app.billboard_id, d("2026-05-09"), d("2026-05-09"), Some(dec("25")))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DISCOUNT_EXCEEDS_LIMIT");

    // Nothing was reserved.
    let days = app
        .engine
        .get_availability(app.billboard_id, d("2026-05-05"), d("2026-05-07"))
        .await
        .unwrap();
    assert!(days
        .iter()
        .all(|day| day.status == booking_service::models::DayStatus::Available));
}

#[tokio::test]
async fn preview_and_apply_agree_on_discount_precision() {
    let app = TestApp::spawn().await;
    let booking = app.book("2026-05-05", "2026-05-07").await;

    let err = app
        .engine
        .preview_price(app.billboard_id, d("2026-05-05"), d("2026-05-07"), Some(dec("12.345")))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
    let err = app
        .engine
        .apply_discount(booking.booking_id, dec("12.345"), app.owner())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");

    let preview = app
        .engine
        .preview_price(app.billboard_id, d("2026-05-05"), d("2026-05-07"), Some(dec("12.34")))
        .await
        .unwrap();
    let applied = app
        .engine
        .apply_discount(booking.booking_id, dec("12.34"), app.owner())
        .await
        .unwrap();
    assert_eq!(applied.pricing, preview.breakdown);
}
