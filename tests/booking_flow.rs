//! End-to-end booking workflow tests against a real Postgres database.
//!
//! Run with `cargo test -- --ignored` and a `DATABASE_URL` pointing at a
//! scratch database.

mod common;

use axum::extract::{Path, State};
use rust_decimal::Decimal;
use uuid::Uuid;

use eventfully_server::auth::CurrentUser;
use eventfully_server::booking::{self, MAX_TICKETS_PER_BOOKING};
use eventfully_server::handlers::events::{cancel_event, delete_event};
use eventfully_server::models::BookingStatus;
use eventfully_server::utils::error::AppError;

fn organiser(user_id: Uuid) -> CurrentUser {
    CurrentUser {
        user_id,
        email: "organiser@test.example".to_string(),
        session_token: Uuid::new_v4(),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn free_booking_confirms_issues_tickets_and_claims_capacity() {
    let pool = common::pool().await;
    let user_id = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, Some(50), Decimal::ZERO, true).await;

    let outcome = booking::create_booking(&pool, user_id, seeded.event_id, 3, None)
        .await
        .expect("booking should succeed");

    assert_eq!(outcome.booking.status(), Some(BookingStatus::Confirmed));
    assert_eq!(outcome.booking.total_amount, Decimal::ZERO);
    assert!(!outcome.replayed);
    assert!(outcome.redirect_to.contains("/book/success?booking="));

    let tickets = common::count(
        &pool,
        "SELECT COUNT(*) FROM tickets WHERE booking_id = $1",
        outcome.booking.id,
    )
    .await;
    assert_eq!(tickets, 3);

    assert_eq!(
        common::remaining_capacity(&pool, seeded.event_id).await,
        Some(47)
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn unlimited_events_never_touch_capacity() {
    let pool = common::pool().await;
    let user_id = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, None, Decimal::ZERO, true).await;

    let outcome = booking::create_booking(&pool, user_id, seeded.event_id, 2, None)
        .await
        .expect("booking should succeed");

    assert_eq!(outcome.booking.status(), Some(BookingStatus::Confirmed));
    assert_eq!(common::remaining_capacity(&pool, seeded.event_id).await, None);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn overbooking_leaves_no_partial_state_behind() {
    let pool = common::pool().await;
    let user_id = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, Some(2), Decimal::ZERO, true).await;

    let err = booking::create_booking(&pool, user_id, seeded.event_id, 3, None)
        .await
        .expect_err("booking should be rejected");
    assert!(matches!(err, AppError::CapacityExceeded(_)));

    let bookings = common::count(
        &pool,
        "SELECT COUNT(*) FROM bookings WHERE event_id = $1",
        seeded.event_id,
    )
    .await;
    let tickets = common::count(
        &pool,
        "SELECT COUNT(*) FROM tickets WHERE event_id = $1",
        seeded.event_id,
    )
    .await;

    assert_eq!(bookings, 0);
    assert_eq!(tickets, 0);
    assert_eq!(
        common::remaining_capacity(&pool, seeded.event_id).await,
        Some(2)
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn concurrent_bookings_cannot_oversell_the_last_seat() {
    let pool = common::pool().await;
    let first = common::seed_user(&pool).await;
    let second = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, Some(1), Decimal::ZERO, true).await;

    let (a, b) = tokio::join!(
        booking::create_booking(&pool, first, seeded.event_id, 1, None),
        booking::create_booking(&pool, second, seeded.event_id, 1, None),
    );

    let successes = [a.is_ok(), b.is_ok()].into_iter().filter(|ok| *ok).count();
    assert_eq!(successes, 1, "exactly one booking should win the last seat");

    assert_eq!(
        common::remaining_capacity(&pool, seeded.event_id).await,
        Some(0)
    );
    let tickets = common::count(
        &pool,
        "SELECT COUNT(*) FROM tickets WHERE event_id = $1",
        seeded.event_id,
    )
    .await;
    assert_eq!(tickets, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn replaying_an_idempotency_key_returns_the_original_booking() {
    let pool = common::pool().await;
    let user_id = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, Some(10), Decimal::ZERO, true).await;
    let key = format!("retry-{}", Uuid::new_v4());

    let first = booking::create_booking(&pool, user_id, seeded.event_id, 2, Some(key.clone()))
        .await
        .expect("first attempt should succeed");
    let second = booking::create_booking(&pool, user_id, seeded.event_id, 2, Some(key))
        .await
        .expect("replay should succeed");

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.booking.id, second.booking.id);

    let bookings = common::count(
        &pool,
        "SELECT COUNT(*) FROM bookings WHERE event_id = $1",
        seeded.event_id,
    )
    .await;
    assert_eq!(bookings, 1, "the replay must not create a second booking");

    // Capacity was claimed exactly once.
    assert_eq!(
        common::remaining_capacity(&pool, seeded.event_id).await,
        Some(8)
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn paid_bookings_stay_pending_without_tickets_or_capacity_claims() {
    let pool = common::pool().await;
    let user_id = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, Some(10), Decimal::new(2550, 2), false).await;

    let outcome = booking::create_booking(&pool, user_id, seeded.event_id, 2, None)
        .await
        .expect("booking should succeed");

    assert_eq!(outcome.booking.status(), Some(BookingStatus::Pending));
    assert_eq!(outcome.booking.total_amount, Decimal::new(5100, 2));
    assert!(outcome.redirect_to.contains("/book/payment?booking="));

    let tickets = common::count(
        &pool,
        "SELECT COUNT(*) FROM tickets WHERE booking_id = $1",
        outcome.booking.id,
    )
    .await;
    assert_eq!(tickets, 0);
    assert_eq!(
        common::remaining_capacity(&pool, seeded.event_id).await,
        Some(10)
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn oversized_requests_are_rejected_before_any_write() {
    let pool = common::pool().await;
    let user_id = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, None, Decimal::ZERO, true).await;

    let err = booking::create_booking(
        &pool,
        user_id,
        seeded.event_id,
        MAX_TICKETS_PER_BOOKING + 1,
        None,
    )
    .await
    .expect_err("booking should be rejected");

    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn cancelling_an_event_cancels_its_bookings() {
    let pool = common::pool().await;
    let state = common::state(&pool);
    let user_id = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, Some(10), Decimal::ZERO, true).await;

    let outcome = booking::create_booking(&pool, user_id, seeded.event_id, 1, None)
        .await
        .expect("booking should succeed");

    cancel_event(
        organiser(seeded.organiser_user_id),
        State(state),
        Path(seeded.event_id),
    )
    .await
    .expect("cancel should succeed");

    let (status,): (String,) = sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
        .bind(outcome.booking.id)
        .fetch_one(&pool)
        .await
        .expect("booking should still exist");
    assert_eq!(status, "cancelled");

    let (is_cancelled, is_published): (bool, bool) =
        sqlx::query_as("SELECT is_cancelled, is_published FROM events WHERE id = $1")
            .bind(seeded.event_id)
            .fetch_one(&pool)
            .await
            .expect("event should still exist");
    assert!(is_cancelled);
    assert!(!is_published);

    // Cancelled events refuse new bookings.
    let err = booking::create_booking(&pool, user_id, seeded.event_id, 1, None)
        .await
        .expect_err("booking a cancelled event should fail");
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn deletion_is_refused_until_bookings_are_cancelled() {
    let pool = common::pool().await;
    let state = common::state(&pool);
    let user_id = common::seed_user(&pool).await;
    let seeded = common::seed_event(&pool, Some(10), Decimal::ZERO, true).await;

    booking::create_booking(&pool, user_id, seeded.event_id, 1, None)
        .await
        .expect("booking should succeed");

    let err = delete_event(
        organiser(seeded.organiser_user_id),
        State(state.clone()),
        Path(seeded.event_id),
    )
    .await
    .err()
    .expect("delete should be refused while the booking is active");
    assert!(matches!(err, AppError::Validation(_)));

    // Cancelling releases the bookings, after which deletion takes the
    // event and its booking history with it.
    cancel_event(
        organiser(seeded.organiser_user_id),
        State(state.clone()),
        Path(seeded.event_id),
    )
    .await
    .expect("cancel should succeed");

    delete_event(
        organiser(seeded.organiser_user_id),
        State(state),
        Path(seeded.event_id),
    )
    .await
    .expect("delete should succeed after cancellation");

    for table in ["events", "bookings", "tickets"] {
        let rows = common::count(
            &pool,
            &format!(
                "SELECT COUNT(*) FROM {table} WHERE {} = $1",
                if table == "events" { "id" } else { "event_id" }
            ),
            seeded.event_id,
        )
        .await;
        assert_eq!(rows, 0, "{table} should hold no rows for the event");
    }
}
