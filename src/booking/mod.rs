//! The booking workflow.
//!
//! Booking an event is the one multi-step write in the system. The whole
//! effect runs inside a single database transaction so a failure at any
//! step leaves no partial state behind:
//!
//! 1. insert the booking row
//! 2. issue one ticket row per seat (free events only)
//! 3. claim capacity with a guarded decrement (free, limited events only)
//!
//! The guarded decrement refuses to take `max_attendees` below zero, which
//! makes step 3 the authoritative capacity check under concurrency. The
//! pre-check in [`plan_booking`] exists only to give callers a friendly
//! error before any write is attempted.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Event};
use crate::utils::error::AppError;

/// Upper bound on seats per booking, mirrored by a client-side cap.
pub const MAX_TICKETS_PER_BOOKING: i32 = 10;

/// Everything decided about a booking before the first write.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingPlan {
    pub status: BookingStatus,
    pub total_amount: Decimal,
    pub issue_tickets: bool,
    pub decrement_capacity: bool,
}

/// Result of a booking attempt, including where the client should go next.
#[derive(Debug, Serialize)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub redirect_to: String,
    /// True when an `Idempotency-Key` replay returned an earlier booking.
    pub replayed: bool,
}

/// Validates a booking request against the event and decides the write plan.
///
/// Free events confirm immediately, issue tickets and claim capacity. Paid
/// events record a pending booking and defer everything else to payment.
pub fn plan_booking(event: &Event, quantity: i32) -> Result<BookingPlan, AppError> {
    if event.is_cancelled {
        return Err(AppError::Validation(
            "This event has been cancelled".to_string(),
        ));
    }

    if let Some(remaining) = event.max_attendees {
        if quantity > remaining {
            return Err(capacity_error(remaining));
        }
    }

    if quantity < 1 {
        return Err(AppError::Validation(
            "Ticket quantity must be at least 1".to_string(),
        ));
    }

    if quantity > MAX_TICKETS_PER_BOOKING {
        return Err(AppError::Validation(format!(
            "Cannot book more than {MAX_TICKETS_PER_BOOKING} tickets at once"
        )));
    }

    if is_free_event(event) {
        Ok(BookingPlan {
            status: BookingStatus::Confirmed,
            total_amount: Decimal::ZERO,
            issue_tickets: true,
            decrement_capacity: event.max_attendees.is_some(),
        })
    } else {
        Ok(BookingPlan {
            status: BookingStatus::Pending,
            total_amount: event.ticket_price * Decimal::from(quantity),
            issue_tickets: false,
            decrement_capacity: false,
        })
    }
}

/// Runs the full workflow for one booking request.
pub async fn create_booking(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
    quantity: i32,
    idempotency_key: Option<String>,
) -> Result<BookingOutcome, AppError> {
    if let Some(key) = idempotency_key.as_deref() {
        if let Some(existing) = find_by_idempotency_key(pool, user_id, key).await? {
            return Ok(replay_outcome(existing));
        }
    }

    let event: Event = sqlx::query_as("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let plan = plan_booking(&event, quantity)?;

    let mut tx = pool.begin().await?;

    let booking =
        match insert_booking(&mut tx, &event, user_id, quantity, &plan, idempotency_key.as_deref())
            .await
        {
            Ok(booking) => booking,
            // Two requests raced on the same idempotency key. The loser's
            // insert fails on the partial unique index once the winner
            // commits; hand back the winner's booking.
            Err(err) if idempotency_key.is_some() && is_unique_violation(&err) => {
                tx.rollback().await?;
                let key = idempotency_key.as_deref().unwrap_or_default();
                let existing = find_by_idempotency_key(pool, user_id, key)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal("Idempotent booking vanished after conflict".to_string())
                    })?;
                return Ok(replay_outcome(existing));
            }
            Err(err) => return Err(AppError::Database(err)),
        };

    if plan.issue_tickets {
        issue_tickets(&mut tx, &booking, quantity)
            .await
            .map_err(|err| AppError::TicketCreationFailed(err.to_string()))?;
    }

    if plan.decrement_capacity {
        let claimed = claim_capacity(&mut tx, event.id, quantity)
            .await
            .map_err(|err| AppError::CapacityUpdateFailed(err.to_string()))?;

        if !claimed {
            tx.rollback().await?;
            let remaining = remaining_capacity(pool, event.id).await?.unwrap_or(0);
            return Err(capacity_error(remaining));
        }
    }

    tx.commit().await?;

    let redirect_to = redirect_for(plan.status, event.id, booking.id);

    Ok(BookingOutcome {
        booking,
        redirect_to,
        replayed: false,
    })
}

/// Page shown after a confirmed registration.
pub fn success_redirect(event_id: Uuid, booking_id: Uuid) -> String {
    format!("/events/{event_id}/book/success?booking={booking_id}")
}

/// Payment page for a pending booking.
pub fn payment_redirect(event_id: Uuid, booking_id: Uuid) -> String {
    format!("/events/{event_id}/book/payment?booking={booking_id}")
}

fn redirect_for(status: BookingStatus, event_id: Uuid, booking_id: Uuid) -> String {
    match status {
        BookingStatus::Pending => payment_redirect(event_id, booking_id),
        BookingStatus::Confirmed | BookingStatus::Cancelled => {
            success_redirect(event_id, booking_id)
        }
    }
}

fn replay_outcome(booking: Booking) -> BookingOutcome {
    let status = booking.status().unwrap_or(BookingStatus::Confirmed);
    let redirect_to = redirect_for(status, booking.event_id, booking.id);

    BookingOutcome {
        booking,
        redirect_to,
        replayed: true,
    }
}

fn is_free_event(event: &Event) -> bool {
    event.is_free || event.ticket_price.is_zero()
}

fn capacity_error(remaining: i32) -> AppError {
    if remaining > 0 {
        AppError::CapacityExceeded(format!(
            "Only {remaining} {} left for this event",
            if remaining == 1 { "ticket" } else { "tickets" }
        ))
    } else {
        AppError::CapacityExceeded("This event is sold out".to_string())
    }
}

async fn find_by_idempotency_key(
    pool: &PgPool,
    user_id: Uuid,
    key: &str,
) -> Result<Option<Booking>, AppError> {
    let booking = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE user_id = $1 AND idempotency_key = $2",
    )
    .bind(user_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(booking)
}

async fn insert_booking(
    tx: &mut Transaction<'_, Postgres>,
    event: &Event,
    user_id: Uuid,
    quantity: i32,
    plan: &BookingPlan,
    idempotency_key: Option<&str>,
) -> Result<Booking, sqlx::Error> {
    sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings (event_id, user_id, status, ticket_quantity, total_amount, idempotency_key)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(event.id)
    .bind(user_id)
    .bind(plan.status.as_str())
    .bind(quantity)
    .bind(plan.total_amount)
    .bind(idempotency_key)
    .fetch_one(&mut **tx)
    .await
}

async fn issue_tickets(
    tx: &mut Transaction<'_, Postgres>,
    booking: &Booking,
    quantity: i32,
) -> Result<(), sqlx::Error> {
    for _ in 0..quantity {
        sqlx::query(
            "INSERT INTO tickets (booking_id, event_id, user_id, ticket_number)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(booking.id)
        .bind(booking.event_id)
        .bind(booking.user_id)
        .bind(Uuid::new_v4())
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Claims `quantity` seats. Returns false when too few remain, in which
/// case nothing was written.
async fn claim_capacity(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    quantity: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE events
         SET max_attendees = max_attendees - $1, updated_at = now()
         WHERE id = $2 AND max_attendees >= $1",
    )
    .bind(quantity)
    .bind(event_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn remaining_capacity(pool: &PgPool, event_id: Uuid) -> Result<Option<i32>, AppError> {
    let remaining: Option<(Option<i32>,)> =
        sqlx::query_as("SELECT max_attendees FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(pool)
            .await?;

    Ok(remaining.and_then(|(value,)| value))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn event(max_attendees: Option<i32>, ticket_price: Decimal, is_free: bool) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Rust Meetup".to_string(),
            slug: "rust-meetup".to_string(),
            short_description: "An evening of talks".to_string(),
            full_description: "Three talks and pizza.".to_string(),
            image_url: None,
            type_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            organiser_profile_id: Uuid::new_v4(),
            max_attendees,
            ticket_price,
            is_free,
            is_published: true,
            is_cancelled: false,
            starts_at: now + Duration::days(7),
            ends_at: now + Duration::days(7) + Duration::hours(3),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn free_event_confirms_and_claims_capacity() {
        let plan = plan_booking(&event(Some(50), Decimal::ZERO, true), 3).unwrap();

        assert_eq!(plan.status, BookingStatus::Confirmed);
        assert_eq!(plan.total_amount, Decimal::ZERO);
        assert!(plan.issue_tickets);
        assert!(plan.decrement_capacity);
    }

    #[test]
    fn unlimited_free_event_skips_the_decrement() {
        let plan = plan_booking(&event(None, Decimal::ZERO, true), 3).unwrap();

        assert!(plan.issue_tickets);
        assert!(!plan.decrement_capacity);
    }

    #[test]
    fn zero_price_counts_as_free_even_when_not_flagged() {
        let plan = plan_booking(&event(Some(10), Decimal::ZERO, false), 1).unwrap();

        assert_eq!(plan.status, BookingStatus::Confirmed);
        assert!(plan.issue_tickets);
    }

    #[test]
    fn paid_event_stays_pending_with_the_full_total() {
        let price = Decimal::new(2550, 2); // 25.50
        let plan = plan_booking(&event(Some(10), price, false), 4).unwrap();

        assert_eq!(plan.status, BookingStatus::Pending);
        assert_eq!(plan.total_amount, Decimal::new(10200, 2));
        assert!(!plan.issue_tickets);
        assert!(!plan.decrement_capacity);
    }

    #[test]
    fn requesting_more_than_remaining_is_rejected() {
        let err = plan_booking(&event(Some(2), Decimal::ZERO, true), 3).unwrap_err();

        assert!(matches!(err, AppError::CapacityExceeded(_)));
    }

    #[test]
    fn booking_exactly_the_remaining_seats_is_allowed() {
        assert!(plan_booking(&event(Some(3), Decimal::ZERO, true), 3).is_ok());
    }

    #[test]
    fn sold_out_event_reports_capacity_exceeded() {
        let err = plan_booking(&event(Some(0), Decimal::ZERO, true), 1).unwrap_err();

        match err {
            AppError::CapacityExceeded(message) => {
                assert_eq!(message, "This event is sold out");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        for quantity in [0, -1, -50] {
            let err = plan_booking(&event(Some(10), Decimal::ZERO, true), quantity).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "quantity {quantity}");
        }
    }

    #[test]
    fn zero_quantity_on_a_sold_out_event_is_a_validation_error() {
        // The capacity check passes trivially for zero seats, so the
        // quantity rule is what rejects the request.
        let err = plan_booking(&event(Some(0), Decimal::ZERO, true), 0).unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn oversized_bookings_are_rejected() {
        let err = plan_booking(
            &event(None, Decimal::ZERO, true),
            MAX_TICKETS_PER_BOOKING + 1,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn cancelled_events_cannot_be_booked() {
        let mut cancelled = event(Some(10), Decimal::ZERO, true);
        cancelled.is_cancelled = true;

        let err = plan_booking(&cancelled, 1).unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn redirects_point_at_the_client_booking_pages() {
        let event_id = Uuid::new_v4();
        let booking_id = Uuid::new_v4();

        assert_eq!(
            success_redirect(event_id, booking_id),
            format!("/events/{event_id}/book/success?booking={booking_id}")
        );
        assert_eq!(
            payment_redirect(event_id, booking_id),
            format!("/events/{event_id}/book/payment?booking={booking_id}")
        );
    }

    #[test]
    fn pending_replays_are_sent_back_to_payment() {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: "pending".to_string(),
            ticket_quantity: 2,
            total_amount: Decimal::new(5000, 2),
            idempotency_key: Some("retry-key-0123456789".to_string()),
            created_at: now,
            updated_at: now,
        };

        let outcome = replay_outcome(booking);

        assert!(outcome.replayed);
        assert!(outcome.redirect_to.contains("/book/payment?booking="));
    }
}
