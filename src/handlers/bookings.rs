use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::booking;
use crate::models::{Booking, BookingStatus, Event, Ticket};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

/// Clients that retry booking requests send this header so a retry lands
/// on the original booking instead of creating a second one.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

const IDEMPOTENCY_KEY_MIN_LEN: usize = 16;
const IDEMPOTENCY_KEY_MAX_LEN: usize = 128;

#[derive(Debug, Deserialize)]
pub struct BookEventRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub scope: Option<String>,
}

/// One row in the caller's booking list, with enough of the event to
/// render a card.
#[derive(Debug, Serialize, FromRow)]
pub struct BookingListItem {
    pub id: Uuid,
    pub event_id: Uuid,
    pub status: String,
    pub ticket_quantity: i32,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub event_title: String,
    pub event_slug: String,
    pub event_image_url: Option<String>,
    pub event_is_cancelled: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location_name: String,
    pub location_city: String,
}

#[derive(Debug, Serialize)]
struct BookingDetail {
    booking: Booking,
    event: Event,
    tickets: Vec<Ticket>,
}

/// Books seats on an event for the caller.
pub async fn book_event(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<BookEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let idempotency_key = idempotency_key_from(&headers)?;

    let outcome = booking::create_booking(
        &state.pool,
        user.user_id,
        event_id,
        payload.quantity,
        idempotency_key,
    )
    .await?;

    if outcome.replayed {
        return Ok(success(outcome, "Booking already processed").into_response());
    }

    let message = match outcome.booking.status() {
        Some(BookingStatus::Pending) => "Booking created. Complete payment to confirm your seats.",
        _ => "Registration successful!",
    };

    Ok(created(outcome, message).into_response())
}

/// The caller's bookings. `scope=upcoming` keeps events that have not
/// started yet, `scope=past` the rest; no scope returns everything,
/// newest booking first.
pub async fn list_bookings(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (scope_filter, order_clause) = match query.scope.as_deref() {
        Some("upcoming") => ("AND e.starts_at > now()", "e.starts_at ASC"),
        Some("past") => ("AND e.starts_at <= now()", "e.starts_at DESC"),
        _ => ("", "b.created_at DESC"),
    };

    let bookings = sqlx::query_as::<_, BookingListItem>(&format!(
        "SELECT b.id, b.event_id, b.status, b.ticket_quantity, b.total_amount, b.created_at,
                e.title AS event_title, e.slug AS event_slug, e.image_url AS event_image_url,
                e.is_cancelled AS event_is_cancelled, e.starts_at, e.ends_at,
                l.name AS location_name, l.city AS location_city
         FROM bookings b
         JOIN events e ON e.id = b.event_id
         JOIN locations l ON l.id = e.location_id
         WHERE b.user_id = $1 {scope_filter}
         ORDER BY {order_clause}"
    ))
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(bookings, "Bookings retrieved successfully"))
}

/// A single booking with its event and issued tickets. Only the booking's
/// owner can see it; everyone else gets a not-found.
pub async fn get_booking(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let booking: Booking =
        sqlx::query_as("SELECT * FROM bookings WHERE id = $1 AND user_id = $2")
            .bind(booking_id)
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let event: Event = sqlx::query_as("SELECT * FROM events WHERE id = $1")
        .bind(booking.event_id)
        .fetch_one(&state.pool)
        .await?;

    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE booking_id = $1 ORDER BY created_at",
    )
    .bind(booking.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(
        BookingDetail {
            booking,
            event,
            tickets,
        },
        "Booking retrieved successfully",
    ))
}

fn idempotency_key_from(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key = value
        .to_str()
        .map_err(|_| {
            AppError::Validation("Idempotency-Key header must be plain text".to_string())
        })?
        .trim();

    if key.len() < IDEMPOTENCY_KEY_MIN_LEN || key.len() > IDEMPOTENCY_KEY_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Idempotency-Key must be between {IDEMPOTENCY_KEY_MIN_LEN} and {IDEMPOTENCY_KEY_MAX_LEN} characters"
        )));
    }

    Ok(Some(key.to_string()))
}
