use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::handlers::organisers::require_complete_organiser;
use crate::models::{Event, EventType, Location};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};
use crate::utils::slug::slugify;

/// Page size for the public event listing.
const ITEMS_PER_PAGE: i64 = 12;
const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub short_description: String,
    pub full_description: String,
    pub image_url: Option<String>,
    pub type_id: Uuid,
    pub location_id: Uuid,
    pub max_attendees: Option<i32>,
    pub ticket_price: Option<Decimal>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

fn default_published() -> bool {
    true
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub image_url: Option<String>,
    pub type_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub max_attendees: Option<i32>,
    pub ticket_price: Option<Decimal>,
    pub is_free: Option<bool>,
    pub is_published: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub search: Option<String>,
    /// Event type filter, `?type=<uuid>`.
    #[serde(rename = "type")]
    pub type_id: Option<Uuid>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One card in the public listing, with the joined names a card needs.
#[derive(Debug, Serialize, FromRow)]
pub struct EventListItem {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub image_url: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_attendees: Option<i32>,
    pub ticket_price: Decimal,
    pub is_free: bool,
    pub type_name: String,
    pub location_name: String,
    pub location_city: String,
    pub organiser_name: String,
}

#[derive(Debug, Serialize)]
struct Pagination {
    page: i64,
    per_page: i64,
    total: i64,
    total_pages: i64,
    has_more: bool,
}

#[derive(Debug, Serialize)]
struct EventListPage {
    events: Vec<EventListItem>,
    pagination: Pagination,
}

#[derive(Debug, Serialize, FromRow)]
struct OrganiserSummary {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    profile_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventDetail {
    #[serde(flatten)]
    event: Event,
    event_type: EventType,
    location: Location,
    organiser: OrganiserSummary,
}

/// An organiser's own event with its booking tallies.
#[derive(Debug, Serialize, FromRow)]
struct OrganiserEventRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    event: Event,
    confirmed_bookings: i64,
    seats_booked: i64,
}

/// Public listing of published, non-cancelled events.
///
/// Supports `search` (title), `type`, `sort=latest` (newest first, default
/// is soonest first) and page/per_page pagination.
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(ITEMS_PER_PAGE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * per_page;

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let order_clause = match query.sort.as_deref() {
        Some("latest") => "e.created_at DESC",
        _ => "e.starts_at ASC",
    };

    let filter = "e.is_published AND NOT e.is_cancelled
         AND ($1::text IS NULL OR e.title ILIKE '%' || $1 || '%')
         AND ($2::uuid IS NULL OR e.type_id = $2)";

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM events e WHERE {filter}"
    ))
    .bind(search)
    .bind(query.type_id)
    .fetch_one(&state.pool)
    .await?;

    let events = sqlx::query_as::<_, EventListItem>(&format!(
        "SELECT e.id, e.title, e.slug, e.short_description, e.image_url,
                e.starts_at, e.ends_at, e.max_attendees, e.ticket_price, e.is_free,
                t.name AS type_name,
                l.name AS location_name, l.city AS location_city,
                op.name AS organiser_name
         FROM events e
         JOIN event_types t ON t.id = e.type_id
         JOIN locations l ON l.id = e.location_id
         JOIN organiser_profiles op ON op.id = e.organiser_profile_id
         WHERE {filter}
         ORDER BY {order_clause}
         LIMIT $3 OFFSET $4"
    ))
    .bind(search)
    .bind(query.type_id)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total_pages = total_pages(total, per_page);

    Ok(success(
        EventListPage {
            events,
            pagination: Pagination {
                page,
                per_page,
                total,
                total_pages,
                has_more: page < total_pages,
            },
        },
        "Events retrieved successfully",
    ))
}

/// Full event detail with its type, venue and organiser.
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let event: Event = sqlx::query_as("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let event_type: EventType = sqlx::query_as("SELECT * FROM event_types WHERE id = $1")
        .bind(event.type_id)
        .fetch_one(&state.pool)
        .await?;

    let location: Location = sqlx::query_as("SELECT * FROM locations WHERE id = $1")
        .bind(event.location_id)
        .fetch_one(&state.pool)
        .await?;

    let organiser: OrganiserSummary = sqlx::query_as(
        "SELECT id, name, slug, description, profile_image_url
         FROM organiser_profiles WHERE id = $1",
    )
    .bind(event.organiser_profile_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(
        EventDetail {
            event,
            event_type,
            location,
            organiser,
        },
        "Event retrieved successfully",
    ))
}

/// Creates an event for the caller's organiser profile.
pub async fn create_event(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let organiser = require_complete_organiser(&state.pool, user.user_id).await?;

    let draft = EventDraft::from_create(&payload)?;
    draft.validate()?;

    let slug = unique_slug(&state.pool, &draft.title, None).await?;

    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events
             (title, slug, short_description, full_description, image_url,
              type_id, location_id, organiser_profile_id, max_attendees,
              ticket_price, is_free, is_published, starts_at, ends_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         RETURNING *",
    )
    .bind(&draft.title)
    .bind(&slug)
    .bind(&draft.short_description)
    .bind(&draft.full_description)
    .bind(&draft.image_url)
    .bind(draft.type_id)
    .bind(draft.location_id)
    .bind(organiser.id)
    .bind(draft.max_attendees)
    .bind(draft.ticket_price)
    .bind(draft.is_free)
    .bind(draft.is_published)
    .bind(draft.starts_at)
    .bind(draft.ends_at)
    .fetch_one(&state.pool)
    .await
    .map_err(map_event_write_error)?;

    Ok(created(event, "Event created successfully"))
}

/// Applies a partial update to an event the caller manages.
pub async fn update_event(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_owned_event(&state.pool, event_id, user.user_id).await?;

    let draft = EventDraft::from_update(&event, &payload);
    draft.validate()?;

    let slug = if draft.title == event.title {
        event.slug.clone()
    } else {
        unique_slug(&state.pool, &draft.title, Some(event.id)).await?
    };

    // Ownership re-checked in the WHERE clause so the write stands on its
    // own even if the event changed hands between read and write.
    let updated = sqlx::query_as::<_, Event>(
        "UPDATE events
         SET title = $1, slug = $2, short_description = $3, full_description = $4,
             image_url = $5, type_id = $6, location_id = $7, max_attendees = $8,
             ticket_price = $9, is_free = $10, is_published = $11,
             starts_at = $12, ends_at = $13, updated_at = now()
         WHERE id = $14
           AND organiser_profile_id IN (
               SELECT id FROM organiser_profiles WHERE user_id = $15
           )
         RETURNING *",
    )
    .bind(&draft.title)
    .bind(&slug)
    .bind(&draft.short_description)
    .bind(&draft.full_description)
    .bind(&draft.image_url)
    .bind(draft.type_id)
    .bind(draft.location_id)
    .bind(draft.max_attendees)
    .bind(draft.ticket_price)
    .bind(draft.is_free)
    .bind(draft.is_published)
    .bind(draft.starts_at)
    .bind(draft.ends_at)
    .bind(event.id)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(map_event_write_error)?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(success(updated, "Event updated successfully"))
}

/// Cancels an event and releases every booking on it.
pub async fn cancel_event(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_owned_event(&state.pool, event_id, user.user_id).await?;

    if event.is_cancelled {
        return Ok(empty_success("Event is already cancelled"));
    }

    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "UPDATE events
         SET is_cancelled = TRUE, is_published = FALSE, updated_at = now()
         WHERE id = $1",
    )
    .bind(event.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE bookings
         SET status = 'cancelled', updated_at = now()
         WHERE event_id = $1 AND status <> 'cancelled'",
    )
    .bind(event.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(empty_success("Event cancelled"))
}

/// Deletes an event. Refused while any non-cancelled booking exists;
/// otherwise the event goes along with its cancelled booking history.
pub async fn delete_event(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_owned_event(&state.pool, event_id, user.user_id).await?;

    let mut tx = state.pool.begin().await?;

    let (has_active,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (
             SELECT 1 FROM bookings WHERE event_id = $1 AND status <> 'cancelled'
         )",
    )
    .bind(event.id)
    .fetch_one(&mut *tx)
    .await?;

    if has_active {
        return Err(AppError::Validation(
            "This event has active bookings. Cancel it instead of deleting it.".to_string(),
        ));
    }

    sqlx::query("DELETE FROM tickets WHERE event_id = $1")
        .bind(event.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM bookings WHERE event_id = $1")
        .bind(event.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(empty_success("Event deleted"))
}

/// The caller's own events, drafts and cancellations included, with
/// confirmed booking tallies for the dashboard.
pub async fn list_organiser_events(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let organiser: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM organiser_profiles WHERE user_id = $1")
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;

    let (organiser_id,) = organiser
        .ok_or_else(|| AppError::NotFound("Organiser profile not found".to_string()))?;

    let events = sqlx::query_as::<_, OrganiserEventRow>(
        "SELECT e.*,
                COALESCE(b.confirmed, 0) AS confirmed_bookings,
                COALESCE(b.seats, 0) AS seats_booked
         FROM events e
         LEFT JOIN (
             SELECT event_id, COUNT(*) AS confirmed, SUM(ticket_quantity) AS seats
             FROM bookings
             WHERE status = 'confirmed'
             GROUP BY event_id
         ) b ON b.event_id = e.id
         WHERE e.organiser_profile_id = $1
         ORDER BY e.starts_at DESC",
    )
    .bind(organiser_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(events, "Events retrieved successfully"))
}

/// Final field values for an insert or update, merged and ready to check.
struct EventDraft {
    title: String,
    short_description: String,
    full_description: String,
    image_url: Option<String>,
    type_id: Uuid,
    location_id: Uuid,
    max_attendees: Option<i32>,
    ticket_price: Decimal,
    is_free: bool,
    is_published: bool,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl EventDraft {
    fn from_create(req: &CreateEventRequest) -> Result<Self, AppError> {
        let ticket_price = if req.is_free {
            Decimal::ZERO
        } else {
            req.ticket_price.ok_or_else(|| {
                AppError::Validation("Ticket price is required for paid events".to_string())
            })?
        };

        Ok(Self {
            title: req.title.trim().to_string(),
            short_description: req.short_description.trim().to_string(),
            full_description: req.full_description.trim().to_string(),
            image_url: req.image_url.clone(),
            type_id: req.type_id,
            location_id: req.location_id,
            max_attendees: req.max_attendees,
            ticket_price,
            is_free: req.is_free,
            is_published: req.is_published,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
        })
    }

    fn from_update(event: &Event, req: &UpdateEventRequest) -> Self {
        let is_free = req.is_free.unwrap_or(event.is_free);
        let ticket_price = if is_free {
            Decimal::ZERO
        } else {
            req.ticket_price.unwrap_or(event.ticket_price)
        };

        Self {
            title: req
                .title
                .as_deref()
                .map(str::trim)
                .map(str::to_string)
                .unwrap_or_else(|| event.title.clone()),
            short_description: req
                .short_description
                .as_deref()
                .map(str::trim)
                .map(str::to_string)
                .unwrap_or_else(|| event.short_description.clone()),
            full_description: req
                .full_description
                .as_deref()
                .map(str::trim)
                .map(str::to_string)
                .unwrap_or_else(|| event.full_description.clone()),
            image_url: req.image_url.clone().or_else(|| event.image_url.clone()),
            type_id: req.type_id.unwrap_or(event.type_id),
            location_id: req.location_id.unwrap_or(event.location_id),
            max_attendees: req.max_attendees.or(event.max_attendees),
            ticket_price,
            is_free,
            is_published: req.is_published.unwrap_or(event.is_published),
            starts_at: req.starts_at.unwrap_or(event.starts_at),
            ends_at: req.ends_at.unwrap_or(event.ends_at),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.title.is_empty() {
            return Err(AppError::Validation("Event title is required".to_string()));
        }
        if self.short_description.is_empty() {
            return Err(AppError::Validation(
                "A short description is required".to_string(),
            ));
        }
        if self.full_description.is_empty() {
            return Err(AppError::Validation(
                "A full description is required".to_string(),
            ));
        }
        if self.starts_at >= self.ends_at {
            return Err(AppError::Validation(
                "Event must end after it starts".to_string(),
            ));
        }
        if self.max_attendees.is_some_and(|n| n < 0) {
            return Err(AppError::Validation(
                "Capacity cannot be negative".to_string(),
            ));
        }
        if !self.is_free && self.ticket_price <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Paid events need a ticket price greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Derives a slug from the title and ensures no other event holds it.
async fn unique_slug(
    pool: &PgPool,
    title: &str,
    exclude: Option<Uuid>,
) -> Result<String, AppError> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "Event title must include letters or numbers".to_string(),
        ));
    }

    let taken: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM events WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2)",
    )
    .bind(&slug)
    .bind(exclude)
    .fetch_optional(pool)
    .await?;

    if taken.is_some() {
        return Err(AppError::Validation(
            "An event with a similar title already exists".to_string(),
        ));
    }

    Ok(slug)
}

/// Loads an event and verifies the caller's organiser profile owns it.
async fn load_owned_event(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Event, AppError> {
    let event: Event = sqlx::query_as("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let (owner_id,): (Uuid,) =
        sqlx::query_as("SELECT user_id FROM organiser_profiles WHERE id = $1")
            .bind(event.organiser_profile_id)
            .fetch_one(pool)
            .await?;

    if owner_id != user_id {
        return Err(AppError::Forbidden(
            "You do not manage this event".to_string(),
        ));
    }

    Ok(event)
}

/// Slug races and bad type/location ids surface as constraint violations.
fn map_event_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Validation(
                "An event with a similar title already exists".to_string(),
            );
        }
        if db.is_foreign_key_violation() {
            return AppError::Validation("Unknown event type or location".to_string());
        }
    }

    AppError::Database(err)
}

fn total_pages(total: i64, per_page: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    }
}
