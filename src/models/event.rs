use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An event as stored. `max_attendees` is the REMAINING sellable capacity
/// (null = unlimited); it is decremented by the booking workflow and edited
/// directly by the organiser, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub full_description: String,
    pub image_url: Option<String>,
    pub type_id: Uuid,
    pub location_id: Uuid,
    pub organiser_profile_id: Uuid,
    pub max_attendees: Option<i32>,
    pub ticket_price: Decimal,
    pub is_free: bool,
    pub is_published: bool,
    pub is_cancelled: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
