use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One admission unit. Every booking of quantity N owns exactly N of these,
/// each with a globally unique `ticket_number`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub ticket_number: Uuid,
    pub is_scanned: bool,
    pub created_at: DateTime<Utc>,
}
