use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::EventType;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CreateEventTypeRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn list_event_types(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let types = sqlx::query_as::<_, EventType>("SELECT * FROM event_types ORDER BY name")
        .fetch_all(&state.pool)
        .await?;

    Ok(success(types, "Event types retrieved successfully"))
}

pub async fn create_event_type(
    _user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateEventTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Event type name is required".to_string(),
        ));
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM event_types WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_optional(&state.pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::Validation(
            "That event type already exists".to_string(),
        ));
    }

    let event_type = sqlx::query_as::<_, EventType>(
        "INSERT INTO event_types (name, description) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(
        payload
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty()),
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(created(event_type, "Event type created successfully"))
}
