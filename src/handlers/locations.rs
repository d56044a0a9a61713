use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::models::Location;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub postal_code: Option<String>,
    pub venue_type: Option<String>,
}

pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let locations = sqlx::query_as::<_, Location>("SELECT * FROM locations ORDER BY name")
        .fetch_all(&state.pool)
        .await?;

    Ok(success(locations, "Locations retrieved successfully"))
}

/// Adds a venue. Any signed-in user can add one while filling in an
/// event form.
pub async fn create_location(
    _user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    for (value, label) in [
        (&payload.name, "Venue name"),
        (&payload.address, "Address"),
        (&payload.city, "City"),
        (&payload.country, "Country"),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{label} is required")));
        }
    }

    let location = sqlx::query_as::<_, Location>(
        "INSERT INTO locations (name, address, city, state, country, postal_code, venue_type)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(payload.name.trim())
    .bind(payload.address.trim())
    .bind(payload.city.trim())
    .bind(payload.state.as_deref().map(str::trim))
    .bind(payload.country.trim())
    .bind(payload.postal_code.as_deref().map(str::trim))
    .bind(payload.venue_type.as_deref().map(str::trim))
    .fetch_one(&state.pool)
    .await?;

    Ok(created(location, "Location created successfully"))
}
