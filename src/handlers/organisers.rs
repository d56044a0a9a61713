use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::OrganiserProfile;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;
use crate::utils::slug::slugify;

#[derive(Debug, Deserialize)]
pub struct UpsertOrganiserRequest {
    pub name: String,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub contact_email: Option<String>,
}

pub async fn get_organiser(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let profile: OrganiserProfile =
        sqlx::query_as("SELECT * FROM organiser_profiles WHERE user_id = $1")
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Organiser profile not found".to_string()))?;

    Ok(success(profile, "Organiser profile retrieved successfully"))
}

/// Creates the caller's organiser profile or updates it in place.
/// Organisation names are unique across the platform.
pub async fn upsert_organiser(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UpsertOrganiserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Organisation name is required".to_string(),
        ));
    }

    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "Organisation name must include letters or numbers".to_string(),
        ));
    }

    let taken: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM organiser_profiles WHERE name = $1 AND user_id <> $2",
    )
    .bind(&name)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;

    if taken.is_some() {
        return Err(name_taken_error());
    }

    let profile = sqlx::query_as::<_, OrganiserProfile>(
        "INSERT INTO organiser_profiles
             (user_id, name, slug, description, website_url, contact_email)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (user_id) DO UPDATE
         SET name = EXCLUDED.name,
             slug = EXCLUDED.slug,
             description = EXCLUDED.description,
             website_url = EXCLUDED.website_url,
             contact_email = EXCLUDED.contact_email,
             updated_at = now()
         RETURNING *",
    )
    .bind(user.user_id)
    .bind(&name)
    .bind(&slug)
    .bind(normalized(&payload.description))
    .bind(normalized(&payload.website_url))
    .bind(normalized(&payload.contact_email))
    .fetch_one(&state.pool)
    .await
    .map_err(|err| match &err {
        // The precheck races with concurrent saves; the unique index on
        // name has the final say.
        sqlx::Error::Database(db) if db.is_unique_violation() => name_taken_error(),
        _ => AppError::Database(err),
    })?;

    Ok(success(profile, "Organiser profile saved"))
}

/// Gate for event management: the caller needs a filled-in organiser
/// profile before they can host anything.
pub async fn require_complete_organiser(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<OrganiserProfile, AppError> {
    let profile: Option<OrganiserProfile> =
        sqlx::query_as("SELECT * FROM organiser_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    match profile {
        Some(profile) if profile.is_complete() => Ok(profile),
        _ => Err(AppError::Validation(
            "Complete your organiser profile before hosting events".to_string(),
        )),
    }
}

fn name_taken_error() -> AppError {
    AppError::Validation("That organisation name is already taken".to_string())
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_drops_blank_values() {
        assert_eq!(normalized(&None), None);
        assert_eq!(normalized(&Some("   ".to_string())), None);
        assert_eq!(
            normalized(&Some("  https://makers.example  ".to_string())),
            Some("https://makers.example".to_string())
        );
    }
}
