use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::models::Profile;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
}

pub async fn get_profile(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let profile: Profile = sqlx::query_as("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(success(profile, "Profile retrieved successfully"))
}

/// Partial update of the caller's profile. Sending an empty `bio` clears it.
pub async fn update_profile(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile: Profile = sqlx::query_as("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    let (username, bio) = merge_profile_update(&profile, &payload)?;

    let updated = sqlx::query_as::<_, Profile>(
        "UPDATE profiles
         SET username = $1, bio = $2, updated_at = now()
         WHERE user_id = $3
         RETURNING *",
    )
    .bind(&username)
    .bind(&bio)
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(updated, "Profile updated successfully"))
}

fn merge_profile_update(
    profile: &Profile,
    patch: &UpdateProfileRequest,
) -> Result<(String, Option<String>), AppError> {
    let username = match patch.username.as_deref().map(str::trim) {
        Some("") => {
            return Err(AppError::Validation("Username cannot be empty".to_string()));
        }
        Some(name) => name.to_string(),
        None => profile.username.clone(),
    };

    let bio = match patch.bio.as_deref().map(str::trim) {
        Some("") => None,
        Some(bio) => Some(bio.to_string()),
        None => profile.bio.clone(),
    };

    Ok((username, bio))
}
