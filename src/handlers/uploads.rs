use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Hard cap on a stored image. The router's body limit sits a little
/// above this so the multipart framing itself has room.
pub const MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
enum UploadKind {
    ProfileAvatar,
    OrganiserLogo,
    EventImage,
}

impl UploadKind {
    fn from_endpoint(endpoint: &str) -> Result<Self, AppError> {
        match endpoint {
            "profile-avatar" => Ok(Self::ProfileAvatar),
            "organiser-logo" => Ok(Self::OrganiserLogo),
            "event-image" => Ok(Self::EventImage),
            _ => Err(AppError::NotFound("Unknown upload endpoint".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    url: String,
}

/// Accepts a single image, stores it under the upload directory and
/// returns its public URL. The avatar and logo endpoints also point the
/// caller's profile at the new image.
pub async fn upload_image(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let kind = UploadKind::from_endpoint(&endpoint)?;

    let (extension, data) = read_single_image(&mut multipart).await?;

    let filename = format!("{}.{extension}", Uuid::new_v4());
    let dir = &state.config.upload_dir;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| AppError::Internal(format!("Failed to prepare upload dir: {err}")))?;
    tokio::fs::write(dir.join(&filename), &data)
        .await
        .map_err(|err| AppError::Internal(format!("Failed to store upload: {err}")))?;

    let url = format!(
        "{}/uploads/{filename}",
        state.config.public_base_url.trim_end_matches('/')
    );

    match kind {
        UploadKind::ProfileAvatar => {
            let result = sqlx::query(
                "UPDATE profiles SET avatar_url = $1, updated_at = now() WHERE user_id = $2",
            )
            .bind(&url)
            .bind(user.user_id)
            .execute(&state.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::NotFound("Profile not found".to_string()));
            }
        }
        UploadKind::OrganiserLogo => {
            let result = sqlx::query(
                "UPDATE organiser_profiles
                 SET profile_image_url = $1, updated_at = now()
                 WHERE user_id = $2",
            )
            .bind(&url)
            .bind(user.user_id)
            .execute(&state.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::Validation(
                    "Create your organiser profile first".to_string(),
                ));
            }
        }
        // The URL goes into the event form; nothing to update yet.
        UploadKind::EventImage => {}
    }

    Ok(success(UploadResponse { url }, "Upload complete"))
}

async fn read_single_image(multipart: &mut Multipart) -> Result<(String, Bytes), AppError> {
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Upload(format!("Could not read the upload: {err}")))?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }

        if file.is_some() {
            return Err(AppError::Upload(
                "Upload a single file per request".to_string(),
            ));
        }

        let extension = extension_for(field.content_type().unwrap_or_default())?.to_string();

        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::Upload(format!("Could not read the upload: {err}")))?;

        if data.is_empty() {
            return Err(AppError::Upload("The uploaded file is empty".to_string()));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::Upload(
                "Images are limited to 4 MiB".to_string(),
            ));
        }

        file = Some((extension, data));
    }

    file.ok_or_else(|| AppError::Upload("No file found in the request".to_string()))
}

fn extension_for(content_type: &str) -> Result<&'static str, AppError> {
    match content_type {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/gif" => Ok("gif"),
        "image/webp" => Ok("webp"),
        "image/svg+xml" => Ok("svg"),
        other if other.starts_with("image/") => Err(AppError::Upload(
            "Unsupported image format".to_string(),
        )),
        _ => Err(AppError::Upload(
            "Only image uploads are allowed".to_string(),
        )),
    }
}
