use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Session;
use crate::state::AppState;
use crate::utils::error::AppError;

/// The authenticated caller, resolved from the `Authorization` header.
///
/// Handlers that take a `CurrentUser` argument reject unauthenticated
/// requests before any of their own code runs.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub session_token: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = bearer_token(parts)?;
        let token = Uuid::parse_str(raw)
            .map_err(|_| AppError::Unauthenticated("Invalid session token".to_string()))?;

        let row: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT u.id, u.email
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&state.pool)
        .await?;

        let (user_id, email) = row
            .ok_or_else(|| AppError::Unauthenticated("Session has expired".to_string()))?;

        Ok(CurrentUser {
            user_id,
            email,
            session_token: token,
        })
    }
}

/// Pulls the raw token out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get("authorization")
        .ok_or_else(|| AppError::Unauthenticated("Missing authorization header".to_string()))?;

    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Invalid authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("Expected a bearer token".to_string()))
}

/// Opens a session for `user_id` and returns the stored row.
pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_days: i64,
) -> Result<Session, AppError> {
    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (token, user_id, expires_at)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(Utc::now() + Duration::days(ttl_days))
    .fetch_one(pool)
    .await?;

    Ok(session)
}

/// Removes one session and sweeps any that have already expired.
pub async fn delete_session(pool: &PgPool, token: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE token = $1 OR expires_at <= now()")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header("authorization", value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn bearer_token_extracts_the_token() {
        let parts = parts_with_auth("Bearer abc-123");
        assert_eq!(bearer_token(&parts).unwrap(), "abc-123");
    }

    #[test]
    fn bearer_token_rejects_missing_header() {
        let (parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(bearer_token(&parts).is_err());
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        let parts = parts_with_auth("Basic dXNlcjpwYXNz");
        assert!(bearer_token(&parts).is_err());
    }

    #[test]
    fn bearer_token_rejects_empty_token() {
        let parts = parts_with_auth("Bearer   ");
        assert!(bearer_token(&parts).is_err());
    }
}
