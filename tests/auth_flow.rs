//! Sign-in flow tests against a real Postgres database.
//!
//! Run with `cargo test -- --ignored` and a `DATABASE_URL` pointing at a
//! scratch database.

mod common;

use axum::extract::{FromRequestParts, State};
use axum::http::Request;
use axum::Json;
use uuid::Uuid;

use eventfully_server::auth::handlers::{sign_up, verify, EmailRequest, VerifyRequest};
use eventfully_server::auth::CurrentUser;
use eventfully_server::state::AppState;
use eventfully_server::utils::error::AppError;

async fn signed_up_user(state: &AppState, email: &str) -> (Uuid, Uuid) {
    sign_up(
        State(state.clone()),
        Json(EmailRequest {
            email: email.to_string(),
        }),
    )
    .await
    .expect("sign-up should succeed");

    sqlx::query_as(
        "SELECT u.id, t.token
         FROM users u
         JOIN login_tokens t ON t.user_id = u.id
         WHERE u.email = $1",
    )
    .bind(email)
    .fetch_one(&state.pool)
    .await
    .expect("sign-up should have stored a user and a login token")
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn sign_up_creates_account_profile_and_login_token() {
    let pool = common::pool().await;
    let state = common::state(&pool);
    let email = format!("ada-{}@test.example", Uuid::new_v4());

    let (user_id, _token) = signed_up_user(&state, &email).await;

    let profiles = common::count(
        &pool,
        "SELECT COUNT(*) FROM profiles WHERE user_id = $1",
        user_id,
    )
    .await;
    assert_eq!(profiles, 1);

    // Registering the same address twice is rejected.
    let err = sign_up(
        State(state),
        Json(EmailRequest {
            email: email.clone(),
        }),
    )
    .await
    .err()
    .expect("duplicate sign-up should fail");
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn login_links_are_single_use() {
    let pool = common::pool().await;
    let state = common::state(&pool);
    let email = format!("grace-{}@test.example", Uuid::new_v4());

    let (_user_id, token) = signed_up_user(&state, &email).await;

    verify(State(state.clone()), Json(VerifyRequest { token }))
        .await
        .expect("first redemption should succeed");

    let err = verify(State(state), Json(VerifyRequest { token }))
        .await
        .err()
        .expect("second redemption should fail");
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn bearer_sessions_resolve_the_current_user() {
    let pool = common::pool().await;
    let state = common::state(&pool);
    let email = format!("joan-{}@test.example", Uuid::new_v4());

    let (user_id, token) = signed_up_user(&state, &email).await;

    verify(State(state.clone()), Json(VerifyRequest { token }))
        .await
        .expect("redemption should succeed");

    let (session_token,): (Uuid,) =
        sqlx::query_as("SELECT token FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .expect("a session should exist");

    let (mut parts, _) = Request::builder()
        .header("authorization", format!("Bearer {session_token}"))
        .body(())
        .unwrap()
        .into_parts();

    let user = CurrentUser::from_request_parts(&mut parts, &state)
        .await
        .expect("the session should authenticate");

    assert_eq!(user.user_id, user_id);
    assert_eq!(user.email, email);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn expired_sessions_are_rejected() {
    let pool = common::pool().await;
    let state = common::state(&pool);
    let user_id = common::seed_user(&pool).await;

    let (session_token,): (Uuid,) = sqlx::query_as(
        "INSERT INTO sessions (user_id, expires_at)
         VALUES ($1, now() - interval '1 day')
         RETURNING token",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .expect("failed to seed session");

    let (mut parts, _) = Request::builder()
        .header("authorization", format!("Bearer {session_token}"))
        .body(())
        .unwrap()
        .into_parts();

    let err = CurrentUser::from_request_parts(&mut parts, &state)
        .await
        .err()
        .expect("an expired session must not authenticate");
    assert!(matches!(err, AppError::Unauthenticated(_)));
}
