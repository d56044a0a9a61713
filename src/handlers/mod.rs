use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::response::success;

pub mod bookings;
pub mod event_types;
pub mod events;
pub mod locations;
pub mod organisers;
pub mod profiles;
pub mod uploads;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "eventfully-api",
    };

    success(payload, "Health check successful").into_response()
}
