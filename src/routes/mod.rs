use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::auth;
use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    self, bookings, event_types, events, locations, organisers, profiles, uploads,
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/sign-up", post(auth::handlers::sign_up))
        .route("/auth/sign-in", post(auth::handlers::sign_in))
        .route("/auth/verify", post(auth::handlers::verify))
        .route("/auth/sign-out", post(auth::handlers::sign_out))
        .route("/auth/session", get(auth::handlers::session))
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/:id",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/cancel", post(events::cancel_event))
        .route("/events/:id/book", post(bookings::book_event))
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings/:id", get(bookings::get_booking))
        .route(
            "/profile",
            get(profiles::get_profile).patch(profiles::update_profile),
        )
        .route(
            "/organiser",
            get(organisers::get_organiser).put(organisers::upsert_organiser),
        )
        .route("/organiser/events", get(events::list_organiser_events))
        .route(
            "/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/event-types",
            get(event_types::list_event_types).post(event_types::create_event_type),
        )
        .route(
            "/uploads/:endpoint",
            post(uploads::upload_image)
                // Room for multipart framing on top of the image cap.
                .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BYTES + 512 * 1024)),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
