//! # brevity-api
//!
//! HTTP surface for brevity: account and session routes, owner-scoped note
//! CRUD, streamed summaries, and a per-caller change feed.
//!
//! [`build_router`] assembles the routes and middleware over an [`AppState`];
//! the binary wires that state to PostgreSQL and the hosted completion model,
//! while tests wire it to in-memory doubles.

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

use handlers::{auth, events, health, notes, summary};

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// All routes plus tracing, request-id and CORS middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.allowed_origins.clone()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health::health_check))
        // Accounts and sessions
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/oauth/google", get(auth::google_authorize))
        .route(
            "/api/v1/auth/oauth/google/callback",
            get(auth::google_callback),
        )
        // Notes
        .route(
            "/api/v1/notes",
            get(notes::list_notes).post(notes::create_note),
        )
        .route(
            "/api/v1/notes/:id",
            get(notes::get_note)
                .patch(notes::update_note)
                .delete(notes::delete_note),
        )
        // Summaries
        .route("/api/v1/summarize", post(summary::summarize_text))
        .route("/api/v1/summarize/events", post(summary::summarize_events))
        // Change feed
        .route("/api/v1/events", get(events::note_events))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors)
        .with_state(state)
}
