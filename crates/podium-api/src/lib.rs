//! HTTP layer of the podium backend: the axum router, request handlers,
//! the error taxonomy and the on-disk photo storage.

pub mod challenges;
pub mod error;
pub mod events;
pub mod reports;
pub mod storage;
pub mod users;

pub use error::ApiError;
pub use storage::Storage;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use podium_db::{Database, DbError};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
}

/// 64 MB cap on a multipart photo upload.
const MAX_UPLOAD_SIZE: usize = 64 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let uploads_root = state.storage.root().to_path_buf();
    Router::new()
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user).patch(users::update_user))
        .route("/users/by_handle/{handle}", get(users::get_user_by_handle))
        .route(
            "/challenges",
            post(challenges::create_challenge).get(challenges::list_challenges),
        )
        .route(
            "/challenges/{id}",
            get(challenges::get_challenge)
                .patch(challenges::update_challenge)
                .delete(challenges::delete_challenge),
        )
        .route("/challenges/{id}/events", get(events::list_challenge_events))
        .route("/challenges/{id}/join", post(challenges::join_challenge))
        .route("/challenges/{id}/is_joined", get(challenges::is_joined))
        .route(
            "/challenges/{id}/participants/{user_id}/points",
            get(challenges::participant_points),
        )
        .route("/challenges/{id}/leaderboard", get(challenges::leaderboard))
        .route("/events", post(events::create_event))
        .route(
            "/events/{id}",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/reports", post(reports::create_report))
        .route("/reports/{id}/photos", post(reports::upload_photos))
        .route(
            "/reports/{id}",
            patch(reports::update_report).delete(reports::delete_report),
        )
        .route("/reports/user/{id}", get(reports::user_reports))
        .route("/reports/challenge/{id}", get(reports::challenge_reports))
        .route("/reports/event/{id}", get(reports::event_reports))
        .route("/health", get(health))
        .nest_service("/uploads", ServeDir::new(uploads_root))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run a blocking database call off the async runtime.
pub(crate) async fn db_call<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T, DbError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e)))?
        .map_err(ApiError::from)
}

// -- Row field parsing --
//
// Stored ids and timestamps are written by this crate and should always
// parse; a corrupt value is logged and mapped to a zero default rather
// than failing the whole response.

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} timestamp '{}': {}", what, raw, e);
            DateTime::default()
        })
}

pub(crate) fn parse_date(raw: &str, what: &str) -> NaiveDate {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} date '{}': {}", what, raw, e);
        NaiveDate::default()
    })
}
