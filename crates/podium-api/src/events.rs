use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use podium_db::models::{EventPatch, EventRow, NewEvent};
use podium_types::{CreateEventRequest, DeletedResponse, Event, UpdateEventRequest};

use crate::error::ApiError;
use crate::{AppState, db_call, parse_date, parse_id, parse_timestamp};

pub(crate) fn to_event(row: EventRow) -> Event {
    Event {
        id: parse_id(&row.id, "event"),
        challenge_id: parse_id(&row.challenge_id, "event"),
        title: row.title,
        description: row.description,
        date: parse_date(&row.date, "event"),
        points_per_report: row.points_per_report,
        required_photos: row.required_photos,
        created_at: parse_timestamp(&row.created_at, "event"),
    }
}

/// POST /events
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::invalid("title must not be empty"));
    }
    let id = Uuid::new_v4().to_string();
    let row = db_call(&state, move |db| {
        let challenge_id = req.challenge_id.to_string();
        db.create_event(
            &id,
            &NewEvent {
                challenge_id: &challenge_id,
                title: &req.title,
                description: &req.description,
                date: req.date,
                points_per_report: req.points_per_report,
                required_photos: req.required_photos,
            },
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(to_event(row))))
}

/// GET /events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    let id = id.to_string();
    let row = db_call(&state, move |db| db.get_event(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;
    Ok(Json(to_event(row)))
}

/// GET /challenges/{id}/events
pub async fn list_challenge_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let challenge_id = id.to_string();
    let rows = db_call(&state, move |db| db.events_for_challenge(&challenge_id)).await?;
    Ok(Json(rows.into_iter().map(to_event).collect()))
}

/// PATCH /events/{id}
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    let id = id.to_string();
    let row = db_call(&state, move |db| {
        db.update_event(
            &id,
            &EventPatch {
                title: req.title.as_deref(),
                description: req.description.as_deref(),
                date: req.date,
                points_per_report: req.points_per_report,
                required_photos: req.required_photos,
            },
        )
    })
    .await?;
    Ok(Json(to_event(row)))
}

/// DELETE /events/{id}
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = id.to_string();
    db_call(&state, move |db| db.delete_event(&id)).await?;
    Ok(Json(DeletedResponse {
        message: "Event deleted successfully".to_string(),
    }))
}
