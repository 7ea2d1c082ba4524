use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use podium_db::models::UserRow;
use podium_types::{CreateUserRequest, UpdateUserRequest, User};

use crate::error::ApiError;
use crate::{AppState, db_call, parse_id, parse_timestamp};

pub(crate) fn to_user(row: UserRow) -> User {
    User {
        id: parse_id(&row.id, "user"),
        handle: row.handle,
        display_name: row.display_name,
        phone_number: row.phone_number,
        created_at: parse_timestamp(&row.created_at, "user"),
    }
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.handle.trim().is_empty() {
        return Err(ApiError::invalid("handle must not be empty"));
    }
    let id = Uuid::new_v4().to_string();
    let row = db_call(&state, move |db| {
        db.create_user(
            &id,
            &req.handle,
            req.display_name.as_deref(),
            req.phone_number.as_deref(),
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(to_user(row))))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let id = id.to_string();
    let row = db_call(&state, move |db| db.get_user(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(Json(to_user(row)))
}

/// GET /users/by_handle/{handle}
pub async fn get_user_by_handle(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<User>, ApiError> {
    let row = db_call(&state, move |db| db.get_user_by_handle(&handle))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(Json(to_user(row)))
}

/// PATCH /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let id = id.to_string();
    let row = db_call(&state, move |db| {
        db.update_user(&id, req.display_name.as_deref(), req.phone_number.as_deref())
    })
    .await?;
    Ok(Json(to_user(row)))
}
