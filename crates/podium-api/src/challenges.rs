use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use podium_db::models::{ChallengePatch, ChallengeRow, NewChallenge, ParticipantRow};
use podium_types::{
    Challenge, CreateChallengeRequest, DeletedResponse, JoinedResponse, LeaderboardEntry,
    Participant, PointsResponse, UpdateChallengeRequest, UserIdQuery,
};

use crate::error::ApiError;
use crate::{AppState, db_call, parse_date, parse_id, parse_timestamp};

pub(crate) fn to_challenge(row: ChallengeRow) -> Challenge {
    Challenge {
        id: parse_id(&row.id, "challenge"),
        title: row.title,
        description: row.description,
        start_date: parse_date(&row.start_date, "challenge"),
        end_date: parse_date(&row.end_date, "challenge"),
        requires_phone: row.requires_phone,
        points_per_report: row.points_per_report,
        required_photos: row.required_photos,
        created_at: parse_timestamp(&row.created_at, "challenge"),
    }
}

fn to_participant(row: ParticipantRow) -> Participant {
    Participant {
        id: parse_id(&row.id, "participant"),
        user_id: parse_id(&row.user_id, "participant"),
        challenge_id: parse_id(&row.challenge_id, "participant"),
        points: row.points,
        joined_at: parse_timestamp(&row.joined_at, "participant"),
    }
}

/// POST /challenges
pub async fn create_challenge(
    State(state): State<AppState>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::invalid("title must not be empty"));
    }
    let id = Uuid::new_v4().to_string();
    let row = db_call(&state, move |db| {
        db.create_challenge(
            &id,
            &NewChallenge {
                title: &req.title,
                description: &req.description,
                start_date: req.start_date,
                end_date: req.end_date,
                requires_phone: req.requires_phone,
                points_per_report: req.points_per_report,
                required_photos: req.required_photos,
            },
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(to_challenge(row))))
}

/// GET /challenges
pub async fn list_challenges(
    State(state): State<AppState>,
) -> Result<Json<Vec<Challenge>>, ApiError> {
    let rows = db_call(&state, |db| db.list_challenges()).await?;
    Ok(Json(rows.into_iter().map(to_challenge).collect()))
}

/// GET /challenges/{id}
pub async fn get_challenge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Challenge>, ApiError> {
    let id = id.to_string();
    let row = db_call(&state, move |db| db.get_challenge(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Challenge"))?;
    Ok(Json(to_challenge(row)))
}

/// PATCH /challenges/{id}
pub async fn update_challenge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateChallengeRequest>,
) -> Result<Json<Challenge>, ApiError> {
    let id = id.to_string();
    let row = db_call(&state, move |db| {
        db.update_challenge(
            &id,
            &ChallengePatch {
                title: req.title.as_deref(),
                description: req.description.as_deref(),
                start_date: req.start_date,
                end_date: req.end_date,
                requires_phone: req.requires_phone,
                points_per_report: req.points_per_report,
                required_photos: req.required_photos,
            },
        )
    })
    .await?;
    Ok(Json(to_challenge(row)))
}

/// DELETE /challenges/{id}
pub async fn delete_challenge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = id.to_string();
    db_call(&state, move |db| db.delete_challenge(&id)).await?;
    Ok(Json(DeletedResponse {
        message: "Challenge deleted successfully".to_string(),
    }))
}

/// POST /challenges/{id}/join?user_id=...
pub async fn join_challenge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Participant>, ApiError> {
    let participant_id = Uuid::new_v4().to_string();
    let challenge_id = id.to_string();
    let user_id = query.user_id.to_string();
    let row = db_call(&state, move |db| {
        db.join_challenge(&participant_id, &user_id, &challenge_id)
    })
    .await?;
    Ok(Json(to_participant(row)))
}

/// GET /challenges/{id}/is_joined?user_id=...
pub async fn is_joined(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<JoinedResponse>, ApiError> {
    let challenge_id = id.to_string();
    let user_id = query.user_id.to_string();
    let joined = db_call(&state, move |db| db.is_joined(&user_id, &challenge_id)).await?;
    Ok(Json(JoinedResponse { joined }))
}

/// GET /challenges/{id}/participants/{user_id}/points
pub async fn participant_points(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PointsResponse>, ApiError> {
    let challenge_id = id.to_string();
    let user_id = user_id.to_string();
    let points = db_call(&state, move |db| {
        db.participant_points(&user_id, &challenge_id)
    })
    .await?;
    Ok(Json(PointsResponse { points }))
}

/// GET /challenges/{id}/leaderboard
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let challenge_id = id.to_string();
    let rows = db_call(&state, move |db| db.leaderboard(&challenge_id)).await?;
    let entries = rows
        .into_iter()
        .map(|row| LeaderboardEntry {
            user_id: parse_id(&row.user_id, "participant"),
            display_name: row.display_name,
            points: row.points,
            joined_at: parse_timestamp(&row.joined_at, "participant"),
        })
        .collect();
    Ok(Json(entries))
}
