use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use podium_db::models::{NewPhoto, NewReport, ReportPhotoRow, ReportRow};
use podium_db::{Database, DbError};
use podium_types::{
    CreateReportRequest, DeletedResponse, Report, ReportPhoto, UpdateReportRequest, User,
};

use crate::error::ApiError;
use crate::{AppState, db_call, parse_date, parse_id, parse_timestamp, storage};

fn to_photo(row: ReportPhotoRow) -> ReportPhoto {
    ReportPhoto {
        id: parse_id(&row.id, "photo"),
        report_id: parse_id(&row.report_id, "photo"),
        photo_url: row.photo_url,
        created_at: parse_timestamp(&row.created_at, "photo"),
    }
}

pub(crate) fn to_report(row: ReportRow, photos: Vec<ReportPhotoRow>) -> Report {
    let user = User {
        id: parse_id(&row.user_id, "user"),
        handle: row.user_handle,
        display_name: row.user_display_name,
        phone_number: row.user_phone_number,
        created_at: parse_timestamp(&row.user_created_at, "user"),
    };
    Report {
        id: parse_id(&row.id, "report"),
        user_id: user.id,
        challenge_id: row.challenge_id.as_deref().map(|v| parse_id(v, "challenge")),
        event_id: row.event_id.as_deref().map(|v| parse_id(v, "event")),
        text_content: row.text_content,
        report_date: parse_date(&row.report_date, "report"),
        points_awarded: row.points_awarded,
        rejected: row.rejected,
        rejected_at: row
            .rejected_at
            .as_deref()
            .map(|v| parse_timestamp(v, "report")),
        created_at: parse_timestamp(&row.created_at, "report"),
        user,
        photos: photos.into_iter().map(to_photo).collect(),
    }
}

fn hydrate(rows: Vec<ReportRow>, photo_rows: Vec<ReportPhotoRow>) -> Vec<Report> {
    let mut by_report: HashMap<String, Vec<ReportPhotoRow>> = HashMap::new();
    for photo in photo_rows {
        by_report
            .entry(photo.report_id.clone())
            .or_default()
            .push(photo);
    }
    rows.into_iter()
        .map(|row| {
            let photos = by_report.remove(&row.id).unwrap_or_default();
            to_report(row, photos)
        })
        .collect()
}

/// POST /reports
pub async fn create_report(
    State(state): State<AppState>,
    Json(req): Json<CreateReportRequest>,
) -> Result<Json<Report>, ApiError> {
    let id = Uuid::new_v4().to_string();
    let row = db_call(&state, move |db| {
        let user_id = req.user_id.to_string();
        let challenge_id = req.challenge_id.map(|v| v.to_string());
        let event_id = req.event_id.map(|v| v.to_string());
        db.create_report(
            &id,
            &NewReport {
                user_id: &user_id,
                text_content: &req.text_content,
                challenge_id: challenge_id.as_deref(),
                event_id: event_id.as_deref(),
                report_date: req.report_date,
            },
        )
    })
    .await?;
    // Plain 200, not 201; the bot clients check for exactly that.
    Ok(Json(to_report(row, vec![])))
}

/// POST /reports/{id}/photos
///
/// Multipart upload under the field name `photos`. The part count must
/// match the report's required photo count exactly, and a report that
/// already has photos refuses another batch. Files are written before the
/// rows; if recording fails, the files are unlinked again.
pub async fn upload_photos(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Vec<ReportPhoto>>, ApiError> {
    let report_id = id.to_string();

    let mut blobs: Vec<(String, Bytes)> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("photos") {
            continue;
        }
        let original = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("photo_{}.jpg", blobs.len()));
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::invalid(format!("failed to read upload: {}", e)))?;
        blobs.push((original, data));
    }

    // Validate the batch before any blob hits disk.
    let check_id = report_id.clone();
    let requirements = db_call(&state, move |db| db.photo_requirements(&check_id)).await?;
    if requirements.existing > 0 {
        return Err(ApiError::invalid("photos already uploaded for this report"));
    }
    if blobs.len() as u32 != requirements.required {
        return Err(ApiError::invalid(format!(
            "expected {} photos, got {}",
            requirements.required,
            blobs.len()
        )));
    }

    let millis = Utc::now().timestamp_millis();
    let mut file_names: Vec<String> = Vec::new();
    for (index, (original, data)) in blobs.iter().enumerate() {
        let file_name = storage::photo_file_name(&report_id, millis, index, original);
        if let Err(e) = state.storage.save_photo(&file_name, data).await {
            state.storage.delete_photo(&file_name).await.ok();
            remove_files(&state, &file_names).await;
            return Err(ApiError::Storage(e));
        }
        file_names.push(file_name);
    }

    let record_id = report_id.clone();
    let names = file_names.clone();
    let result = db_call(&state, move |db| {
        let ids: Vec<String> = names.iter().map(|_| Uuid::new_v4().to_string()).collect();
        let urls: Vec<String> = names.iter().map(|n| storage::photo_url(n)).collect();
        let photos: Vec<NewPhoto> = ids
            .iter()
            .zip(urls.iter())
            .map(|(id, url)| NewPhoto {
                id: id.as_str(),
                photo_url: url.as_str(),
            })
            .collect();
        db.add_report_photos(&record_id, &photos)
    })
    .await;

    match result {
        Ok(rows) => Ok(Json(rows.into_iter().map(to_photo).collect())),
        Err(e) => {
            // The rows never landed, so take the files back out too.
            remove_files(&state, &file_names).await;
            Err(e)
        }
    }
}

async fn remove_files(state: &AppState, names: &[String]) {
    for name in names {
        if let Err(e) = state.storage.delete_photo(name).await {
            warn!("Failed to remove photo {} during rollback: {}", name, e);
        }
    }
}

/// PATCH /reports/{id}
///
/// The only supported edit is flipping `rejected` to true.
pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReportRequest>,
) -> Result<Json<Report>, ApiError> {
    if !req.rejected.unwrap_or(false) {
        return Err(ApiError::invalid("nothing to update"));
    }
    let report_id = id.to_string();
    let (row, photos) = db_call(&state, move |db| {
        let row = db.reject_report(&report_id)?;
        let ids = vec![row.id.clone()];
        let photos = db.photos_for_reports(&ids)?;
        Ok((row, photos))
    })
    .await?;
    Ok(Json(to_report(row, photos)))
}

/// DELETE /reports/{id}
///
/// Deletion is a rejection: the row survives for audit, the award is
/// reversed, and repeating the call changes nothing further.
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let report_id = id.to_string();
    db_call(&state, move |db| db.reject_report(&report_id)).await?;
    Ok(Json(DeletedResponse {
        message: "Report deleted successfully".to_string(),
    }))
}

async fn hydrated_reports<F>(state: &AppState, fetch: F) -> Result<Json<Vec<Report>>, ApiError>
where
    F: FnOnce(&Database) -> Result<Vec<ReportRow>, DbError> + Send + 'static,
{
    let (rows, photos) = db_call(state, move |db| {
        let rows = fetch(db)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let photos = db.photos_for_reports(&ids)?;
        Ok((rows, photos))
    })
    .await?;
    Ok(Json(hydrate(rows, photos)))
}

/// GET /reports/user/{id}
pub async fn user_reports(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let user_id = id.to_string();
    hydrated_reports(&state, move |db| db.reports_by_user(&user_id)).await
}

/// GET /reports/challenge/{id}
pub async fn challenge_reports(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let challenge_id = id.to_string();
    hydrated_reports(&state, move |db| db.reports_by_challenge(&challenge_id)).await
}

/// GET /reports/event/{id}
pub async fn event_reports(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let event_id = id.to_string();
    hydrated_reports(&state, move |db| db.reports_by_event(&event_id)).await
}
