use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub handle: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requires_phone: bool,
    pub points_per_report: i64,
    pub required_photos: u32,
    pub created_at: DateTime<Utc>,
}

/// A single-day activity inside a challenge. Its point value and photo
/// count override the challenge defaults for reports that target it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub points_per_report: i64,
    pub required_photos: u32,
    pub created_at: DateTime<Utc>,
}

/// Join row between a user and a challenge, carrying the running point
/// balance. At most one exists per (user, challenge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub points: i64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPhoto {
    pub id: Uuid,
    pub report_id: Uuid,
    pub photo_url: String,
    pub created_at: DateTime<Utc>,
}

/// A report as returned by the API: hydrated with its author and photos.
/// `points_awarded` is the amount credited at creation; rejection reverses
/// exactly this amount regardless of later challenge/event edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub text_content: String,
    pub report_date: NaiveDate,
    pub points_awarded: i64,
    pub rejected: bool,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub user: User,
    pub photos: Vec<ReportPhoto>,
}
