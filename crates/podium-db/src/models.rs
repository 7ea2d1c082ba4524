//! Database row types, mapping directly to SQLite rows.
//! Distinct from the podium-types API models to keep the storage layer
//! independent; timestamps stay as stored text until the API layer parses
//! them.

use chrono::NaiveDate;

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ChallengeRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub requires_phone: bool,
    pub points_per_report: i64,
    pub required_photos: u32,
    pub created_at: String,
}

#[derive(Debug)]
pub struct EventRow {
    pub id: String,
    pub challenge_id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub points_per_report: i64,
    pub required_photos: u32,
    pub created_at: String,
}

pub struct ParticipantRow {
    pub id: String,
    pub user_id: String,
    pub challenge_id: String,
    pub points: i64,
    pub joined_at: String,
}

/// Report row with the author's columns joined in flat; the API layer
/// nests them back into a user object.
#[derive(Debug)]
pub struct ReportRow {
    pub id: String,
    pub user_id: String,
    pub challenge_id: Option<String>,
    pub event_id: Option<String>,
    pub text_content: String,
    pub report_date: String,
    pub points_awarded: i64,
    pub rejected: bool,
    pub rejected_at: Option<String>,
    pub created_at: String,
    pub user_handle: String,
    pub user_display_name: Option<String>,
    pub user_phone_number: Option<String>,
    pub user_created_at: String,
}

#[derive(Debug)]
pub struct ReportPhotoRow {
    pub id: String,
    pub report_id: String,
    pub photo_url: String,
    pub created_at: String,
}

pub struct LeaderboardRow {
    pub user_id: String,
    pub display_name: String,
    pub points: i64,
    pub joined_at: String,
}

// -- Insert/update inputs --

pub struct NewChallenge<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requires_phone: bool,
    pub points_per_report: i64,
    pub required_photos: u32,
}

#[derive(Default)]
pub struct ChallengePatch<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub requires_phone: Option<bool>,
    pub points_per_report: Option<i64>,
    pub required_photos: Option<u32>,
}

pub struct NewEvent<'a> {
    pub challenge_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub date: NaiveDate,
    pub points_per_report: i64,
    pub required_photos: u32,
}

#[derive(Default)]
pub struct EventPatch<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub date: Option<NaiveDate>,
    pub points_per_report: Option<i64>,
    pub required_photos: Option<u32>,
}

pub struct NewReport<'a> {
    pub user_id: &'a str,
    pub text_content: &'a str,
    pub challenge_id: Option<&'a str>,
    pub event_id: Option<&'a str>,
    pub report_date: NaiveDate,
}

/// Photo-count state of a report, used to validate an upload before any
/// blob is written.
pub struct PhotoRequirements {
    pub required: u32,
    pub existing: u32,
}

pub struct NewPhoto<'a> {
    pub id: &'a str,
    pub photo_url: &'a str,
}
