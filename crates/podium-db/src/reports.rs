//! Report workflow: creation with uniqueness checks and point accrual,
//! photo attachment, idempotent rejection with point reversal, and the
//! hydrated list reads. Every mutation runs as one transaction on the
//! writer connection; point deltas are expressed in SQL so a balance is
//! never read-modify-written from Rust.

use crate::error::DbError;
use crate::models::{NewPhoto, NewReport, PhotoRequirements, ReportPhotoRow, ReportRow};
use crate::queries::{exists, query_challenge, query_event, query_user};
use crate::{Database, now_str};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

const REPORT_SELECT: &str = "SELECT r.id, r.user_id, r.challenge_id, r.event_id, r.text_content,
        r.report_date, r.points_awarded, r.rejected, r.rejected_at, r.created_at,
        u.handle, u.display_name, u.phone_number, u.created_at
 FROM reports r
 JOIN users u ON r.user_id = u.id";

impl Database {
    /// Create a report and credit points in one transaction.
    ///
    /// An event report inherits the event's owning challenge when the caller
    /// omits it; a mismatched pair is rejected. The amount actually credited
    /// is frozen in `points_awarded`, which is what rejection reverses.
    pub fn create_report(&self, id: &str, new: &NewReport) -> Result<ReportRow, DbError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let user = query_user(&tx, new.user_id)?.ok_or(DbError::NotFound("User"))?;
            let report_date = new.report_date.to_string();

            let mut challenge_id: Option<String> = new.challenge_id.map(str::to_string);
            let mut points_value = 0i64;
            if let Some(event_id) = new.event_id {
                let event = query_event(&tx, event_id)?.ok_or(DbError::NotFound("Event"))?;
                match challenge_id.as_deref() {
                    Some(cid) if cid != event.challenge_id => {
                        return Err(DbError::InvalidArgument(
                            "event does not belong to the given challenge".to_string(),
                        ));
                    }
                    _ => challenge_id = Some(event.challenge_id),
                }
                points_value = event.points_per_report;
            } else if let Some(cid) = challenge_id.as_deref() {
                let challenge =
                    query_challenge(&tx, cid)?.ok_or(DbError::NotFound("Challenge"))?;
                points_value = challenge.points_per_report;
            }

            // Uniqueness pre-checks give the friendly message; the partial
            // unique indexes remain the authoritative backstop.
            if let Some(event_id) = new.event_id {
                if report_exists_for_event(&tx, new.user_id, event_id)? {
                    return Err(DbError::Conflict(
                        "report already submitted for this event".to_string(),
                    ));
                }
            } else if let Some(cid) = challenge_id.as_deref() {
                if report_exists_for_day(&tx, new.user_id, cid, &report_date)? {
                    return Err(DbError::Conflict(
                        "report already submitted for this day".to_string(),
                    ));
                }
            }

            let mut points_awarded = 0i64;
            if points_value > 0 {
                if let Some(cid) = challenge_id.as_deref() {
                    let credited = tx.execute(
                        "UPDATE participants SET points = points + ?1
                         WHERE user_id = ?2 AND challenge_id = ?3",
                        params![points_value, new.user_id, cid],
                    )?;
                    if credited > 0 {
                        points_awarded = points_value;
                    } else {
                        // Reports from non-participants are allowed; they
                        // simply carry no points.
                        debug!(
                            "user {} is not enrolled in challenge {}, no points applied",
                            new.user_id, cid
                        );
                    }
                }
            }

            let created_at = now_str();
            tx.execute(
                "INSERT INTO reports
                     (id, user_id, challenge_id, event_id, text_content, report_date,
                      points_awarded, rejected, rejected_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, ?8)",
                params![
                    id,
                    new.user_id,
                    challenge_id,
                    new.event_id,
                    new.text_content,
                    report_date,
                    points_awarded,
                    created_at
                ],
            )?;
            tx.commit()?;

            Ok(ReportRow {
                id: id.to_string(),
                user_id: new.user_id.to_string(),
                challenge_id,
                event_id: new.event_id.map(str::to_string),
                text_content: new.text_content.to_string(),
                report_date,
                points_awarded,
                rejected: false,
                rejected_at: None,
                created_at,
                user_handle: user.handle,
                user_display_name: user.display_name,
                user_phone_number: user.phone_number,
                user_created_at: user.created_at,
            })
        })
    }

    /// Idempotent soft-rejection. The first call claims the transition and
    /// reverses the frozen award, floored at zero; later calls return the
    /// current state unchanged.
    pub fn reject_report(&self, id: &str) -> Result<ReportRow, DbError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut report = query_report(&tx, id)?.ok_or(DbError::NotFound("Report"))?;

            let rejected_at = now_str();
            let claimed = tx.execute(
                "UPDATE reports SET rejected = 1, rejected_at = ?1
                 WHERE id = ?2 AND rejected = 0",
                params![rejected_at, id],
            )?;
            if claimed == 0 {
                return Ok(report);
            }

            if report.points_awarded > 0 {
                if let Some(cid) = report.challenge_id.as_deref() {
                    tx.execute(
                        "UPDATE participants SET points = MAX(0, points - ?1)
                         WHERE user_id = ?2 AND challenge_id = ?3",
                        params![report.points_awarded, report.user_id, cid],
                    )?;
                }
            }
            tx.commit()?;

            report.rejected = true;
            report.rejected_at = Some(rejected_at);
            Ok(report)
        })
    }

    pub fn reports_by_user(&self, user_id: &str) -> Result<Vec<ReportRow>, DbError> {
        self.with_conn(|conn| query_reports_where(conn, "r.user_id = ?1", user_id))
    }

    pub fn reports_by_challenge(&self, challenge_id: &str) -> Result<Vec<ReportRow>, DbError> {
        self.with_conn(|conn| query_reports_where(conn, "r.challenge_id = ?1", challenge_id))
    }

    pub fn reports_by_event(&self, event_id: &str) -> Result<Vec<ReportRow>, DbError> {
        self.with_conn(|conn| query_reports_where(conn, "r.event_id = ?1", event_id))
    }

    /// Photo-count state used to validate an upload before any blob hits
    /// disk. Required count comes from the event if the report targets one,
    /// else the challenge, else 1.
    pub fn photo_requirements(&self, report_id: &str) -> Result<PhotoRequirements, DbError> {
        self.with_conn(|conn| {
            let report = query_report(conn, report_id)?.ok_or(DbError::NotFound("Report"))?;
            let required = if let Some(event_id) = report.event_id.as_deref() {
                query_event(conn, event_id)?
                    .map(|e| e.required_photos)
                    .unwrap_or(1)
            } else if let Some(cid) = report.challenge_id.as_deref() {
                query_challenge(conn, cid)?
                    .map(|c| c.required_photos)
                    .unwrap_or(1)
            } else {
                1
            };
            let existing: i64 = conn.query_row(
                "SELECT COUNT(*) FROM report_photos WHERE report_id = ?1",
                [report_id],
                |r| r.get(0),
            )?;
            Ok(PhotoRequirements {
                required,
                existing: existing as u32,
            })
        })
    }

    /// Attach photo records to a report. The zero-existing-photos guard is
    /// re-checked inside the transaction so concurrent uploads cannot both
    /// land rows.
    pub fn add_report_photos(
        &self,
        report_id: &str,
        photos: &[NewPhoto],
    ) -> Result<Vec<ReportPhotoRow>, DbError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            if !exists(&tx, "reports", report_id)? {
                return Err(DbError::NotFound("Report"));
            }
            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM report_photos WHERE report_id = ?1",
                [report_id],
                |r| r.get(0),
            )?;
            if existing > 0 {
                return Err(DbError::InvalidArgument(
                    "photos already uploaded for this report".to_string(),
                ));
            }

            let created_at = now_str();
            let mut rows = Vec::with_capacity(photos.len());
            for photo in photos {
                tx.execute(
                    "INSERT INTO report_photos (id, report_id, photo_url, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![photo.id, report_id, photo.photo_url, created_at],
                )?;
                rows.push(ReportPhotoRow {
                    id: photo.id.to_string(),
                    report_id: report_id.to_string(),
                    photo_url: photo.photo_url.to_string(),
                    created_at: created_at.clone(),
                });
            }
            tx.commit()?;
            Ok(rows)
        })
    }

    /// Batch-fetch photos for a set of report IDs.
    pub fn photos_for_reports(&self, report_ids: &[String]) -> Result<Vec<ReportPhotoRow>, DbError> {
        if report_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=report_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, report_id, photo_url, created_at FROM report_photos
                 WHERE report_id IN ({}) ORDER BY created_at",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = report_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), map_photo)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every stored photo URL; the cleanup task diffs this against the files
    /// on disk to find orphans left behind by cascade deletes.
    pub fn all_photo_urls(&self) -> Result<Vec<String>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT photo_url FROM report_photos")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_report(conn: &Connection, id: &str) -> Result<Option<ReportRow>, DbError> {
    let sql = format!("{} WHERE r.id = ?1", REPORT_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_report).optional()?;
    Ok(row)
}

fn query_reports_where(
    conn: &Connection,
    filter: &str,
    param: &str,
) -> Result<Vec<ReportRow>, DbError> {
    let sql = format!(
        "{} WHERE {} ORDER BY r.created_at DESC",
        REPORT_SELECT, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([param], map_report)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn report_exists_for_day(
    conn: &Connection,
    user_id: &str,
    challenge_id: &str,
    report_date: &str,
) -> Result<bool, DbError> {
    let mut stmt = conn.prepare(
        "SELECT 1 FROM reports
         WHERE user_id = ?1 AND challenge_id = ?2 AND report_date = ?3 AND event_id IS NULL",
    )?;
    let found = stmt
        .query_row(params![user_id, challenge_id, report_date], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}

fn report_exists_for_event(
    conn: &Connection,
    user_id: &str,
    event_id: &str,
) -> Result<bool, DbError> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM reports WHERE user_id = ?1 AND event_id = ?2")?;
    let found = stmt
        .query_row(params![user_id, event_id], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}

fn map_report(row: &rusqlite::Row) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        challenge_id: row.get(2)?,
        event_id: row.get(3)?,
        text_content: row.get(4)?,
        report_date: row.get(5)?,
        points_awarded: row.get(6)?,
        rejected: row.get(7)?,
        rejected_at: row.get(8)?,
        created_at: row.get(9)?,
        user_handle: row.get(10)?,
        user_display_name: row.get(11)?,
        user_phone_number: row.get(12)?,
        user_created_at: row.get(13)?,
    })
}

fn map_photo(row: &rusqlite::Row) -> rusqlite::Result<ReportPhotoRow> {
    Ok(ReportPhotoRow {
        id: row.get(0)?,
        report_id: row.get(1)?,
        photo_url: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::error::DbError;
    use crate::models::{ChallengePatch, NewChallenge, NewEvent, NewPhoto, NewReport};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn seed_user(db: &Database) -> String {
        let id = new_id();
        db.create_user(&id, &format!("tg:{}", &id[..8]), Some("Runner"), None)
            .unwrap();
        id
    }

    fn seed_challenge(db: &Database, points: i64, photos: u32) -> String {
        let id = new_id();
        db.create_challenge(
            &id,
            &NewChallenge {
                title: "30 days of running",
                description: "Run every day and prove it",
                start_date: date("2024-01-01"),
                end_date: date("2024-01-31"),
                requires_phone: false,
                points_per_report: points,
                required_photos: photos,
            },
        )
        .unwrap();
        id
    }

    fn seed_event(db: &Database, challenge_id: &str, points: i64, photos: u32) -> String {
        let id = new_id();
        db.create_event(
            &id,
            &NewEvent {
                challenge_id,
                title: "Park run",
                description: "Group run in the park",
                date: date("2024-01-15"),
                points_per_report: points,
                required_photos: photos,
            },
        )
        .unwrap();
        id
    }

    fn day_report<'a>(user_id: &'a str, challenge_id: &'a str, day: NaiveDate) -> NewReport<'a> {
        NewReport {
            user_id,
            text_content: "Ran 5k this morning",
            challenge_id: Some(challenge_id),
            event_id: None,
            report_date: day,
        }
    }

    #[test]
    fn report_credits_points_and_blocks_second_same_day() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);
        db.join_challenge(&new_id(), &user, &challenge).unwrap();

        let report = db
            .create_report(&new_id(), &day_report(&user, &challenge, date("2024-01-01")))
            .unwrap();
        assert_eq!(report.points_awarded, 10);
        assert!(!report.rejected);
        assert_eq!(db.participant_points(&user, &challenge).unwrap(), 10);

        let err = db
            .create_report(&new_id(), &day_report(&user, &challenge, date("2024-01-01")))
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert_eq!(db.participant_points(&user, &challenge).unwrap(), 10);
    }

    #[test]
    fn different_days_and_challenges_do_not_conflict() {
        let db = test_db();
        let user = seed_user(&db);
        let first = seed_challenge(&db, 10, 1);
        let second = seed_challenge(&db, 5, 1);
        db.join_challenge(&new_id(), &user, &first).unwrap();
        db.join_challenge(&new_id(), &user, &second).unwrap();

        db.create_report(&new_id(), &day_report(&user, &first, date("2024-01-01")))
            .unwrap();
        db.create_report(&new_id(), &day_report(&user, &first, date("2024-01-02")))
            .unwrap();
        db.create_report(&new_id(), &day_report(&user, &second, date("2024-01-01")))
            .unwrap();

        assert_eq!(db.participant_points(&user, &first).unwrap(), 20);
        assert_eq!(db.participant_points(&user, &second).unwrap(), 5);
    }

    #[test]
    fn event_report_inherits_challenge_and_is_unique_across_days() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);
        let event = seed_event(&db, &challenge, 25, 2);
        db.join_challenge(&new_id(), &user, &challenge).unwrap();

        let report = db
            .create_report(
                &new_id(),
                &NewReport {
                    user_id: &user,
                    text_content: "Made it to the park run",
                    challenge_id: None,
                    event_id: Some(&event),
                    report_date: date("2024-01-15"),
                },
            )
            .unwrap();
        assert_eq!(report.challenge_id.as_deref(), Some(challenge.as_str()));
        assert_eq!(report.points_awarded, 25);
        assert_eq!(db.participant_points(&user, &challenge).unwrap(), 25);

        // A second report for the same event conflicts even on another day.
        let err = db
            .create_report(
                &new_id(),
                &NewReport {
                    user_id: &user,
                    text_content: "Trying again",
                    challenge_id: Some(&challenge),
                    event_id: Some(&event),
                    report_date: date("2024-01-16"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[test]
    fn event_report_rejects_mismatched_challenge() {
        let db = test_db();
        let user = seed_user(&db);
        let owning = seed_challenge(&db, 10, 1);
        let other = seed_challenge(&db, 10, 1);
        let event = seed_event(&db, &owning, 25, 2);

        let err = db
            .create_report(
                &new_id(),
                &NewReport {
                    user_id: &user,
                    text_content: "Wrong pairing",
                    challenge_id: Some(&other),
                    event_id: Some(&event),
                    report_date: date("2024-01-15"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn non_participant_report_carries_no_points() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);

        let report = db
            .create_report(&new_id(), &day_report(&user, &challenge, date("2024-01-01")))
            .unwrap();
        assert_eq!(report.points_awarded, 0);
        assert_eq!(db.participant_points(&user, &challenge).unwrap(), 0);
        assert_eq!(db.reports_by_user(&user).unwrap().len(), 1);
    }

    #[test]
    fn missing_references_are_not_found() {
        let db = test_db();
        let user = seed_user(&db);

        let err = db
            .create_report(&new_id(), &day_report(&new_id(), &new_id(), date("2024-01-01")))
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound("User")));

        let err = db
            .create_report(&new_id(), &day_report(&user, &new_id(), date("2024-01-01")))
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound("Challenge")));

        let err = db
            .create_report(
                &new_id(),
                &NewReport {
                    user_id: &user,
                    text_content: "No such event",
                    challenge_id: None,
                    event_id: Some(&new_id()),
                    report_date: date("2024-01-01"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound("Event")));
    }

    #[test]
    fn reject_reverses_the_frozen_award() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);
        db.join_challenge(&new_id(), &user, &challenge).unwrap();

        let report = db
            .create_report(&new_id(), &day_report(&user, &challenge, date("2024-01-01")))
            .unwrap();
        assert_eq!(db.participant_points(&user, &challenge).unwrap(), 10);

        // Raising the challenge's value later must not change what the
        // rejection takes back.
        db.update_challenge(
            &challenge,
            &ChallengePatch {
                points_per_report: Some(99),
                ..Default::default()
            },
        )
        .unwrap();

        let rejected = db.reject_report(&report.id).unwrap();
        assert!(rejected.rejected);
        assert!(rejected.rejected_at.is_some());
        assert_eq!(db.participant_points(&user, &challenge).unwrap(), 0);
    }

    #[test]
    fn reject_is_idempotent() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);
        db.join_challenge(&new_id(), &user, &challenge).unwrap();

        let report = db
            .create_report(&new_id(), &day_report(&user, &challenge, date("2024-01-01")))
            .unwrap();

        let first = db.reject_report(&report.id).unwrap();
        let second = db.reject_report(&report.id).unwrap();
        assert!(second.rejected);
        assert_eq!(first.rejected_at, second.rejected_at);
        // Only one reversal: the balance stays at zero, not negative.
        assert_eq!(db.participant_points(&user, &challenge).unwrap(), 0);

        // Still visible in list reads, flagged as rejected.
        let listed = db.reports_by_user(&user).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].rejected);
    }

    #[test]
    fn reject_floors_the_balance_at_zero() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);
        db.join_challenge(&new_id(), &user, &challenge).unwrap();

        let report = db
            .create_report(&new_id(), &day_report(&user, &challenge, date("2024-01-01")))
            .unwrap();

        // Drain most of the balance out of band; the reversal of 10 must
        // floor at zero instead of going negative.
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE participants SET points = 3 WHERE user_id = ?1",
                [&user],
            )?;
            Ok(())
        })
        .unwrap();

        db.reject_report(&report.id).unwrap();
        assert_eq!(db.participant_points(&user, &challenge).unwrap(), 0);
    }

    #[test]
    fn rejecting_missing_report_is_not_found() {
        let db = test_db();
        let err = db.reject_report(&new_id()).unwrap_err();
        assert!(matches!(err, DbError::NotFound("Report")));
    }

    #[test]
    fn photo_upload_guards_against_duplicates() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);
        let event = seed_event(&db, &challenge, 25, 2);

        let report = db
            .create_report(
                &new_id(),
                &NewReport {
                    user_id: &user,
                    text_content: "Park run done",
                    challenge_id: None,
                    event_id: Some(&event),
                    report_date: date("2024-01-15"),
                },
            )
            .unwrap();

        let req = db.photo_requirements(&report.id).unwrap();
        assert_eq!(req.required, 2);
        assert_eq!(req.existing, 0);

        let photos = db
            .add_report_photos(
                &report.id,
                &[
                    NewPhoto {
                        id: &new_id(),
                        photo_url: "/uploads/reports/a.jpg",
                    },
                    NewPhoto {
                        id: &new_id(),
                        photo_url: "/uploads/reports/b.jpg",
                    },
                ],
            )
            .unwrap();
        assert_eq!(photos.len(), 2);

        let req = db.photo_requirements(&report.id).unwrap();
        assert_eq!(req.existing, 2);

        let err = db
            .add_report_photos(
                &report.id,
                &[NewPhoto {
                    id: &new_id(),
                    photo_url: "/uploads/reports/c.jpg",
                }],
            )
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn photo_requirements_default_to_one_without_a_target() {
        let db = test_db();
        let user = seed_user(&db);

        let report = db
            .create_report(
                &new_id(),
                &NewReport {
                    user_id: &user,
                    text_content: "Freestanding note",
                    challenge_id: None,
                    event_id: None,
                    report_date: date("2024-01-01"),
                },
            )
            .unwrap();

        let req = db.photo_requirements(&report.id).unwrap();
        assert_eq!(req.required, 1);
    }

    #[test]
    fn hydrated_reads_cover_user_challenge_and_event_views() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);
        let event = seed_event(&db, &challenge, 25, 2);
        db.join_challenge(&new_id(), &user, &challenge).unwrap();

        let daily = db
            .create_report(&new_id(), &day_report(&user, &challenge, date("2024-01-01")))
            .unwrap();
        let for_event = db
            .create_report(
                &new_id(),
                &NewReport {
                    user_id: &user,
                    text_content: "Event attended",
                    challenge_id: None,
                    event_id: Some(&event),
                    report_date: date("2024-01-15"),
                },
            )
            .unwrap();

        db.add_report_photos(
            &daily.id,
            &[NewPhoto {
                id: &new_id(),
                photo_url: "/uploads/reports/run.jpg",
            }],
        )
        .unwrap();

        let by_user = db.reports_by_user(&user).unwrap();
        assert_eq!(by_user.len(), 2);
        assert!(by_user.iter().all(|r| r.user_handle.starts_with("tg:")));

        // The event report carries the owning challenge, so both show up in
        // the challenge view.
        let by_challenge = db.reports_by_challenge(&challenge).unwrap();
        assert_eq!(by_challenge.len(), 2);

        let by_event = db.reports_by_event(&event).unwrap();
        assert_eq!(by_event.len(), 1);
        assert_eq!(by_event[0].id, for_event.id);

        let ids: Vec<String> = by_user.iter().map(|r| r.id.clone()).collect();
        let photos = db.photos_for_reports(&ids).unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].report_id, daily.id);
    }

    #[test]
    fn deleting_a_challenge_cascades_to_all_children() {
        let db = test_db();
        let user = seed_user(&db);
        let challenge = seed_challenge(&db, 10, 1);
        let event = seed_event(&db, &challenge, 25, 2);
        db.join_challenge(&new_id(), &user, &challenge).unwrap();

        let report = db
            .create_report(
                &new_id(),
                &NewReport {
                    user_id: &user,
                    text_content: "Event attended",
                    challenge_id: None,
                    event_id: Some(&event),
                    report_date: date("2024-01-15"),
                },
            )
            .unwrap();
        db.add_report_photos(
            &report.id,
            &[
                NewPhoto {
                    id: &new_id(),
                    photo_url: "/uploads/reports/a.jpg",
                },
                NewPhoto {
                    id: &new_id(),
                    photo_url: "/uploads/reports/b.jpg",
                },
            ],
        )
        .unwrap();

        db.delete_challenge(&challenge).unwrap();

        let counts: (i64, i64, i64, i64) = db
            .with_conn(|conn| {
                let events =
                    conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
                let participants =
                    conn.query_row("SELECT COUNT(*) FROM participants", [], |r| r.get(0))?;
                let reports =
                    conn.query_row("SELECT COUNT(*) FROM reports", [], |r| r.get(0))?;
                let photos =
                    conn.query_row("SELECT COUNT(*) FROM report_photos", [], |r| r.get(0))?;
                Ok((events, participants, reports, photos))
            })
            .unwrap();
        assert_eq!(counts, (0, 0, 0, 0));

        // The user survives; only challenge-owned rows are swept.
        assert!(db.get_user(&user).unwrap().is_some());
    }
}
