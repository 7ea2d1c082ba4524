use crate::error::DbError;
use crate::models::{
    ChallengePatch, ChallengeRow, EventPatch, EventRow, LeaderboardRow, NewChallenge, NewEvent,
    ParticipantRow, UserRow,
};
use crate::{Database, now_str};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        handle: &str,
        display_name: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<UserRow, DbError> {
        let row = UserRow {
            id: id.to_string(),
            handle: handle.to_string(),
            display_name: display_name.map(str::to_string),
            phone_number: phone_number.map(str::to_string),
            created_at: now_str(),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, handle, display_name, phone_number, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id,
                    row.handle,
                    row.display_name,
                    row.phone_number,
                    row.created_at
                ],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>, DbError> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRow>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, handle, display_name, phone_number, created_at
                 FROM users WHERE handle = ?1",
            )?;
            let row = stmt.query_row([handle], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn update_user(
        &self,
        id: &str,
        display_name: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<UserRow, DbError> {
        self.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut vals: Vec<Value> = Vec::new();
            if let Some(name) = display_name {
                sets.push("display_name = ?");
                vals.push(Value::from(name.to_string()));
            }
            if let Some(phone) = phone_number {
                sets.push("phone_number = ?");
                vals.push(Value::from(phone.to_string()));
            }
            if !sets.is_empty() {
                vals.push(Value::from(id.to_string()));
                let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
                let updated = conn.execute(&sql, params_from_iter(vals))?;
                if updated == 0 {
                    return Err(DbError::NotFound("User"));
                }
            }
            query_user(conn, id)?.ok_or(DbError::NotFound("User"))
        })
    }

    // -- Challenges --

    pub fn create_challenge(&self, id: &str, new: &NewChallenge) -> Result<ChallengeRow, DbError> {
        let row = ChallengeRow {
            id: id.to_string(),
            title: new.title.to_string(),
            description: new.description.to_string(),
            start_date: new.start_date.to_string(),
            end_date: new.end_date.to_string(),
            requires_phone: new.requires_phone,
            points_per_report: new.points_per_report,
            required_photos: new.required_photos,
            created_at: now_str(),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO challenges
                     (id, title, description, start_date, end_date, requires_phone,
                      points_per_report, required_photos, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    row.id,
                    row.title,
                    row.description,
                    row.start_date,
                    row.end_date,
                    row.requires_phone,
                    row.points_per_report,
                    row.required_photos,
                    row.created_at
                ],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    pub fn get_challenge(&self, id: &str) -> Result<Option<ChallengeRow>, DbError> {
        self.with_conn(|conn| query_challenge(conn, id))
    }

    pub fn list_challenges(&self) -> Result<Vec<ChallengeRow>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, start_date, end_date, requires_phone,
                        points_per_report, required_photos, created_at
                 FROM challenges ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([], map_challenge)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_challenge(
        &self,
        id: &str,
        patch: &ChallengePatch,
    ) -> Result<ChallengeRow, DbError> {
        self.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut vals: Vec<Value> = Vec::new();
            if let Some(title) = patch.title {
                sets.push("title = ?");
                vals.push(Value::from(title.to_string()));
            }
            if let Some(description) = patch.description {
                sets.push("description = ?");
                vals.push(Value::from(description.to_string()));
            }
            if let Some(start_date) = patch.start_date {
                sets.push("start_date = ?");
                vals.push(Value::from(start_date.to_string()));
            }
            if let Some(end_date) = patch.end_date {
                sets.push("end_date = ?");
                vals.push(Value::from(end_date.to_string()));
            }
            if let Some(requires_phone) = patch.requires_phone {
                sets.push("requires_phone = ?");
                vals.push(Value::from(requires_phone));
            }
            if let Some(points) = patch.points_per_report {
                sets.push("points_per_report = ?");
                vals.push(Value::from(points));
            }
            if let Some(photos) = patch.required_photos {
                sets.push("required_photos = ?");
                vals.push(Value::from(photos as i64));
            }
            if !sets.is_empty() {
                vals.push(Value::from(id.to_string()));
                let sql = format!("UPDATE challenges SET {} WHERE id = ?", sets.join(", "));
                let updated = conn.execute(&sql, params_from_iter(vals))?;
                if updated == 0 {
                    return Err(DbError::NotFound("Challenge"));
                }
            }
            query_challenge(conn, id)?.ok_or(DbError::NotFound("Challenge"))
        })
    }

    /// Cascades to events, participants, reports and report photos.
    pub fn delete_challenge(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM challenges WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(DbError::NotFound("Challenge"));
            }
            Ok(())
        })
    }

    // -- Events --

    pub fn create_event(&self, id: &str, new: &NewEvent) -> Result<EventRow, DbError> {
        let row = EventRow {
            id: id.to_string(),
            challenge_id: new.challenge_id.to_string(),
            title: new.title.to_string(),
            description: new.description.to_string(),
            date: new.date.to_string(),
            points_per_report: new.points_per_report,
            required_photos: new.required_photos,
            created_at: now_str(),
        };
        self.with_conn(|conn| {
            if !exists(conn, "challenges", new.challenge_id)? {
                return Err(DbError::NotFound("Challenge"));
            }
            conn.execute(
                "INSERT INTO events
                     (id, challenge_id, title, description, date,
                      points_per_report, required_photos, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.challenge_id,
                    row.title,
                    row.description,
                    row.date,
                    row.points_per_report,
                    row.required_photos,
                    row.created_at
                ],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EventRow>, DbError> {
        self.with_conn(|conn| query_event(conn, id))
    }

    pub fn events_for_challenge(&self, challenge_id: &str) -> Result<Vec<EventRow>, DbError> {
        self.with_conn(|conn| {
            if !exists(conn, "challenges", challenge_id)? {
                return Err(DbError::NotFound("Challenge"));
            }
            let mut stmt = conn.prepare(
                "SELECT id, challenge_id, title, description, date,
                        points_per_report, required_photos, created_at
                 FROM events WHERE challenge_id = ?1 ORDER BY date",
            )?;
            let rows = stmt
                .query_map([challenge_id], map_event)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_event(&self, id: &str, patch: &EventPatch) -> Result<EventRow, DbError> {
        self.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut vals: Vec<Value> = Vec::new();
            if let Some(title) = patch.title {
                sets.push("title = ?");
                vals.push(Value::from(title.to_string()));
            }
            if let Some(description) = patch.description {
                sets.push("description = ?");
                vals.push(Value::from(description.to_string()));
            }
            if let Some(date) = patch.date {
                sets.push("date = ?");
                vals.push(Value::from(date.to_string()));
            }
            if let Some(points) = patch.points_per_report {
                sets.push("points_per_report = ?");
                vals.push(Value::from(points));
            }
            if let Some(photos) = patch.required_photos {
                sets.push("required_photos = ?");
                vals.push(Value::from(photos as i64));
            }
            if !sets.is_empty() {
                vals.push(Value::from(id.to_string()));
                let sql = format!("UPDATE events SET {} WHERE id = ?", sets.join(", "));
                let updated = conn.execute(&sql, params_from_iter(vals))?;
                if updated == 0 {
                    return Err(DbError::NotFound("Event"));
                }
            }
            query_event(conn, id)?.ok_or(DbError::NotFound("Event"))
        })
    }

    pub fn delete_event(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(DbError::NotFound("Event"));
            }
            Ok(())
        })
    }

    // -- Participants --

    /// Idempotent: joining an already-joined challenge returns the existing
    /// row untouched. The UNIQUE(user_id, challenge_id) index is the backstop.
    pub fn join_challenge(
        &self,
        id: &str,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<ParticipantRow, DbError> {
        self.with_conn(|conn| {
            if !exists(conn, "users", user_id)? {
                return Err(DbError::NotFound("User"));
            }
            if !exists(conn, "challenges", challenge_id)? {
                return Err(DbError::NotFound("Challenge"));
            }
            if let Some(existing) = query_participant(conn, user_id, challenge_id)? {
                return Ok(existing);
            }
            let row = ParticipantRow {
                id: id.to_string(),
                user_id: user_id.to_string(),
                challenge_id: challenge_id.to_string(),
                points: 0,
                joined_at: now_str(),
            };
            conn.execute(
                "INSERT INTO participants (id, user_id, challenge_id, points, joined_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.id, row.user_id, row.challenge_id, row.points, row.joined_at],
            )?;
            Ok(row)
        })
    }

    pub fn is_joined(&self, user_id: &str, challenge_id: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| Ok(query_participant(conn, user_id, challenge_id)?.is_some()))
    }

    /// Balance lookup; non-participants read as zero, not as an error.
    pub fn participant_points(&self, user_id: &str, challenge_id: &str) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            Ok(query_participant(conn, user_id, challenge_id)?
                .map(|p| p.points)
                .unwrap_or(0))
        })
    }

    /// Ranking for one challenge: points descending, earlier join wins ties.
    /// The trailing id only keeps equal rows in a stable order across calls.
    pub fn leaderboard(&self, challenge_id: &str) -> Result<Vec<LeaderboardRow>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.user_id, u.display_name, p.points, p.joined_at
                 FROM participants p
                 JOIN users u ON p.user_id = u.id
                 WHERE p.challenge_id = ?1
                 ORDER BY p.points DESC, p.joined_at ASC, p.id ASC",
            )?;
            let rows = stmt
                .query_map([challenge_id], |row| {
                    Ok(LeaderboardRow {
                        user_id: row.get(0)?,
                        display_name: row
                            .get::<_, Option<String>>(1)?
                            .unwrap_or_else(|| "Anonymous".to_string()),
                        points: row.get(2)?,
                        joined_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_user(conn: &Connection, id: &str) -> Result<Option<UserRow>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, handle, display_name, phone_number, created_at
         FROM users WHERE id = ?1",
    )?;
    let row = stmt.query_row([id], map_user).optional()?;
    Ok(row)
}

pub(crate) fn query_challenge(conn: &Connection, id: &str) -> Result<Option<ChallengeRow>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, start_date, end_date, requires_phone,
                points_per_report, required_photos, created_at
         FROM challenges WHERE id = ?1",
    )?;
    let row = stmt.query_row([id], map_challenge).optional()?;
    Ok(row)
}

pub(crate) fn query_event(conn: &Connection, id: &str) -> Result<Option<EventRow>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, challenge_id, title, description, date,
                points_per_report, required_photos, created_at
         FROM events WHERE id = ?1",
    )?;
    let row = stmt.query_row([id], map_event).optional()?;
    Ok(row)
}

fn query_participant(
    conn: &Connection,
    user_id: &str,
    challenge_id: &str,
) -> Result<Option<ParticipantRow>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, challenge_id, points, joined_at
         FROM participants WHERE user_id = ?1 AND challenge_id = ?2",
    )?;
    let row = stmt
        .query_row([user_id, challenge_id], |row| {
            Ok(ParticipantRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                challenge_id: row.get(2)?,
                points: row.get(3)?,
                joined_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(row)
}

pub(crate) fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool, DbError> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table);
    let found = conn
        .query_row(&sql, [id], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        handle: row.get(1)?,
        display_name: row.get(2)?,
        phone_number: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_challenge(row: &rusqlite::Row) -> rusqlite::Result<ChallengeRow> {
    Ok(ChallengeRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        requires_phone: row.get(5)?,
        points_per_report: row.get(6)?,
        required_photos: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_event(row: &rusqlite::Row) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        challenge_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        date: row.get(4)?,
        points_per_report: row.get(5)?,
        required_photos: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::error::DbError;
    use crate::models::{ChallengePatch, NewChallenge, NewEvent};
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

    fn seed_user(db: &Database, handle: &str) -> String {
        let id = new_id();
        db.create_user(&id, handle, Some("Runner"), None).unwrap();
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

    #[test]
    fn user_roundtrip_by_handle() {
        let db = test_db();
        let id = seed_user(&db, "tg:1001");

        let by_handle = db.get_user_by_handle("tg:1001").unwrap().unwrap();
        assert_eq!(by_handle.id, id);
        assert_eq!(by_handle.display_name.as_deref(), Some("Runner"));

        assert!(db.get_user_by_handle("tg:missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_handle_is_conflict() {
        let db = test_db();
        seed_user(&db, "tg:1001");

        let err = db
            .create_user(&new_id(), "tg:1001", None, None)
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[test]
    fn update_user_touches_only_provided_fields() {
        let db = test_db();
        let id = seed_user(&db, "tg:1001");

        let updated = db.update_user(&id, None, Some("+15550001111")).unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Runner"));
        assert_eq!(updated.phone_number.as_deref(), Some("+15550001111"));

        // No fields provided: a plain no-op read.
        let unchanged = db.update_user(&id, None, None).unwrap();
        assert_eq!(unchanged.phone_number.as_deref(), Some("+15550001111"));
    }

    #[test]
    fn challenge_crud_roundtrip() {
        let db = test_db();
        let id = seed_challenge(&db, 10, 1);

        let fetched = db.get_challenge(&id).unwrap().unwrap();
        assert_eq!(fetched.title, "30 days of running");
        assert_eq!(fetched.points_per_report, 10);

        let all = db.list_challenges().unwrap();
        assert_eq!(all.len(), 1);

        let patched = db
            .update_challenge(
                &id,
                &ChallengePatch {
                    points_per_report: Some(15),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.points_per_report, 15);
        assert_eq!(patched.title, "30 days of running");

        db.delete_challenge(&id).unwrap();
        assert!(db.get_challenge(&id).unwrap().is_none());
    }

    #[test]
    fn update_missing_challenge_is_not_found() {
        let db = test_db();
        let err = db
            .update_challenge(
                &new_id(),
                &ChallengePatch {
                    title: Some("renamed"),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound("Challenge")));
    }

    #[test]
    fn event_requires_existing_challenge() {
        let db = test_db();
        let challenge_id = seed_challenge(&db, 10, 1);

        let event = db
            .create_event(
                &new_id(),
                &NewEvent {
                    challenge_id: &challenge_id,
                    title: "Park run",
                    description: "Group run in the park",
                    date: date("2024-01-15"),
                    points_per_report: 25,
                    required_photos: 2,
                },
            )
            .unwrap();

        let listed = db.events_for_challenge(&challenge_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, event.id);

        let err = db
            .create_event(
                &new_id(),
                &NewEvent {
                    challenge_id: &new_id(),
                    title: "Orphan",
                    description: "No such challenge",
                    date: date("2024-01-16"),
                    points_per_report: 5,
                    required_photos: 1,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound("Challenge")));
    }

    #[test]
    fn join_is_idempotent() {
        let db = test_db();
        let user_id = seed_user(&db, "tg:1001");
        let challenge_id = seed_challenge(&db, 10, 1);

        let first = db.join_challenge(&new_id(), &user_id, &challenge_id).unwrap();
        let second = db.join_challenge(&new_id(), &user_id, &challenge_id).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.points, 0);

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM participants", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
        assert!(db.is_joined(&user_id, &challenge_id).unwrap());
    }

    #[test]
    fn points_default_to_zero_for_non_participants() {
        let db = test_db();
        let user_id = seed_user(&db, "tg:1001");
        let challenge_id = seed_challenge(&db, 10, 1);

        assert_eq!(db.participant_points(&user_id, &challenge_id).unwrap(), 0);
        assert!(!db.is_joined(&user_id, &challenge_id).unwrap());
    }

    #[test]
    fn leaderboard_ranks_points_then_join_time() {
        let db = test_db();
        let challenge_id = seed_challenge(&db, 10, 1);
        let a = seed_user(&db, "tg:a");
        let b = seed_user(&db, "tg:b");
        let c = seed_user(&db, "tg:c");

        for user in [&a, &b, &c] {
            db.join_challenge(&new_id(), user, &challenge_id).unwrap();
        }

        // A and B tie on points; B joined earlier and must rank first.
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE participants SET points = 5, joined_at = '2024-01-02T09:00:00.000000Z'
                 WHERE user_id = ?1",
                [&a],
            )?;
            conn.execute(
                "UPDATE participants SET points = 5, joined_at = '2024-01-01T09:00:00.000000Z'
                 WHERE user_id = ?1",
                [&b],
            )?;
            conn.execute(
                "UPDATE participants SET points = 8 WHERE user_id = ?1",
                [&c],
            )?;
            Ok(())
        })
        .unwrap();

        let board = db.leaderboard(&challenge_id).unwrap();
        let order: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec![c.as_str(), b.as_str(), a.as_str()]);
    }

    #[test]
    fn leaderboard_defaults_missing_display_name() {
        let db = test_db();
        let challenge_id = seed_challenge(&db, 10, 1);
        let user_id = new_id();
        db.create_user(&user_id, "tg:anon", None, None).unwrap();
        db.join_challenge(&new_id(), &user_id, &challenge_id).unwrap();

        let board = db.leaderboard(&challenge_id).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].display_name, "Anonymous");
    }
}
