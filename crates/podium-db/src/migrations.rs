use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id            TEXT PRIMARY KEY,
                handle        TEXT NOT NULL UNIQUE,
                display_name  TEXT,
                phone_number  TEXT,
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE challenges (
                id                TEXT PRIMARY KEY,
                title             TEXT NOT NULL,
                description       TEXT NOT NULL,
                start_date        TEXT NOT NULL,
                end_date          TEXT NOT NULL,
                requires_phone    INTEGER NOT NULL DEFAULT 0,
                points_per_report INTEGER NOT NULL,
                required_photos   INTEGER NOT NULL,
                created_at        TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE events (
                id                TEXT PRIMARY KEY,
                challenge_id      TEXT NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
                title             TEXT NOT NULL,
                description       TEXT NOT NULL,
                date              TEXT NOT NULL,
                points_per_report INTEGER NOT NULL,
                required_photos   INTEGER NOT NULL,
                created_at        TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_events_challenge ON events(challenge_id);

            CREATE TABLE participants (
                id           TEXT PRIMARY KEY,
                user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                challenge_id TEXT NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
                points       INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
                joined_at    TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (user_id, challenge_id)
            );

            CREATE INDEX idx_participants_challenge ON participants(challenge_id);

            CREATE TABLE reports (
                id             TEXT PRIMARY KEY,
                user_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                challenge_id   TEXT REFERENCES challenges(id) ON DELETE CASCADE,
                event_id       TEXT REFERENCES events(id) ON DELETE CASCADE,
                text_content   TEXT NOT NULL,
                report_date    TEXT NOT NULL,
                points_awarded INTEGER NOT NULL DEFAULT 0,
                rejected       INTEGER NOT NULL DEFAULT 0,
                rejected_at    TEXT,
                created_at     TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- One non-event report per (user, challenge, day); one report per
            -- (user, event) regardless of day. Constraint violations surface
            -- as Conflict upstream.
            CREATE UNIQUE INDEX idx_reports_one_per_day
                ON reports(user_id, challenge_id, report_date) WHERE event_id IS NULL;

            CREATE UNIQUE INDEX idx_reports_one_per_event
                ON reports(user_id, event_id) WHERE event_id IS NOT NULL;

            CREATE INDEX idx_reports_user ON reports(user_id, created_at);
            CREATE INDEX idx_reports_challenge ON reports(challenge_id);
            CREATE INDEX idx_reports_event ON reports(event_id);

            CREATE TABLE report_photos (
                id         TEXT PRIMARY KEY,
                report_id  TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
                photo_url  TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_report_photos_report ON report_photos(report_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
