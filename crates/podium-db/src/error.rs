use thiserror::Error;

/// Storage-layer errors. `NotFound`, `Conflict` and `InvalidArgument`
/// carry workflow meaning and map onto distinct HTTP statuses upstream;
/// everything else is an internal failure.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("database error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

/// UNIQUE violations are the authoritative conflict signal: the in-transaction
/// pre-checks give friendlier messages, but a constraint hit must still
/// surface as `Conflict`, never as an internal error.
impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, ref msg) = e {
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                let detail = msg
                    .clone()
                    .unwrap_or_else(|| "unique constraint violated".to_string());
                return DbError::Conflict(detail);
            }
        }
        DbError::Sqlite(e)
    }
}
