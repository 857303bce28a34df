use thiserror::Error;

/// The sub-kind of a SQL constraint violation, distinguished by SQLite's
/// extended result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Other,
}

/// Errors raised by the embedded metadata store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to open database at '{path}': {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration '{name}' failed: {source}")]
    MigrationFailed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("the on-disk schema version is newer than this build supports")]
    SchemaTooNew,

    #[error("constraint violation ({kind:?}): {source}")]
    ConstraintViolation {
        kind: ConstraintKind,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database is busy or locked: {0}")]
    Busy(#[source] rusqlite::Error),

    #[error("sql error: {0}")]
    Generic(#[from] rusqlite::Error),
}

impl DbError {
    /// Classifies a raw `rusqlite::Error` into the richer taxonomy above.
    /// Non-SQL errors fall through to [`DbError::Generic`].
    pub fn classify(err: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;
        if let rusqlite::Error::SqliteFailure(sqlite_err, _) = &err {
            match sqlite_err.code {
                ErrorCode::ConstraintViolation => {
                    let kind = match sqlite_err.extended_code {
                        rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintKind::PrimaryKey,
                        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
                        rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
                        _ => ConstraintKind::Other,
                    };
                    return DbError::ConstraintViolation { kind, source: err };
                }
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    return DbError::Busy(err);
                }
                _ => {}
            }
        }
        DbError::Generic(err)
    }

    /// True for busy/locked errors, which a caller may retry.
    pub fn is_retriable(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::ConstraintViolation {
                kind: ConstraintKind::Unique,
                ..
            }
        )
    }
}
