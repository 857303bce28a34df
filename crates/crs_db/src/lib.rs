//! A thin wrapper around an embedded SQL store (`rusqlite`/bundled SQLite),
//! with schema-migration discipline shared by every subsystem that needs
//! one (the local repository store, the remote cache's mirror index, …).

pub mod error;
pub mod migration;

use std::path::Path;
use std::thread;
use std::time::Duration;

pub use error::{ConstraintKind, DbError};
pub use migration::{apply_migrations, Migration};
use rusqlite::Connection;

const MAX_BUSY_RETRIES: u32 = 5;
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Retries `f` while it fails with an error `is_retriable` accepts, up to a
/// small bounded number of attempts with a short fixed backoff between
/// them. This is the recovery policy for `DbError::Busy`/`Locked`: two
/// `crs` processes writing the same repository at once see one succeed and
/// the other briefly retry rather than hard-fail.
pub fn retry_on_busy<T, E>(mut is_retriable: impl FnMut(&E) -> bool, mut f: impl FnMut() -> Result<T, E>) -> Result<T, E> {
    let mut attempt = 0;
    loop {
        match f() {
            Err(err) if attempt < MAX_BUSY_RETRIES && is_retriable(&err) => {
                attempt += 1;
                thread::sleep(BUSY_RETRY_DELAY);
            }
            other => return other,
        }
    }
}

/// A handle to an embedded metadata database.
///
/// Prepared statements are cached by SQL text via `rusqlite`'s built-in
/// cached-statement API (`Connection::prepare_cached`), rather than a
/// hand-rolled cache, and are reset automatically when dropped.
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Opens (creating if absent) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DbError::OpenFailed {
            path: path.display().to_string(),
            source,
        })?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(DbError::classify)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().map_err(|source| DbError::OpenFailed {
            path: ":memory:".to_string(),
            source,
        })?;
        Ok(Self { conn })
    }

    /// Applies any pending migrations for `subsystem` (a table name like
    /// `crs_repo_meta`), transactionally. Retried on `SQLITE_BUSY`/`LOCKED`
    /// (another process applying the same migration concurrently).
    pub fn migrate(&mut self, subsystem: &str, migrations: &[Migration]) -> Result<(), DbError> {
        let conn = &mut self.conn;
        retry_on_busy(DbError::is_retriable, || apply_migrations(&mut *conn, subsystem, migrations))
    }

    /// Runs a (possibly multi-statement) DDL/DML script.
    pub fn exec_script(&self, sql: &str) -> Result<(), DbError> {
        self.conn.execute_batch(sql).map_err(DbError::classify)
    }

    /// Direct access to the underlying connection, for callers (the
    /// repository store, the resolver's package view) that need
    /// transactions or typed row access beyond this wrapper's scope.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_on_busy_retries_until_success() {
        let mut remaining_failures = 3;
        let result: Result<i32, &'static str> = retry_on_busy(
            |_err| true,
            || {
                if remaining_failures > 0 {
                    remaining_failures -= 1;
                    Err("busy")
                } else {
                    Ok(42)
                }
            },
        );
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn retry_on_busy_gives_up_after_the_bounded_attempt_count() {
        let mut calls = 0;
        let result: Result<(), &'static str> = retry_on_busy(
            |_err| true,
            || {
                calls += 1;
                Err("always busy")
            },
        );
        assert_eq!(result, Err("always busy"));
        assert_eq!(calls, MAX_BUSY_RETRIES + 1);
    }

    #[test]
    fn retry_on_busy_does_not_retry_a_non_retriable_error() {
        let mut calls = 0;
        let result: Result<(), &'static str> = retry_on_busy(
            |_err| false,
            || {
                calls += 1;
                Err("not busy")
            },
        );
        assert_eq!(result, Err("not busy"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn open_in_memory_and_exec_script() {
        let db = Db::open_in_memory().unwrap();
        db.exec_script("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (1);")
            .unwrap();
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn open_creates_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.db");
        {
            let mut db = Db::open(&path).unwrap();
            db.migrate(
                "crs_test_meta",
                &[Migration {
                    name: "init",
                    sql: "CREATE TABLE t (id INTEGER PRIMARY KEY);",
                }],
            )
            .unwrap();
        }
        assert!(path.exists());
        let db = Db::open(&path).unwrap();
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE name='t'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
