use rusqlite::{Connection, OptionalExtension};

use crate::error::DbError;

/// A single migration step: a DDL/DML script applied once, in order,
/// identified by name for error reporting.
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Applies any migrations from `migrations` that have not yet been applied
/// to the meta-table `{subsystem}`, inside one transaction. On any SQL
/// error the transaction rolls back and the error carries the failing
/// migration's name.
///
/// Grounded on the original `apply_db_migrations`/`do_migrations_1`: a
/// single-row meta table holding an integer version, created if absent,
/// migrations applied in `[version..]`, version updated at the end.
pub fn apply_migrations(
    conn: &mut Connection,
    subsystem: &str,
    migrations: &[Migration],
) -> Result<(), DbError> {
    conn.execute_batch(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{subsystem}" (version INTEGER NOT NULL)"#
    ))
    .map_err(DbError::classify)?;

    let count: i64 = conn
        .query_row(&format!(r#"SELECT COUNT(*) FROM "{subsystem}""#), [], |r| r.get(0))
        .map_err(DbError::classify)?;
    if count == 0 {
        conn.execute(&format!(r#"INSERT INTO "{subsystem}" (version) VALUES (0)"#), [])
            .map_err(DbError::classify)?;
    }

    let version: i64 = conn
        .query_row(&format!(r#"SELECT version FROM "{subsystem}""#), [], |r| r.get(0))
        .optional()
        .map_err(DbError::classify)?
        .unwrap_or(0);

    if version as usize > migrations.len() {
        return Err(DbError::SchemaTooNew);
    }

    let tx = conn.transaction().map_err(DbError::classify)?;
    for migration in &migrations[version as usize..] {
        tx.execute_batch(migration.sql).map_err(|source| DbError::MigrationFailed {
            name: migration.name.to_string(),
            source,
        })?;
    }
    tx.execute(
        &format!(r#"UPDATE "{subsystem}" SET version = ?1"#),
        [migrations.len() as i64],
    )
    .map_err(DbError::classify)?;
    tx.commit().map_err(DbError::classify)?;

    tracing::debug!(subsystem, applied = migrations.len() - version as usize, "migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_migrations_in_order_exactly_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrations = [
            Migration {
                name: "create_t",
                sql: "CREATE TABLE t (id INTEGER PRIMARY KEY);",
            },
            Migration {
                name: "add_col",
                sql: "ALTER TABLE t ADD COLUMN name TEXT;",
            },
        ];
        apply_migrations(&mut conn, "crs_test_meta", &migrations).unwrap();
        apply_migrations(&mut conn, "crs_test_meta", &migrations).unwrap();

        conn.execute("INSERT INTO t (id, name) VALUES (1, 'ok')", [])
            .unwrap();
        let name: String = conn
            .query_row("SELECT name FROM t WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "ok");
    }

    #[test]
    fn rolls_back_on_migration_failure() {
        let mut conn = Connection::open_in_memory().unwrap();
        let migrations = [
            Migration {
                name: "create_t",
                sql: "CREATE TABLE t (id INTEGER PRIMARY KEY);",
            },
            Migration {
                name: "bad",
                sql: "THIS IS NOT SQL;",
            },
        ];
        let err = apply_migrations(&mut conn, "crs_test_meta", &migrations).unwrap_err();
        assert!(matches!(err, DbError::MigrationFailed { .. }));

        let version: i64 = conn
            .query_row("SELECT version FROM crs_test_meta", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 0, "failed migration must not bump the recorded version");
    }
}
