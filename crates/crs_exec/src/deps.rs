//! Per-output dependency fingerprints, persisted so a later build can tell
//! whether a compile is still up to date.

use std::path::{Path, PathBuf};

use crs_db::{Db, Migration};
use rusqlite::OptionalExtension;

use crate::error::BuildError;

const MIGRATIONS: &[Migration] = &[Migration {
    name: "initial_schema",
    sql: "CREATE TABLE crs_exec_deps (
            output TEXT PRIMARY KEY,
            command TEXT NOT NULL,
            inputs TEXT NOT NULL,
            command_output TEXT NOT NULL
        );",
}];

/// The recorded command and header dependencies for one compiled output, as
/// of its last successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsRecord {
    pub output: PathBuf,
    pub command: String,
    pub inputs: Vec<PathBuf>,
    pub command_output: String,
}

/// Renders an argv as a single shell-quoted string, for stable storage and
/// comparison against a freshly generated command.
pub fn quote_command(argv: &[String]) -> String {
    shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
}

/// Persistent store of [`DepsRecord`]s, keyed by output path.
pub struct DepsStore {
    db: Db,
}

impl DepsStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BuildError> {
        let mut db = Db::open(path)?;
        db.migrate("crs_exec_meta", MIGRATIONS)?;
        Ok(Self { db })
    }

    pub fn open_in_memory() -> Result<Self, BuildError> {
        let mut db = Db::open_in_memory()?;
        db.migrate("crs_exec_meta", MIGRATIONS)?;
        Ok(Self { db })
    }

    pub fn get(&self, output: &Path) -> Result<Option<DepsRecord>, BuildError> {
        let output_str = output.to_string_lossy().into_owned();
        let row = self
            .db
            .connection()
            .query_row(
                "SELECT command, inputs, command_output FROM crs_exec_deps WHERE output = ?1",
                [&output_str],
                |row| {
                    let command: String = row.get(0)?;
                    let inputs: String = row.get(1)?;
                    let command_output: String = row.get(2)?;
                    Ok((command, inputs, command_output))
                },
            )
            .optional()
            .map_err(crs_db::DbError::classify)?;

        Ok(row.map(|(command, inputs, command_output)| DepsRecord {
            output: output.to_path_buf(),
            command,
            inputs: inputs.lines().map(PathBuf::from).collect(),
            command_output,
        }))
    }

    /// Persists `record` under its own short transaction, replacing any
    /// prior record for the same output.
    pub fn put(&mut self, record: &DepsRecord) -> Result<(), BuildError> {
        let inputs_text = record
            .inputs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("\n");

        let tx = self
            .db
            .connection_mut()
            .transaction()
            .map_err(crs_db::DbError::classify)?;
        tx.execute(
            "INSERT INTO crs_exec_deps (output, command, inputs, command_output)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(output) DO UPDATE SET
                command = excluded.command,
                inputs = excluded.inputs,
                command_output = excluded.command_output",
            rusqlite::params![
                record.output.to_string_lossy().into_owned(),
                record.command,
                inputs_text,
                record.command_output,
            ],
        )
        .map_err(crs_db::DbError::classify)?;
        tx.commit().map_err(crs_db::DbError::classify)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_record() {
        let mut store = DepsStore::open_in_memory().unwrap();
        assert!(store.get(Path::new("obj/a.o")).unwrap().is_none());

        let record = DepsRecord {
            output: PathBuf::from("obj/a.o"),
            command: "c++ -c a.cpp -o obj/a.o".to_string(),
            inputs: vec![PathBuf::from("a.cpp"), PathBuf::from("a.h")],
            command_output: String::new(),
        };
        store.put(&record).unwrap();

        let fetched = store.get(Path::new("obj/a.o")).unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn put_overwrites_the_prior_record_for_the_same_output() {
        let mut store = DepsStore::open_in_memory().unwrap();
        store
            .put(&DepsRecord {
                output: PathBuf::from("obj/a.o"),
                command: "old".to_string(),
                inputs: vec![],
                command_output: String::new(),
            })
            .unwrap();
        store
            .put(&DepsRecord {
                output: PathBuf::from("obj/a.o"),
                command: "new".to_string(),
                inputs: vec![PathBuf::from("a.cpp")],
                command_output: "warn".to_string(),
            })
            .unwrap();
        let fetched = store.get(Path::new("obj/a.o")).unwrap().unwrap();
        assert_eq!(fetched.command, "new");
        assert_eq!(fetched.inputs, vec![PathBuf::from("a.cpp")]);
    }

    #[test]
    fn quote_command_round_trips_through_shlex() {
        let argv = vec!["c++".to_string(), "-I".to_string(), "a path/with space".to_string()];
        let quoted = quote_command(&argv);
        assert_eq!(shlex::split(&quoted).unwrap(), argv);
    }
}
