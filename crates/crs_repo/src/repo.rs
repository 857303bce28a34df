use std::fs;
use std::path::{Path, PathBuf};

use crs_db::{retry_on_busy, Db, DbError, Migration};
use crs_types::PackageInfo;
use rusqlite::params;

use crate::archive;
use crate::error::RepoError;

/// The rowid `crs_repo_self` is always stored at. A single-row "who am I"
/// table only ever has one tenant, so there is no reason to let SQLite pick
/// an autoincrement value for it.
const SELF_ROWID: i64 = 1;

const MIGRATIONS: &[Migration] = &[Migration {
    name: "initial_schema",
    sql: r#"
        CREATE TABLE crs_repo_self (
            rowid INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE crs_repo_packages (
            package_id INTEGER PRIMARY KEY,
            meta_json TEXT NOT NULL,
            name TEXT AS (json_extract(meta_json, '$.name')) VIRTUAL NOT NULL,
            version TEXT AS (json_extract(meta_json, '$.version')) VIRTUAL NOT NULL,
            pkg_version INTEGER AS (json_extract(meta_json, '$."pkg-version"')) VIRTUAL NOT NULL,
            UNIQUE(name, version, pkg_version)
        );
    "#,
}];

/// A local, on-disk repository of imported packages.
///
/// Layout rooted at `root`:
/// ```text
/// repo.db       the embedded metadata store
/// repo.db.gz    a gzip snapshot republished after every mutation
/// pkg/<name>/<version>~<revision>/pkg.tgz
/// pkg/<name>/<version>~<revision>/pkg.json
/// tmp/          staging area for in-progress imports
/// ```
///
/// Grounded on the original CRS repository format: a sentinel self-row, a
/// package table with SQLite generated columns projected out of the stored
/// manifest JSON, and a vacuumed gzip snapshot kept in sync with the DB.
pub struct Repository {
    db: Db,
    root: PathBuf,
}

impl Repository {
    /// Initializes a brand-new repository at `root`, which must not already
    /// contain one.
    pub fn create(root: impl Into<PathBuf>, name: &str) -> Result<Self, RepoError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("pkg"))?;
        fs::create_dir_all(root.join("tmp"))?;

        let mut db = Db::open(root.join("repo.db"))?;
        db.migrate("crs_repo_meta", MIGRATIONS)?;

        db.connection()
            .execute(
                "INSERT INTO crs_repo_self (rowid, name) VALUES (?1, ?2)",
                params![SELF_ROWID, name],
            )
            .map_err(|err| {
                let err = DbError::classify(err);
                if err.is_unique_violation() {
                    RepoError::AlreadyInitialized(root.display().to_string())
                } else {
                    RepoError::Db(err)
                }
            })?;

        let mut repo = Self { db, root };
        repo.vacuum_and_republish()?;
        Ok(repo)
    }

    /// Opens a repository that was previously created at `root`.
    pub fn open_existing(root: impl Into<PathBuf>) -> Result<Self, RepoError> {
        let root = root.into();
        let db_path = root.join("repo.db");
        if !db_path.is_file() {
            return Err(RepoError::NotInitialized(root.display().to_string()));
        }
        let mut db = Db::open(&db_path)?;
        db.migrate("crs_repo_meta", MIGRATIONS)?;
        Ok(Self { db, root })
    }

    pub fn name(&self) -> Result<String, RepoError> {
        self.db
            .connection()
            .query_row(
                "SELECT name FROM crs_repo_self WHERE rowid = ?1",
                params![SELF_ROWID],
                |row| row.get(0),
            )
            .map_err(|err| RepoError::Db(DbError::classify(err)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    fn subdir_of(&self, pkg: &crs_types::PackageId) -> PathBuf {
        self.root
            .join("pkg")
            .join(pkg.name.as_str())
            .join(pkg.subdir_name())
    }

    /// Imports a package whose `pkg.tgz` already exists as a single
    /// compressed file. Only the `pkg.json` member is read ahead of time;
    /// the archive is otherwise copied byte-for-byte into the repository.
    pub fn import_targz(&mut self, tgz_path: &Path) -> Result<PackageInfo, RepoError> {
        fs::create_dir_all(self.tmp_dir())?;
        let staging = tempfile::tempdir_in(self.tmp_dir())?;
        let pkg_json_path = staging.path().join("pkg.json");
        archive::extract_single_member(tgz_path, "pkg.json", &pkg_json_path)?;

        let pkg = PackageInfo::parse(&fs::read_to_string(&pkg_json_path)?)?;
        self.finish_import(pkg, tgz_path, &pkg_json_path)
    }

    /// Imports a package laid out as a loose directory (a `pkg.json` plus
    /// each library's `src`/`include` trees), synthesizing a fresh
    /// `pkg.tgz` from its contents.
    pub fn import_dir(&mut self, dir_path: &Path) -> Result<PackageInfo, RepoError> {
        let pkg = PackageInfo::parse(&fs::read_to_string(dir_path.join("pkg.json"))?)?;

        fs::create_dir_all(self.tmp_dir())?;
        let staging = tempfile::tempdir_in(self.tmp_dir())?;
        for lib in pkg.libraries() {
            let lib_root = dir_path.join(&lib.path);
            archive::copy_tree(&lib_root.join("src"), &staging.path().join(&lib.path).join("src"))?;
            archive::copy_tree(
                &lib_root.join("include"),
                &staging.path().join(&lib.path).join("include"),
            )?;
        }
        let pkg_json_path = staging.path().join("pkg.json");
        fs::write(&pkg_json_path, pkg.to_json())?;

        let tgz_path = self.tmp_dir().join(format!("{}.tgz", pkg.id().subdir_name().replace(['~', '.'], "_")));
        archive::create_targz(staging.path(), &tgz_path)?;
        let result = self.finish_import(pkg, &tgz_path, &pkg_json_path);
        let _ = fs::remove_file(&tgz_path);
        result
    }

    fn finish_import(
        &mut self,
        pkg: PackageInfo,
        tgz_source: &Path,
        pkg_json_source: &Path,
    ) -> Result<PackageInfo, RepoError> {
        let dest_dir = self.subdir_of(pkg.id());
        let db = &mut self.db;
        let attempt = retry_on_busy(
            |err: &RepoError| matches!(err, RepoError::Db(e) if e.is_retriable()),
            || -> Result<(), RepoError> {
                let tx = db.connection_mut().transaction().map_err(DbError::classify)?;
                tx.execute(
                    "INSERT INTO crs_repo_packages (meta_json) VALUES (?1)",
                    params![pkg.to_json()],
                )
                .map_err(|err| {
                    let err = DbError::classify(err);
                    if err.is_unique_violation() {
                        RepoError::PkgAlreadyPresent(pkg.id().to_string())
                    } else {
                        RepoError::Db(err)
                    }
                })?;

                fs::create_dir_all(&dest_dir)?;
                fs::copy(tgz_source, dest_dir.join("pkg.tgz"))?;
                fs::copy(pkg_json_source, dest_dir.join("pkg.json"))?;

                tx.commit().map_err(DbError::classify)?;
                Ok(())
            },
        );

        if let Err(err) = attempt {
            let _ = fs::remove_dir_all(&dest_dir);
            return Err(err);
        }

        self.vacuum_and_republish()?;
        tracing::info!(package = %pkg.id(), "imported package");
        Ok(pkg)
    }

    /// Removes a package's row and its on-disk directory.
    pub fn remove_pkg(&mut self, pkg: &crs_types::PackageId) -> Result<(), RepoError> {
        let db = &mut self.db;
        let changed = retry_on_busy(DbError::is_retriable, || {
            db.connection()
                .execute(
                    "DELETE FROM crs_repo_packages WHERE name = ?1 AND version = ?2 AND pkg_version = ?3",
                    params![pkg.name.as_str(), pkg.version.to_string(), pkg.revision],
                )
                .map_err(DbError::classify)
        })
        .map_err(RepoError::Db)?;
        if changed == 0 {
            return Err(RepoError::NoSuchPackage(pkg.to_string()));
        }
        let dir = self.subdir_of(pkg);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        self.vacuum_and_republish()?;
        Ok(())
    }

    /// Every package revision currently stored, in insertion (rowid) order.
    pub fn all_packages(&self) -> Result<Vec<PackageInfo>, RepoError> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT meta_json FROM crs_repo_packages ORDER BY package_id")
            .map_err(|e| RepoError::Db(DbError::classify(e)))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| RepoError::Db(DbError::classify(e)))?;
        let mut out = Vec::new();
        for row in rows {
            let json = row.map_err(|e| RepoError::Db(DbError::classify(e)))?;
            out.push(PackageInfo::parse(&json)?);
        }
        Ok(out)
    }

    /// Only the highest-revision row of each distinct `(name, version)`,
    /// ordered by that pair's first insertion (a later, higher-revision
    /// import updates the value in place but does not move its position).
    pub fn all_latest_rev_packages(&self) -> Result<Vec<PackageInfo>, RepoError> {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut by_name_version: std::collections::HashMap<(String, String), PackageInfo> =
            std::collections::HashMap::new();
        for pkg in self.all_packages()? {
            let key = (pkg.id().name.as_str().to_string(), pkg.id().version.to_string());
            match by_name_version.get(&key) {
                Some(existing) if existing.id().revision >= pkg.id().revision => {}
                None => {
                    order.push(key.clone());
                    by_name_version.insert(key, pkg);
                }
                Some(_) => {
                    by_name_version.insert(key, pkg);
                }
            }
        }
        Ok(order
            .into_iter()
            .map(|key| by_name_version.remove(&key).expect("key was just inserted under this key"))
            .collect())
    }

    /// Vacuums the live database and republishes `repo.db.gz`, a
    /// gzip-compressed snapshot consumers can fetch without holding a lock
    /// on the live file.
    fn vacuum_and_republish(&mut self) -> Result<(), RepoError> {
        self.db.exec_script("VACUUM;")?;
        let db_path = self.root.join("repo.db");
        let snapshot_path = self.root.join("repo.db.gz");
        let mut input = fs::File::open(&db_path)?;
        let output = fs::File::create(&snapshot_path)?;
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        std::io::copy(&mut input, &mut encoder)?;
        encoder.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pkg_json(name: &str, version: &str) -> String {
        format!(
            r#"{{"name":"{name}","version":"{version}","pkg-version":1,"namespace":"ns","libraries":[{{"name":"{name}","path":".","dependencies":[]}}],"depends":[]}}"#
        )
    }

    fn write_loose_package(dir: &Path, name: &str, version: &str) {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src").join("lib.cpp"), "// empty").unwrap();
        fs::write(dir.join("pkg.json"), sample_pkg_json(name, version)).unwrap();
    }

    #[test]
    fn create_then_open_existing_round_trips_name() {
        let root = tempfile::tempdir().unwrap();
        {
            let repo = Repository::create(root.path(), "my-repo").unwrap();
            assert_eq!(repo.name().unwrap(), "my-repo");
        }
        let repo = Repository::open_existing(root.path()).unwrap();
        assert_eq!(repo.name().unwrap(), "my-repo");
        assert!(root.path().join("repo.db.gz").is_file());
    }

    #[test]
    fn create_twice_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        Repository::create(root.path(), "r").unwrap();
        let err = Repository::create(root.path(), "r").unwrap_err();
        assert!(matches!(err, RepoError::AlreadyInitialized(_)));
    }

    #[test]
    fn import_dir_then_list_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let mut repo = Repository::create(root.path(), "r").unwrap();

        let src = tempfile::tempdir().unwrap();
        write_loose_package(src.path(), "foo", "1.0.0");
        let imported = repo.import_dir(src.path()).unwrap();
        assert_eq!(imported.id().name.as_str(), "foo");

        let all = repo.all_packages().unwrap();
        assert_eq!(all.len(), 1);
        assert!(root
            .path()
            .join("pkg")
            .join("foo")
            .join("1.0.0~1")
            .join("pkg.tgz")
            .is_file());

        repo.remove_pkg(imported.id()).unwrap();
        assert!(repo.all_packages().unwrap().is_empty());
        assert!(!root.path().join("pkg").join("foo").join("1.0.0~1").is_dir());
    }

    #[test]
    fn importing_the_same_package_twice_fails_without_orphaned_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut repo = Repository::create(root.path(), "r").unwrap();

        let src = tempfile::tempdir().unwrap();
        write_loose_package(src.path(), "foo", "1.0.0");
        repo.import_dir(src.path()).unwrap();

        let err = repo.import_dir(src.path()).unwrap_err();
        assert!(matches!(err, RepoError::PkgAlreadyPresent(_)));
        assert_eq!(repo.all_packages().unwrap().len(), 1);
    }

    #[test]
    fn all_packages_is_ordered_by_insertion_not_by_name() {
        let root = tempfile::tempdir().unwrap();
        let mut repo = Repository::create(root.path(), "r").unwrap();

        let src = tempfile::tempdir().unwrap();
        write_loose_package(src.path(), "zeta", "1.0.0");
        repo.import_dir(src.path()).unwrap();
        write_loose_package(src.path(), "alpha", "1.0.0");
        repo.import_dir(src.path()).unwrap();

        let names: Vec<&str> = repo.all_packages().unwrap().iter().map(|p| p.id().name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn all_latest_rev_packages_keeps_only_the_highest_revision_per_version() {
        let root = tempfile::tempdir().unwrap();
        let mut repo = Repository::create(root.path(), "r").unwrap();

        let src = tempfile::tempdir().unwrap();
        write_loose_package(src.path(), "foo", "1.0.0");
        repo.import_dir(src.path()).unwrap();

        // Re-import under a bumped pkg-version (revision 2) of the same
        // (name, version) pair.
        fs::write(src.path().join("pkg.json"), {
            let mut json = sample_pkg_json("foo", "1.0.0");
            json = json.replacen("\"pkg-version\":1", "\"pkg-version\":2", 1);
            json
        })
        .unwrap();
        repo.import_dir(src.path()).unwrap();

        let all = repo.all_packages().unwrap();
        assert_eq!(all.len(), 2);
        let latest = repo.all_latest_rev_packages().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id().revision, 2);
    }

    #[test]
    fn all_latest_rev_packages_keeps_the_first_insertion_position_on_a_later_bump() {
        let root = tempfile::tempdir().unwrap();
        let mut repo = Repository::create(root.path(), "r").unwrap();

        let src = tempfile::tempdir().unwrap();
        write_loose_package(src.path(), "zeta", "1.0.0");
        repo.import_dir(src.path()).unwrap();
        write_loose_package(src.path(), "alpha", "1.0.0");
        repo.import_dir(src.path()).unwrap();
        // Bump zeta's revision after alpha was already inserted; zeta should
        // still come first.
        fs::write(src.path().join("pkg.json"), {
            let mut json = sample_pkg_json("zeta", "1.0.0");
            json = json.replacen("\"pkg-version\":1", "\"pkg-version\":2", 1);
            json
        })
        .unwrap();
        repo.import_dir(src.path()).unwrap();

        let names: Vec<&str> = repo
            .all_latest_rev_packages()
            .unwrap()
            .iter()
            .map(|p| p.id().name.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn three_revisions_of_one_package_come_back_in_insertion_order() {
        let root = tempfile::tempdir().unwrap();
        let mut repo = Repository::create(root.path(), "r").unwrap();

        let src = tempfile::tempdir().unwrap();
        write_loose_package(src.path(), "test-pkg", "1.2.43");
        repo.import_dir(src.path()).unwrap();
        write_loose_package(src.path(), "test-pkg", "1.3.0");
        repo.import_dir(src.path()).unwrap();
        fs::write(src.path().join("pkg.json"), {
            let mut json = sample_pkg_json("test-pkg", "1.3.0");
            json = json.replacen("\"pkg-version\":1", "\"pkg-version\":2", 1);
            json
        })
        .unwrap();
        repo.import_dir(src.path()).unwrap();

        let all = repo.all_packages().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id().version.to_string(), "1.2.43");
        assert_eq!(all[0].id().revision, 1);
        assert_eq!(all[1].id().version.to_string(), "1.3.0");
        assert_eq!(all[1].id().revision, 1);
        assert_eq!(all[2].id().version.to_string(), "1.3.0");
        assert_eq!(all[2].id().revision, 2);
    }

    #[test]
    fn import_targz_round_trips_through_create_targz() {
        let root = tempfile::tempdir().unwrap();
        let mut repo = Repository::create(root.path(), "r").unwrap();

        let staging = tempfile::tempdir().unwrap();
        write_loose_package(staging.path(), "bar", "2.1.0");
        let tgz_path = root.path().join("bar.tgz");
        archive::create_targz(staging.path(), &tgz_path).unwrap();

        let imported = repo.import_targz(&tgz_path).unwrap();
        assert_eq!(imported.id().name.as_str(), "bar");
        assert_eq!(repo.all_packages().unwrap().len(), 1);
    }
}
