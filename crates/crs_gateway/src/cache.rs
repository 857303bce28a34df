use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crs_db::{Db, DbError, Migration};
use crs_types::{PackageId, PackageInfo};
use futures::stream::{FuturesUnordered, StreamExt};
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::error::GatewayError;

const MIGRATIONS: &[Migration] = &[Migration {
    name: "initial_schema",
    sql: r#"
        CREATE TABLE crs_cache_remotes (
            url TEXT PRIMARY KEY,
            local_dir TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 0,
            enabled_rank INTEGER
        );
    "#,
}];

/// The environment variable consulted for a cache root override.
pub const CACHE_DIR_ENV: &str = "CRS_CACHE_DIR";

/// The default cache root: `$CRS_CACHE_DIR`, or a platform cache directory
/// (`dirs::cache_dir()/crs`) if unset.
pub fn default_cache_root() -> PathBuf {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("crs")
}

fn remote_slug(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..16])
}

/// Parses and canonicalises a remote url, trimming any trailing slash so
/// `"https://a.test"` and `"https://a.test/"` are the same remote. Rejects
/// anything `url::Url` itself would reject (missing scheme, bad host, ...).
fn normalize_remote_url(url: &str) -> Result<String, GatewayError> {
    let parsed = url::Url::parse(url).map_err(|source| GatewayError::InvalidUrl(url.to_string(), source))?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

struct RemoteRow {
    url: String,
    local_dir: String,
}

/// A local mirror of zero or more remote package repositories.
///
/// Each remote's `repo.db.gz` is fetched and decompressed into its own
/// subdirectory of the cache root, reusing the `crs_repo_packages` table
/// shape a [`crs_repo::Repository`] publishes — the gateway only ever reads
/// that table, never writes it, so no schema is duplicated between the two
/// crates.
pub struct RemoteCache {
    db: Db,
    root: PathBuf,
    client: reqwest::Client,
}

impl RemoteCache {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, GatewayError> {
        let root = root.into();
        fs::create_dir_all(root.join("remotes"))?;
        fs::create_dir_all(root.join("pkg"))?;
        let mut db = Db::open(root.join("cache.db"))?;
        db.migrate("crs_cache_meta", MIGRATIONS)?;
        Ok(Self {
            db,
            root,
            client: reqwest::Client::new(),
        })
    }

    pub fn open_default() -> Result<Self, GatewayError> {
        Self::open(default_cache_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_remote_row(&self, url: &str) -> Result<String, GatewayError> {
        let url = &normalize_remote_url(url)?;
        let local_dir = format!("remotes/{}", remote_slug(url));
        self.db
            .connection()
            .execute(
                "INSERT INTO crs_cache_remotes (url, local_dir, enabled, enabled_rank)
                 VALUES (?1, ?2, 0, NULL)
                 ON CONFLICT(url) DO NOTHING",
                params![url, local_dir],
            )
            .map_err(|e| GatewayError::Db(DbError::classify(e)))?;
        self.db
            .connection()
            .query_row(
                "SELECT local_dir FROM crs_cache_remotes WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .map_err(|e| GatewayError::Db(DbError::classify(e)))
    }

    /// Fetches `{url}/repo.db.gz`, decompresses it, and overwrites this
    /// remote's local mirror. Idempotent: re-syncing an unchanged remote
    /// reproduces the same bytes on disk.
    pub async fn sync_remote(&self, url: &str) -> Result<(), GatewayError> {
        let url = normalize_remote_url(url)?;
        let local_dir = self.ensure_remote_row(&url)?;
        let snapshot_url = format!("{url}/repo.db.gz");
        let response = self
            .client
            .get(&snapshot_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| GatewayError::FetchFailed {
                url: snapshot_url.clone(),
                source,
            })?;
        let compressed = response
            .bytes()
            .await
            .map_err(|source| GatewayError::FetchFailed {
                url: snapshot_url,
                source,
            })?;

        let dest_dir = self.root.join(&local_dir);
        fs::create_dir_all(&dest_dir)?;
        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut out = fs::File::create(dest_dir.join("repo.db"))?;
        std::io::copy(&mut decoder, &mut out)?;

        tracing::info!(url = %url, "synced remote");
        Ok(())
    }

    /// Syncs every url in `urls` concurrently, returning each result keyed
    /// by its url. Mirrors `rattler_repodata_gateway`'s pattern of driving
    /// independent remote fetches off a single `FuturesUnordered`.
    pub async fn sync_all<I, S>(&self, urls: I) -> Vec<(String, Result<(), GatewayError>)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pending: FuturesUnordered<_> = urls
            .into_iter()
            .map(|url| {
                let url = url.as_ref().to_string();
                async move {
                    let result = self.sync_remote(&url).await;
                    (url, result)
                }
            })
            .collect();

        let mut out = Vec::new();
        while let Some(result) = pending.next().await {
            out.push(result);
        }
        out
    }

    /// Marks `url` eligible for resolution queries. Idempotent: a remote's
    /// enabled-rank, once assigned, never changes, which is what makes
    /// "earliest-enabled remote wins" a stable tie-break.
    pub fn enable_remote(&self, url: &str) -> Result<(), GatewayError> {
        let url = &normalize_remote_url(url)?;
        self.ensure_remote_row(url)?;
        let next_rank: i64 = self
            .db
            .connection()
            .query_row(
                "SELECT COALESCE(MAX(enabled_rank), 0) + 1 FROM crs_cache_remotes",
                [],
                |row| row.get(0),
            )
            .map_err(|e| GatewayError::Db(DbError::classify(e)))?;
        self.db
            .connection()
            .execute(
                "UPDATE crs_cache_remotes SET enabled = 1, enabled_rank = COALESCE(enabled_rank, ?1) WHERE url = ?2",
                params![next_rank, url],
            )
            .map_err(|e| GatewayError::Db(DbError::classify(e)))?;
        Ok(())
    }

    fn enabled_remotes(&self) -> Result<Vec<RemoteRow>, GatewayError> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT url, local_dir FROM crs_cache_remotes WHERE enabled = 1 ORDER BY enabled_rank ASC")
            .map_err(|e| GatewayError::Db(DbError::classify(e)))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RemoteRow {
                    url: row.get(0)?,
                    local_dir: row.get(1)?,
                })
            })
            .map_err(|e| GatewayError::Db(DbError::classify(e)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| GatewayError::Db(DbError::classify(e)))?);
        }
        Ok(out)
    }

    fn open_mirror(&self, remote: &RemoteRow) -> Option<rusqlite::Connection> {
        let db_path = self.root.join(&remote.local_dir).join("repo.db");
        rusqlite::Connection::open(db_path).ok()
    }

    /// The union of every enabled remote's packages, deduplicated by
    /// `PackageId` (earliest-enabled remote wins on conflict).
    pub fn all_enabled_packages(&self) -> Result<Vec<PackageInfo>, GatewayError> {
        let mut merged: BTreeMap<PackageId, PackageInfo> = BTreeMap::new();
        for remote in self.enabled_remotes()? {
            let Some(conn) = self.open_mirror(&remote) else {
                continue;
            };
            let mut stmt = match conn.prepare("SELECT meta_json FROM crs_repo_packages") {
                Ok(stmt) => stmt,
                Err(_) => continue,
            };
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| GatewayError::Db(DbError::classify(e)))?;
            for row in rows {
                let json = row.map_err(|e| GatewayError::Db(DbError::classify(e)))?;
                let pkg = PackageInfo::parse(&json)?;
                merged.entry(pkg.id().clone()).or_insert(pkg);
            }
        }
        Ok(merged.into_values().collect())
    }

    fn local_archive_path(&self, id: &PackageId) -> PathBuf {
        self.root.join("pkg").join(id.name.as_str()).join(id.subdir_name()).join("pkg.tgz")
    }

    /// Ensures `id`'s archive is materialised in the cache's package store,
    /// fetching it from the owning remote if necessary. A no-op if already
    /// present.
    pub async fn prefetch(&self, id: &PackageId) -> Result<PathBuf, GatewayError> {
        let dest = self.local_archive_path(id);
        if dest.is_file() {
            return Ok(dest);
        }

        let mut owner = None;
        'remotes: for remote in self.enabled_remotes()? {
            let Some(conn) = self.open_mirror(&remote) else {
                continue;
            };
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM crs_repo_packages WHERE name = ?1 AND version = ?2 AND pkg_version = ?3",
                    params![id.name.as_str(), id.version.to_string(), id.revision],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| GatewayError::Db(DbError::classify(e)))?;
            if found.is_some() {
                owner = Some(remote.url);
                break 'remotes;
            }
        }
        let Some(url) = owner else {
            return Err(GatewayError::NoSuchPackage(id.to_string()));
        };

        let archive_url = format!(
            "{}/pkg/{}/{}/pkg.tgz",
            url.trim_end_matches('/'),
            id.name.as_str(),
            id.subdir_name()
        );
        let response = self
            .client
            .get(&archive_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| GatewayError::FetchFailed {
                url: archive_url.clone(),
                source,
            })?;
        let bytes = response.bytes().await.map_err(|source| GatewayError::FetchFailed {
            url: archive_url,
            source,
        })?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &bytes)?;
        tracing::info!(package = %id, "prefetched package");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_mirror(cache: &RemoteCache, url: &str, packages: &[(&str, &str, u64)]) {
        let local_dir = cache.ensure_remote_row(url).unwrap();
        let dir = cache.root.join(local_dir);
        fs::create_dir_all(&dir).unwrap();
        let conn = rusqlite::Connection::open(dir.join("repo.db")).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE crs_repo_packages (
                package_id INTEGER PRIMARY KEY,
                meta_json TEXT NOT NULL,
                name TEXT AS (json_extract(meta_json, '$.name')) VIRTUAL NOT NULL,
                version TEXT AS (json_extract(meta_json, '$.version')) VIRTUAL NOT NULL,
                pkg_version INTEGER AS (json_extract(meta_json, '$."pkg-version"')) VIRTUAL NOT NULL,
                UNIQUE(name, version, pkg_version)
            );
            "#,
        )
        .unwrap();
        for (name, version, rev) in packages {
            let json = format!(
                r#"{{"name":"{name}","version":"{version}","pkg-version":{rev},"namespace":"ns","libraries":[{{"name":"{name}","path":".","dependencies":[]}}],"depends":[]}}"#
            );
            conn.execute("INSERT INTO crs_repo_packages (meta_json) VALUES (?1)", [json])
                .unwrap();
        }
    }

    #[test]
    fn remote_slug_is_stable_and_url_dependent() {
        let a = remote_slug("https://example.test/a");
        let b = remote_slug("https://example.test/a");
        let c = remote_slug("https://example.test/b");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn enabling_twice_keeps_the_first_assigned_rank() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RemoteCache::open(dir.path()).unwrap();
        cache.enable_remote("https://a.test").unwrap();
        cache.enable_remote("https://b.test").unwrap();
        cache.enable_remote("https://a.test").unwrap();

        let ranked: Vec<(String, i64)> = cache
            .enabled_remotes()
            .unwrap()
            .into_iter()
            .map(|r| {
                let rank: i64 = cache
                    .db
                    .connection()
                    .query_row(
                        "SELECT enabled_rank FROM crs_cache_remotes WHERE url = ?1",
                        params![r.url],
                        |row| row.get(0),
                    )
                    .unwrap();
                (r.url, rank)
            })
            .collect();
        assert_eq!(
            ranked,
            vec![("https://a.test".to_string(), 1), ("https://b.test".to_string(), 2)]
        );
    }

    #[test]
    fn all_enabled_packages_dedups_by_earliest_enabled_remote() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RemoteCache::open(dir.path()).unwrap();
        cache.enable_remote("https://a.test").unwrap();
        cache.enable_remote("https://b.test").unwrap();

        seed_mirror(&cache, "https://a.test", &[("foo", "1.0.0", 1)]);
        seed_mirror(&cache, "https://b.test", &[("foo", "1.0.0", 1), ("bar", "2.0.0", 1)]);

        let all = cache.all_enabled_packages().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|p| p.id().name.as_str() == "foo"));
        assert!(all.iter().any(|p| p.id().name.as_str() == "bar"));
    }

    #[test]
    fn unenabled_remote_is_excluded_from_the_merged_view() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RemoteCache::open(dir.path()).unwrap();
        // Registered (via sync) but never enabled.
        seed_mirror(&cache, "https://never-enabled.test", &[("foo", "1.0.0", 1)]);

        assert!(cache.all_enabled_packages().unwrap().is_empty());
    }

    #[test]
    fn sync_remote_rejects_an_unparseable_url() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RemoteCache::open(dir.path()).unwrap();
        let err = futures::executor::block_on(cache.sync_remote("not a url")).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidUrl(..)));
    }

    #[test]
    fn trailing_slash_and_bare_url_enable_to_the_same_remote() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RemoteCache::open(dir.path()).unwrap();
        cache.enable_remote("https://a.test").unwrap();
        cache.enable_remote("https://a.test/").unwrap();
        assert_eq!(cache.enabled_remotes().unwrap().len(), 1);
    }

    #[test]
    fn default_cache_root_honors_the_env_override() {
        std::env::set_var(CACHE_DIR_ENV, "/tmp/crs-test-cache-root");
        assert_eq!(default_cache_root(), PathBuf::from("/tmp/crs-test-cache-root"));
        std::env::remove_var(CACHE_DIR_ENV);
    }
}
