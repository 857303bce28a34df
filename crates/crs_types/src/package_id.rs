use std::cmp::Ordering;
use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::name::Name;

/// The identity of a single published revision of a package: `(name,
/// version, revision)`.
///
/// Two `PackageId`s are equal iff all three components match, and they are
/// totally ordered lexicographically by `(name, version, revision)`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct PackageId {
    pub name: Name,
    pub version: Version,
    /// A monotonically increasing integer disambiguating re-publications of
    /// the same `(name, version)` pair. Always `>= 1` once the id refers to
    /// an imported package.
    pub revision: u64,
}

impl PackageId {
    pub fn new(name: Name, version: Version, revision: u64) -> Self {
        Self {
            name,
            version,
            revision,
        }
    }

    /// The `<name>/<version>~<revision>` path segment this id maps to
    /// inside a repository's `pkg/` directory.
    pub fn subdir_name(&self) -> String {
        format!("{}~{}", self.version, self.revision)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}~{}", self.name, self.version, self.revision)
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version && self.revision == other.revision
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.revision.cmp(&other.revision))
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for PackageId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.to_string().hash(state);
        self.revision.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str, ver: &str, rev: u64) -> PackageId {
        PackageId::new(Name::parse(name).unwrap(), Version::parse(ver).unwrap(), rev)
    }

    #[test]
    fn orders_by_name_then_version_then_revision() {
        let mut ids = vec![
            id("b", "1.0.0", 1),
            id("a", "2.0.0", 1),
            id("a", "1.0.0", 2),
            id("a", "1.0.0", 1),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                id("a", "1.0.0", 1),
                id("a", "1.0.0", 2),
                id("a", "2.0.0", 1),
                id("b", "1.0.0", 1),
            ]
        );
    }

    #[test]
    fn subdir_name_matches_repo_layout() {
        assert_eq!(id("foo", "1.2.43", 1).subdir_name(), "1.2.43~1");
    }
}
