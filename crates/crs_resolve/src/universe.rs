use std::collections::BTreeMap;

use crs_types::{Name, PackageInfo};

/// The resolver's view of every package the cache currently advertises,
/// grouped by name. Construction is the only place duplicate-name
/// bucketing happens; everything downstream indexes by name then picks
/// among that name's revisions.
pub struct PackageUniverse {
    by_name: BTreeMap<Name, Vec<PackageInfo>>,
}

impl PackageUniverse {
    pub fn new(packages: Vec<PackageInfo>) -> Self {
        let mut by_name: BTreeMap<Name, Vec<PackageInfo>> = BTreeMap::new();
        for pkg in packages {
            by_name.entry(pkg.id().name.clone()).or_default().push(pkg);
        }
        Self { by_name }
    }

    pub fn candidates_for(&self, name: &str) -> &[PackageInfo] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.by_name.keys()
    }
}
