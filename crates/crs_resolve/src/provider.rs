use std::collections::HashMap;

use crs_types::PackageInfo;
use resolvo::{Candidates, Dependencies, DependencyProvider, NameId, Pool, SolvableId, SolverCache};

use crate::deps::all_dependencies;
use crate::range::{CandidateRecord, DependencyRange};
use crate::universe::PackageUniverse;

/// Feeds `resolvo` the package view: every name's candidate revisions, and
/// each candidate's own dependencies (package-level `depends` plus every
/// library's additive `dependencies`, unioned — see `DESIGN.md` for why
/// this crate does not model per-`uses`-edge conditional requirements).
pub struct CrsDependencyProvider<'a> {
    pool: Pool<DependencyRange<'a>, String>,
    records: HashMap<NameId, Candidates>,
}

impl<'a> CrsDependencyProvider<'a> {
    pub fn new(universe: &'a PackageUniverse) -> Self {
        let pool = Pool::default();
        let mut records: HashMap<NameId, Candidates> = HashMap::default();

        for name in universe.names() {
            let name_id = pool.intern_package_name(name.as_str());
            let mut candidates = Candidates::default();
            for pkg in universe.candidates_for(name.as_str()) {
                let solvable = pool.intern_solvable(name_id, CandidateRecord(pkg));
                candidates.candidates.push(solvable);
            }
            records.insert(name_id, candidates);
        }

        Self { pool, records }
    }

    pub fn pool(&self) -> &Pool<DependencyRange<'a>, String> {
        &self.pool
    }
}

impl<'a> DependencyProvider<DependencyRange<'a>> for CrsDependencyProvider<'a> {
    fn pool(&self) -> &Pool<DependencyRange<'a>, String> {
        &self.pool
    }

    fn sort_candidates(
        &self,
        _solver: &SolverCache<DependencyRange<'a>, String, Self>,
        solvables: &mut [SolvableId],
    ) {
        // Tie-break 1: higher version wins. Tie-break 2: on equal version,
        // higher revision wins. (Tie-break 3, earliest-enabled remote, is
        // already baked into the package view: it has at most one
        // PackageInfo per distinct (name, version, revision).)
        solvables.sort_by(|&a, &b| {
            let pa = self.pool.resolve_solvable(a).inner();
            let pb = self.pool.resolve_solvable(b).inner();
            pb.cmp(pa)
        });
    }

    fn get_candidates(&self, name: NameId) -> Option<Candidates> {
        self.records.get(&name).cloned()
    }

    fn get_dependencies(&self, solvable: SolvableId) -> Dependencies {
        let pkg: &PackageInfo = self.pool.resolve_solvable(solvable).inner().0;
        let mut dependencies = Dependencies::default();
        let Ok(deps) = all_dependencies(pkg) else {
            return dependencies;
        };
        for dep in deps {
            let name_id = self.pool.intern_package_name(dep.name.as_str());
            let version_set_id = self.pool.intern_version_set(name_id, DependencyRange::new(dep.range));
            dependencies.requirements.push(version_set_id);
        }
        dependencies
    }
}
