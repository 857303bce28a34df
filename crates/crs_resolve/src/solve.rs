use itertools::Itertools;
use resolvo::{Solver as Resolvo, SolvableDisplay, VersionSetId};

use crs_types::{Dependency, PackageId, UsesSelector};

use crate::deps::all_dependencies;
use crate::error::ResolveError;
use crate::provider::CrsDependencyProvider;
use crate::range::{CandidateRecord, DependencyRange};
use crate::universe::PackageUniverse;

/// Renders the merged set of candidates behind one unsatisfiable requirement
/// as its sorted list of versions, for `DependencySolveFailure`'s
/// explanation text.
struct CrsSolvableDisplay;

impl SolvableDisplay<DependencyRange<'_>> for CrsSolvableDisplay {
    fn display_candidates(
        &self,
        pool: &resolvo::Pool<DependencyRange<'_>, String>,
        merged_candidates: &[resolvo::SolvableId],
    ) -> String {
        merged_candidates
            .iter()
            .map(|&id| pool.resolve_solvable(id).inner().0.id().version.clone())
            .sorted()
            .map(|v| v.to_string())
            .join(" | ")
    }
}

/// Resolves `roots` against `universe`, returning the chosen package for
/// every name transitively required.
///
/// Two passes: `resolvo` picks one candidate per name satisfying every
/// accumulated version range, then a second pass re-walks every resolved
/// package's dependencies and confirms each explicit `using` selector names
/// a library the chosen package actually has.
pub fn resolve(universe: &PackageUniverse, roots: &[Dependency]) -> Result<Vec<PackageId>, ResolveError> {
    let provider = CrsDependencyProvider::new(universe);

    let root_requirements: Vec<VersionSetId> = roots
        .iter()
        .map(|dep| {
            let name_id = provider.pool().intern_package_name(dep.name.as_str());
            provider
                .pool()
                .intern_version_set(name_id, DependencyRange::new(dep.range.clone()))
        })
        .collect();

    let mut solver = Resolvo::new(provider);
    let solvables = solver.solve(root_requirements).map_err(|problem| ResolveError::DependencySolveFailure {
        explanation: problem.display_user_friendly(&solver, &CrsSolvableDisplay).to_string(),
    })?;

    let resolved: Vec<CandidateRecord<'_>> = solvables
        .into_iter()
        .map(|id| *solver.pool().resolve_solvable(id).inner())
        .collect();

    validate_uses_selectors(roots, &resolved)?;

    Ok(resolved.iter().map(|c| c.0.id().clone()).collect())
}

fn validate_uses_selectors(roots: &[Dependency], resolved: &[CandidateRecord<'_>]) -> Result<(), ResolveError> {
    let find = |name: &str| resolved.iter().find(|c| c.0.id().name.as_str() == name);

    let mut all_deps: Vec<&Dependency> = roots.iter().collect();
    let owned: Vec<Dependency>;
    {
        let mut gathered = Vec::new();
        for candidate in resolved {
            gathered.extend(all_dependencies(candidate.0)?);
        }
        owned = gathered;
    }
    all_deps.extend(owned.iter());

    for dep in all_deps {
        let UsesSelector::ExplicitList(libs) = &dep.uses else {
            continue;
        };
        let Some(target) = find(dep.name.as_str()) else {
            continue;
        };
        let known_names: Vec<&str> = target.0.libraries().iter().map(|l| l.name.as_str()).collect();
        for lib in libs {
            if !known_names.contains(&lib.as_str()) {
                return Err(ResolveError::NoSuchLibrary {
                    package: target.0.id().name.clone(),
                    library: lib.clone(),
                    suggestion: crs_types::dym::did_you_mean(lib.as_str(), known_names.iter().copied()).into(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crs_types::PackageInfo;

    fn pkg(json: &str) -> PackageInfo {
        PackageInfo::parse(json).unwrap()
    }

    fn root(shorthand: &str) -> Dependency {
        Dependency::parse_shorthand(shorthand).unwrap()
    }

    #[test]
    fn picks_the_highest_version_and_revision_satisfying_the_root() {
        let universe = PackageUniverse::new(vec![
            pkg(r#"{"name":"base","version":"1.0.0","pkg-version":1,"namespace":"base"}"#),
            pkg(r#"{"name":"base","version":"1.5.0","pkg-version":1,"namespace":"base"}"#),
            pkg(r#"{"name":"base","version":"1.5.0","pkg-version":2,"namespace":"base"}"#),
        ]);
        let resolved = resolve(&universe, &[root("base^1.0.0")]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].version.to_string(), "1.5.0");
        assert_eq!(resolved[0].revision, 2);
    }

    #[test]
    fn transitively_pulls_in_package_level_dependencies() {
        let universe = PackageUniverse::new(vec![
            pkg(r#"{"name":"app","version":"1.0.0","pkg-version":1,"namespace":"app","depends":["base^1.0.0"]}"#),
            pkg(r#"{"name":"base","version":"1.0.0","pkg-version":1,"namespace":"base"}"#),
        ]);
        let resolved = resolve(&universe, &[root("app^1.0.0")]).unwrap();
        let names: Vec<&str> = resolved.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"app"));
        assert!(names.contains(&"base"));
    }

    #[test]
    fn conflicting_root_constraints_fail_with_an_explanation() {
        let universe =
            PackageUniverse::new(vec![pkg(r#"{"name":"base","version":"1.0.0","pkg-version":1,"namespace":"base"}"#)]);
        let err = resolve(&universe, &[root("base^1.0.0"), root("base^2.0.0")]).unwrap_err();
        match err {
            ResolveError::DependencySolveFailure { explanation } => assert!(!explanation.is_empty()),
            other => panic!("expected DependencySolveFailure, got {other:?}"),
        }
    }

    #[test]
    fn an_explicit_uses_selector_naming_a_real_library_succeeds() {
        let universe = PackageUniverse::new(vec![pkg(
            r#"{"name":"base","version":"1.0.0","pkg-version":1,"namespace":"base",
                "libraries":[{"name":"core","path":"."},{"name":"net","path":"net"}]}"#,
        )]);
        let resolved = resolve(&universe, &[root("base^1.0.0 using core")]).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn an_explicit_uses_selector_naming_an_unknown_library_fails_with_a_suggestion() {
        let universe = PackageUniverse::new(vec![pkg(
            r#"{"name":"base","version":"1.0.0","pkg-version":1,"namespace":"base",
                "libraries":[{"name":"core","path":"."}]}"#,
        )]);
        let err = resolve(&universe, &[root("base^1.0.0 using cor")]).unwrap_err();
        match err {
            ResolveError::NoSuchLibrary { library, suggestion, .. } => {
                assert_eq!(library.as_str(), "cor");
                assert_eq!(suggestion.0.as_deref(), Some("core"));
            }
            other => panic!("expected NoSuchLibrary, got {other:?}"),
        }
    }
}
