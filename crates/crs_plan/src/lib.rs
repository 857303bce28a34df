//! Build plan construction: given a set of resolved libraries and their
//! source files, classifies each file and derives the DAG of compilations,
//! archives, and link steps the executor will drive.

pub mod error;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crs_classify::{classify_file, SourceKind};
use crs_toolchain::Lang;
use crs_types::Name;

pub use error::PlanError;

/// A library as seen by the planner: its identity, its source root, the
/// paths (relative to that root) of its source files, and the names of
/// libraries it directly depends on (which must also appear in the set
/// passed to [`build_plan`]).
#[derive(Debug, Clone)]
pub struct PlanLibrary {
    pub name: Name,
    pub root: PathBuf,
    pub source_paths: Vec<PathBuf>,
    pub depends_on: Vec<Name>,
}

/// A single translation unit's compile step.
#[derive(Debug, Clone)]
pub struct CompileFilePlan {
    pub library: Name,
    pub lang: Lang,
    pub kind: SourceKind,
    pub source_path: PathBuf,
    pub basis_path: PathBuf,
    pub out_path: PathBuf,
}

/// A library's archive step, built from every `Source`-kind object file it
/// owns (test and app entry points are linked standalone, never archived).
#[derive(Debug, Clone)]
pub struct ArchivePlan {
    pub library: Name,
    pub object_paths: Vec<PathBuf>,
    pub out_path: PathBuf,
}

/// A single `app`/`test` translation unit's link step.
#[derive(Debug, Clone)]
pub struct LinkPlan {
    pub library: Name,
    pub entry_object: PathBuf,
    /// The owning library's own archive (if any) followed by transitive
    /// dependency archives, in dependency order.
    pub archive_paths: Vec<PathBuf>,
    pub out_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    pub compiles: Vec<CompileFilePlan>,
    pub archives: Vec<ArchivePlan>,
    pub links: Vec<LinkPlan>,
}

fn lang_for_extension(ext: &str) -> Lang {
    if ext.eq_ignore_ascii_case("c") {
        Lang::C
    } else {
        Lang::Cxx
    }
}

fn object_path(build_root: &Path, library: &str, basis_path: &Path) -> PathBuf {
    build_root.join("obj").join(library).join(basis_path).with_extension("o")
}

fn archive_path(build_root: &Path, library: &str, archive_suffix: &str) -> PathBuf {
    build_root
        .join("lib")
        .join(format!("lib{library}"))
        .with_extension(archive_suffix.trim_start_matches('.'))
}

fn exe_path(build_root: &Path, library: &str, stem: &str) -> PathBuf {
    build_root.join("bin").join(library).join(stem)
}

/// Topologically orders `start`'s transitive dependencies (not including
/// `start` itself), deepest-first, so linking an executable can list
/// archives in an order where each library precedes the ones it depends
/// on.
fn transitive_deps_in_order(
    start: &Name,
    libraries: &BTreeMap<Name, &PlanLibrary>,
) -> Result<Vec<Name>, PlanError> {
    let mut order = Vec::new();
    let mut visited = BTreeSet::new();
    let mut on_stack = BTreeSet::new();

    fn visit(
        name: &Name,
        libraries: &BTreeMap<Name, &PlanLibrary>,
        visited: &mut BTreeSet<Name>,
        on_stack: &mut BTreeSet<Name>,
        order: &mut Vec<Name>,
    ) -> Result<(), PlanError> {
        if visited.contains(name) {
            return Ok(());
        }
        if !on_stack.insert(name.clone()) {
            return Err(PlanError::DependencyCycle(name.to_string()));
        }
        let lib = libraries
            .get(name)
            .ok_or_else(|| PlanError::UnknownDependency(name.to_string()))?;
        for dep in &lib.depends_on {
            visit(dep, libraries, visited, on_stack, order)?;
        }
        on_stack.remove(name);
        visited.insert(name.clone());
        order.push(name.clone());
        Ok(())
    }

    let start_lib = libraries
        .get(start)
        .ok_or_else(|| PlanError::UnknownDependency(start.to_string()))?;
    for dep in &start_lib.depends_on {
        visit(dep, libraries, &mut visited, &mut on_stack, &mut order)?;
    }
    Ok(order)
}

/// Builds the full compile/archive/link plan for `libraries`, placing
/// outputs under `build_root`. `archive_suffix` comes from the toolchain
/// in use (e.g. `.a`).
pub fn build_plan(
    build_root: &Path,
    libraries: &[PlanLibrary],
    archive_suffix: &str,
) -> Result<BuildPlan, PlanError> {
    let by_name: BTreeMap<Name, &PlanLibrary> = libraries.iter().map(|lib| (lib.name.clone(), lib)).collect();

    let mut plan = BuildPlan::default();
    let mut archive_objects: BTreeMap<Name, Vec<PathBuf>> = BTreeMap::new();

    for lib in libraries {
        for rel in &lib.source_paths {
            let absolute = lib.root.join(rel);
            let Some(source_file) = classify_file(absolute, rel.clone()) else {
                continue;
            };
            if matches!(source_file.kind, SourceKind::Header | SourceKind::HeaderImpl) {
                continue;
            }
            let ext = rel.extension().and_then(|e| e.to_str()).unwrap_or("");
            let out_path = object_path(build_root, lib.name.as_str(), rel);

            if source_file.kind == SourceKind::Source {
                archive_objects.entry(lib.name.clone()).or_default().push(out_path.clone());
            }

            plan.compiles.push(CompileFilePlan {
                library: lib.name.clone(),
                lang: lang_for_extension(ext),
                kind: source_file.kind,
                source_path: source_file.absolute_path,
                basis_path: source_file.basis_path,
                out_path,
            });
        }
    }

    let mut archive_path_of: BTreeMap<Name, PathBuf> = BTreeMap::new();
    for lib in libraries {
        if let Some(objects) = archive_objects.get(&lib.name) {
            if !objects.is_empty() {
                let out_path = archive_path(build_root, lib.name.as_str(), archive_suffix);
                archive_path_of.insert(lib.name.clone(), out_path.clone());
                plan.archives.push(ArchivePlan {
                    library: lib.name.clone(),
                    object_paths: objects.clone(),
                    out_path,
                });
            }
        }
    }

    for compile in &plan.compiles {
        if !matches!(compile.kind, SourceKind::Test | SourceKind::App) {
            continue;
        }
        let mut archive_paths = Vec::new();
        if let Some(own) = archive_path_of.get(&compile.library) {
            archive_paths.push(own.clone());
        }
        for dep in transitive_deps_in_order(&compile.library, &by_name)? {
            if let Some(dep_archive) = archive_path_of.get(&dep) {
                archive_paths.push(dep_archive.clone());
            }
        }
        let stem = compile.basis_path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
        plan.links.push(LinkPlan {
            library: compile.library.clone(),
            entry_object: compile.out_path.clone(),
            archive_paths,
            out_path: exe_path(build_root, compile.library.as_str(), stem),
        });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crs_types::Name;

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    #[test]
    fn builds_compile_archive_and_link_plans() {
        let libraries = vec![
            PlanLibrary {
                name: name("base"),
                root: PathBuf::from("/src/base"),
                source_paths: vec![PathBuf::from("src/base.cpp"), PathBuf::from("include/base.h")],
                depends_on: vec![],
            },
            PlanLibrary {
                name: name("app"),
                root: PathBuf::from("/src/app"),
                source_paths: vec![
                    PathBuf::from("src/app.main.cpp"),
                    PathBuf::from("src/app.test.cpp"),
                    PathBuf::from("src/app.cpp"),
                ],
                depends_on: vec![name("base")],
            },
        ];

        let plan = build_plan(Path::new("/build"), &libraries, ".a").unwrap();

        // base.h is a header, not compiled.
        assert_eq!(plan.compiles.len(), 4);
        assert!(plan
            .compiles
            .iter()
            .all(|c| c.kind != SourceKind::Header));

        // Both libraries have at least one Source-kind TU, so both archive.
        assert_eq!(plan.archives.len(), 2);
        let app_archive = plan.archives.iter().find(|a| a.library == name("app")).unwrap();
        assert_eq!(app_archive.object_paths.len(), 1, "only app.cpp (Source) is archived");

        // One link per app/test TU.
        assert_eq!(plan.links.len(), 2);
        let main_link = plan
            .links
            .iter()
            .find(|l| l.out_path.ends_with("app.main"))
            .unwrap();
        // Links against its own archive, then the base archive it depends on.
        assert_eq!(main_link.archive_paths.len(), 2);
        assert!(main_link.archive_paths[0].ends_with("libapp.a"));
        assert!(main_link.archive_paths[1].ends_with("libbase.a"));
    }

    #[test]
    fn library_with_only_a_test_tu_gets_no_archive() {
        let libraries = vec![PlanLibrary {
            name: name("testonly"),
            root: PathBuf::from("/src/t"),
            source_paths: vec![PathBuf::from("src/t.test.cpp")],
            depends_on: vec![],
        }];
        let plan = build_plan(Path::new("/build"), &libraries, ".a").unwrap();
        assert!(plan.archives.is_empty());
        assert_eq!(plan.links.len(), 1);
        assert!(plan.links[0].archive_paths.is_empty());
    }

    #[test]
    fn dependency_cycle_is_detected() {
        let libraries = vec![
            PlanLibrary {
                name: name("a"),
                root: PathBuf::from("/a"),
                source_paths: vec![PathBuf::from("a.main.cpp")],
                depends_on: vec![name("b")],
            },
            PlanLibrary {
                name: name("b"),
                root: PathBuf::from("/b"),
                source_paths: vec![PathBuf::from("b.cpp")],
                depends_on: vec![name("a")],
            },
        ];
        let err = build_plan(Path::new("/build"), &libraries, ".a").unwrap_err();
        assert!(matches!(err, PlanError::DependencyCycle(_)));
    }

    #[test]
    fn object_paths_mirror_source_layout_under_build_obj_library() {
        let libraries = vec![PlanLibrary {
            name: name("base"),
            root: PathBuf::from("/src/base"),
            source_paths: vec![PathBuf::from("src/nested/base.cpp")],
            depends_on: vec![],
        }];
        let plan = build_plan(Path::new("/build"), &libraries, ".a").unwrap();
        assert_eq!(plan.compiles[0].out_path, PathBuf::from("/build/obj/base/src/nested/base.o"));
    }
}
