use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crs_exec::{BuildEnv, DepsStore};
use crs_plan::{build_plan, PlanLibrary};
use crs_toolchain::Toolchain;
use crs_types::PackageInfo;

/// Collects `root`'s `src/` and `include/` subtrees as paths relative to
/// `root`, mirroring the layout [`crs_repo::Repository::import_dir`]
/// expects of a library.
fn collect_source_paths(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for subtree in ["src", "include"] {
        let dir = root.join(subtree);
        if !dir.is_dir() {
            continue;
        }
        for entry in walkdir::WalkDir::new(&dir).into_iter().filter_map(Result::ok) {
            if entry.file_type().is_file() {
                if let Ok(rel) = entry.path().strip_prefix(root) {
                    out.push(rel.to_path_buf());
                }
            }
        }
    }
    out
}

pub fn run(project: &Path, toolchain_path: &Path, jobs: usize) -> Result<()> {
    let manifest_path = project.join("pkg.json");
    let manifest_text = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("reading project manifest at {}", manifest_path.display()))?;
    let info = PackageInfo::parse(&manifest_text)?;

    let local_names: std::collections::BTreeSet<&str> =
        info.libraries().iter().map(|l| l.name.as_str()).collect();

    let mut libraries = Vec::new();
    for lib in info.libraries() {
        let root = project.join(&lib.path);
        let depends_on = lib
            .dependencies
            .iter()
            .map(|raw| raw.parse())
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|dep| local_names.contains(dep.name.as_str()))
            .map(|dep| dep.name)
            .collect();
        libraries.push(PlanLibrary {
            name: lib.name.clone(),
            source_paths: collect_source_paths(&root),
            root,
            depends_on,
        });
    }

    let toolchain = Toolchain::load_from_file(toolchain_path)?;
    let build_root = project.join("build");
    std::fs::create_dir_all(&build_root)?;
    let plan = build_plan(&build_root, &libraries, toolchain.archive_suffix())?;

    let mut env = BuildEnv::gnu(toolchain);
    env.jobs = jobs;
    let mut deps_store = DepsStore::open(build_root.join("deps.db"))?;

    crs_exec::run_build(&plan, &env, &mut deps_store)?;

    println!(
        "built {} compiles, {} archives, {} executables",
        plan.compiles.len(),
        plan.archives.len(),
        plan.links.len()
    );
    Ok(())
}
