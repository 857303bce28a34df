//! Drives a [`crs_plan::BuildPlan`] through compile, archive, and link
//! phases, each using the shared worker pool, with a full join barrier
//! between phases.

use parking_lot::Mutex;

use crs_plan::BuildPlan;

use crate::archive::run_archive;
use crate::build_env::BuildEnv;
use crate::compile::{build_compile_spec, run_compile, should_compile};
use crate::deps::{quote_command, DepsRecord, DepsStore};
use crate::error::BuildError;
use crate::link::run_link;
use crate::pool::parallel_run;

struct PendingCompile<'a> {
    plan: &'a crs_plan::CompileFilePlan,
    command: Vec<String>,
    quoted: String,
}

/// Realizes and filters the plan's compiles against the deps store, runs
/// the survivors through the worker pool, and persists every successful
/// compile's [`DepsRecord`] after the pool joins (even if some items
/// failed) so a retry only redoes the ones that didn't finish.
pub fn compile_all(plan: &BuildPlan, env: &BuildEnv, deps_store: &mut DepsStore) -> Result<(), BuildError> {
    let mut pending = Vec::new();
    for c in &plan.compiles {
        let spec = build_compile_spec(c, env);
        let command = env.toolchain.create_compile_command(&spec);
        let quoted = quote_command(&command);
        if should_compile(&c.out_path, &quoted, deps_store)? {
            pending.push(PendingCompile { plan: c, command, quoted });
        }
    }

    let collected: Mutex<Vec<DepsRecord>> = Mutex::new(Vec::new());
    let result = parallel_run(pending, env.jobs, |item| {
        let record = run_compile(item.plan, &item.command, &item.quoted, env)?;
        collected.lock().push(record);
        Ok(())
    });

    for record in collected.into_inner() {
        deps_store.put(&record)?;
    }

    result.map_err(|mut errors| errors.remove(0))
}

pub fn archive_all(plan: &BuildPlan, env: &BuildEnv) -> Result<(), BuildError> {
    parallel_run(plan.archives.clone(), env.jobs, |a| run_archive(a, &env.toolchain))
        .map_err(|mut errors| errors.remove(0))
}

pub fn link_all(plan: &BuildPlan, env: &BuildEnv) -> Result<(), BuildError> {
    parallel_run(plan.links.clone(), env.jobs, |l| run_link(l, &env.toolchain)).map_err(|mut errors| errors.remove(0))
}

/// Runs the full compile → archive → link sequence, aborting at the first
/// phase that fails.
pub fn run_build(plan: &BuildPlan, env: &BuildEnv, deps_store: &mut DepsStore) -> Result<(), BuildError> {
    compile_all(plan, env, deps_store)?;
    archive_all(plan, env)?;
    link_all(plan, env)?;
    Ok(())
}
