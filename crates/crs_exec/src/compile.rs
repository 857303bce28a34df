use std::fs;
use std::path::Path;

use crs_plan::CompileFilePlan;
use crs_toolchain::CompileSpec;

use crate::build_env::BuildEnv;
use crate::capture::{gnu_depfile_path, parse_makefile_deps, parse_msvc_deps, DepsMode};
use crate::deps::{DepsRecord, DepsStore};
use crate::error::BuildError;
use crate::process::run_command;

pub fn build_compile_spec(plan: &CompileFilePlan, env: &BuildEnv) -> CompileSpec {
    CompileSpec {
        lang: plan.lang,
        source_path: plan.source_path.to_string_lossy().into_owned(),
        out_path: plan.out_path.to_string_lossy().into_owned(),
        include_dirs: env.include_dirs.clone(),
        definitions: env.definitions.clone(),
        enable_warnings: env.enable_warnings,
    }
}

/// `true` iff this output needs recompiling: no prior record, a changed
/// command, a missing output, or an input newer than the output.
pub fn should_compile(output_path: &Path, quoted_command: &str, deps_store: &DepsStore) -> Result<bool, BuildError> {
    let Some(prior) = deps_store.get(output_path)? else {
        return Ok(true);
    };
    if prior.command != quoted_command {
        return Ok(true);
    }
    let Ok(out_meta) = fs::metadata(output_path) else {
        return Ok(true);
    };
    let out_mtime = out_meta.modified()?;
    for input in &prior.inputs {
        match fs::metadata(input) {
            Ok(meta) if meta.modified()? > out_mtime => return Ok(true),
            Ok(_) => {}
            Err(_) => return Ok(true),
        }
    }
    Ok(false)
}

/// Runs one already-realized, already-filtered compile command and builds
/// its [`DepsRecord`] from the captured output. Never consults or updates
/// the deps store itself: persistence happens after the worker pool joins.
pub fn run_compile(
    plan: &CompileFilePlan,
    command: &[String],
    quoted_command: &str,
    env: &BuildEnv,
) -> Result<DepsRecord, BuildError> {
    if let Some(parent) = plan.out_path.parent() {
        fs::create_dir_all(parent)?;
    }

    tracing::info!(library = %plan.library, source = %plan.source_path.display(), "compile");
    let output = run_command(command)?;
    if !output.status.success() {
        tracing::error!(source = %plan.source_path.display(), command = quoted_command, output = %output.text, "compile failed");
        return Err(BuildError::CompilationFailed {
            source: plan.source_path.clone(),
            output: output.text,
        });
    }

    let (inputs, command_output) = match env.deps_mode {
        DepsMode::Gnu => {
            let depfile = gnu_depfile_path(&plan.out_path);
            (parse_makefile_deps(&depfile)?, output.text)
        }
        DepsMode::Msvc => {
            let (mut inputs, cleaned) = parse_msvc_deps(&output.text, &env.msvc_deps_prefix);
            inputs.push(plan.source_path.clone());
            (inputs, cleaned)
        }
    };

    if !command_output.trim().is_empty() {
        tracing::warn!(source = %plan.source_path.display(), "compiler produced output on a successful compile");
    }

    Ok(DepsRecord {
        output: plan.out_path.clone(),
        command: quoted_command.to_string(),
        inputs,
        command_output,
    })
}
