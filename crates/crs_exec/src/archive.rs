use std::fs;

use crs_plan::ArchivePlan;
use crs_toolchain::{ArchiveSpec, Toolchain};

use crate::error::BuildError;
use crate::process::run_command;

/// Archives have no up-to-date check of their own: they are rebuilt
/// whenever the archive phase runs, same as the original driver.
pub fn run_archive(plan: &ArchivePlan, toolchain: &Toolchain) -> Result<(), BuildError> {
    if let Some(parent) = plan.out_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let spec = ArchiveSpec {
        input_files: plan.object_paths.iter().map(|p| p.to_string_lossy().into_owned()).collect(),
        out_path: plan.out_path.to_string_lossy().into_owned(),
    };
    let command = toolchain.create_archive_command(&spec);

    tracing::info!(library = %plan.library, archive = %plan.out_path.display(), "archive");
    let output = run_command(&command)?;
    if !output.status.success() {
        tracing::error!(archive = %plan.out_path.display(), output = %output.text, "archive failed");
        return Err(BuildError::ArchiveFailed {
            archive: plan.out_path.clone(),
            output: output.text,
        });
    }
    Ok(())
}
