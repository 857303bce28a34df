use std::fs;

use crs_plan::LinkPlan;
use crs_toolchain::Toolchain;

use crate::error::BuildError;
use crate::process::run_command;

/// There is no separate link command template: the C++ compiler binary
/// doubles as the link driver, invoked on the entry object plus transitive
/// archives in dependency order.
pub fn run_link(plan: &LinkPlan, toolchain: &Toolchain) -> Result<(), BuildError> {
    if let Some(parent) = plan.out_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut command = vec![toolchain.cxx_compiler_binary().to_string()];
    command.push(plan.entry_object.to_string_lossy().into_owned());
    command.extend(plan.archive_paths.iter().map(|p| p.to_string_lossy().into_owned()));
    command.push("-o".to_string());
    command.push(plan.out_path.to_string_lossy().into_owned());

    tracing::info!(library = %plan.library, executable = %plan.out_path.display(), "link");
    let output = run_command(&command)?;
    if !output.status.success() {
        tracing::error!(executable = %plan.out_path.display(), output = %output.text, "link failed");
        return Err(BuildError::LinkFailed {
            executable: plan.out_path.clone(),
            output: output.text,
        });
    }
    Ok(())
}
