use std::io;
use std::process::{Command, ExitStatus};

/// The combined stdout+stderr text of a finished subprocess, in the order
/// the original C++ compile driver merges them (stdout first, then
/// stderr), plus its exit status.
pub struct CommandOutput {
    pub status: ExitStatus,
    pub text: String,
}

pub fn run_command(argv: &[String]) -> io::Result<CommandOutput> {
    let (bin, args) = argv.split_first().expect("argv must have at least a binary name");
    let output = Command::new(bin).args(args).output()?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(CommandOutput { status: output.status, text })
}
