//! Thin CLI wiring over the core crates: argument parsing, logger setup,
//! exit-code mapping, and error rendering. No business logic lives here.

mod cli;
mod commands;
mod markers;

use clap::Parser;
use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbose.tracing_level_filter())
        .without_time()
        .init();

    let result = match cli.command {
        Command::Repo { action } => commands::repo::run(action, cli.if_exists),
        Command::Pkg { action } => commands::pkg::run(action, &cli.use_repo).await,
        Command::Build { project, toolchain, jobs } => commands::build::run(&project, &toolchain, jobs),
    };

    if let Err(err) = result {
        markers::write_marker(&err);
        eprintln!("{}", console::style(format!("error: {err:#}")).red());
        std::process::exit(1);
    }
}
