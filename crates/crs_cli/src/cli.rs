use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::Verbosity;

/// The `crs` command-line front end.
#[derive(Debug, Parser)]
#[command(name = "crs", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub verbose: Verbosity,

    /// What to do when the target of a creating operation already exists.
    #[arg(long, global = true, value_enum, default_value_t = IfExists::Fail)]
    pub if_exists: IfExists,

    /// Output path; meaning depends on the subcommand (build root, prefetch
    /// destination, ...).
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// A remote repository URL to fold into the package view. May be
    /// repeated.
    #[arg(long = "use-repo", global = true)]
    pub use_repo: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IfExists {
    Fail,
    Ignore,
    Replace,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage a local CRS repository.
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Query or fetch packages via the remote cache.
    Pkg {
        #[command(subcommand)]
        action: PkgAction,
    },
    /// Build a project's own declared libraries.
    Build {
        /// The project directory, containing a `pkg.json`.
        project: PathBuf,
        /// The toolchain description file.
        #[arg(long)]
        toolchain: PathBuf,
        /// Number of parallel compile/archive/link jobs (0 = auto).
        #[arg(long, default_value_t = 0)]
        jobs: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum RepoAction {
    /// Create a new repository.
    Init {
        path: PathBuf,
        #[arg(long)]
        name: String,
    },
    /// Import a package archive or loose directory into a repository.
    Import { path: PathBuf, source: PathBuf },
    /// List every package in a repository.
    Ls { path: PathBuf },
    /// Remove one package revision from a repository.
    Remove {
        path: PathBuf,
        name: String,
        version: String,
        revision: u64,
    },
}

#[derive(Debug, Subcommand)]
pub enum PkgAction {
    /// Resolve and prefetch a single dependency shorthand against the
    /// enabled remotes.
    Get { spec: String },
    /// Materialise one exact package revision's archive in the local
    /// cache.
    Prefetch {
        name: String,
        version: String,
        revision: u64,
    },
    /// Resolve a set of dependency shorthands against the enabled remotes
    /// and print the chosen revisions.
    Solve { specs: Vec<String> },
}
