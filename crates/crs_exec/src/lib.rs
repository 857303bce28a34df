//! Drives a build plan to completion: realizes toolchain commands, skips
//! up-to-date compiles, fans work out across a bounded worker pool, and
//! records per-output dependency fingerprints for the next incremental
//! build.

pub mod archive;
pub mod build_env;
pub mod capture;
pub mod compile;
pub mod deps;
pub mod error;
pub mod executor;
pub mod link;
pub mod pool;
pub mod process;

pub use build_env::BuildEnv;
pub use capture::DepsMode;
pub use deps::{DepsRecord, DepsStore};
pub use error::BuildError;
pub use executor::{archive_all, compile_all, link_all, run_build};
pub use pool::parallel_run;
