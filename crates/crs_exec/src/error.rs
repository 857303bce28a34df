use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while driving a build plan.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("compilation of '{source}' failed:\n{output}")]
    CompilationFailed { source: PathBuf, output: String },

    #[error("archiving '{archive}' failed:\n{output}")]
    ArchiveFailed { archive: PathBuf, output: String },

    #[error("linking '{executable}' failed:\n{output}")]
    LinkFailed { executable: PathBuf, output: String },

    #[error("expected a GNU-style deps file at '{0}' but it does not exist")]
    MissingDepsFile(PathBuf),

    #[error(transparent)]
    Db(#[from] crs_db::DbError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
