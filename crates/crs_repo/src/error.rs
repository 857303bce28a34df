use std::io;

use thiserror::Error;

/// Errors raised by the local repository store.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("'{0}' is already an initialized repository")]
    AlreadyInitialized(String),

    #[error("'{0}' is not an initialized repository")]
    NotInitialized(String),

    #[error("package '{0}' is already present in this repository")]
    PkgAlreadyPresent(String),

    #[error("no package '{0}' in this repository")]
    NoSuchPackage(String),

    #[error("'{member}' not found in archive '{archive}'")]
    MissingArchiveMember { archive: String, member: String },

    #[error(transparent)]
    Db(#[from] crs_db::DbError),

    #[error(transparent)]
    Meta(#[from] crs_types::MetaError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
