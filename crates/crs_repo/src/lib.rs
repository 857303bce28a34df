//! The local, on-disk package repository store: a directory of imported
//! `pkg.tgz`/`pkg.json` pairs indexed by an embedded SQL database, with a
//! republished gzip snapshot after every mutation.

pub mod archive;
pub mod error;
pub mod repo;

pub use error::RepoError;
pub use repo::Repository;
