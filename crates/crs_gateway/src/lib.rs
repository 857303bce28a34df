//! A local mirror of one or more remote package repositories: fetches and
//! decompresses each remote's published metadata snapshot, tracks which
//! remotes are eligible for resolution queries, and lazily materialises
//! package archives on demand.

pub mod cache;
pub mod error;

pub use cache::{default_cache_root, RemoteCache, CACHE_DIR_ENV};
pub use error::GatewayError;
