//! Immutable value types for package identity, version ranges, dependency
//! shorthand, and manifest (`pkg.json`) parsing.
//!
//! This crate has no I/O: it only knows how to parse, validate, and
//! serialize the data model described in the package metadata
//! specification. The repository store, resolver, and build crates build on
//! top of these types.

pub mod dependency;
pub mod dym;
pub mod error;
pub mod library;
pub mod name;
pub mod package_id;
pub mod package_info;
pub mod version_range;

pub use dependency::{Dependency, UsesSelector};
pub use error::MetaError;
pub use library::{Library, RawDependency};
pub use name::Name;
pub use package_id::PackageId;
pub use package_info::{Manifest, PackageInfo};
pub use version_range::{Interval, PartialVersion, RangeOp, VersionRangeSet};

pub use semver::Version;
