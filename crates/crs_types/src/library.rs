use serde::{Deserialize, Serialize};

use crate::dependency::Dependency;
use crate::name::Name;

/// A single library within a package: a name, the path to its sources
/// (relative to the package root), and dependencies additive to the
/// package-level ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub name: Name,
    pub path: String,
    #[serde(default)]
    pub dependencies: Vec<RawDependency>,
}

/// The on-the-wire form of a dependency: a shorthand string, as it appears
/// inside `pkg.json`'s `depends` arrays. Parsed lazily via
/// [`RawDependency::parse`] rather than at deserialize time, so that a
/// malformed shorthand surfaces as a [`crate::error::MetaError`] with full
/// context rather than a generic serde error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDependency(pub String);

impl RawDependency {
    pub fn parse(&self) -> Result<Dependency, crate::error::MetaError> {
        Dependency::parse_shorthand(&self.0)
    }
}
