use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MetaError;

/// A validated identifier: used for package names, library names, and
/// `uses` selector entries.
///
/// Conda-types-style wrapper around a `String`: immutable once constructed,
/// and the only way to build one is through [`Name::parse`], so a `Name` in
/// hand is always valid.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Parses and validates an identifier: letters, digits, `_`, `-`; must
    /// not be empty and must not start with a digit.
    pub fn parse(s: impl Into<String>) -> Result<Self, MetaError> {
        let s = s.into();
        if s.is_empty() {
            return Err(MetaError::InvalidName {
                name: s,
                reason: "name must not be empty",
            });
        }
        let mut chars = s.chars();
        let first = chars.next().expect("checked non-empty above");
        if first.is_ascii_digit() {
            return Err(MetaError::InvalidName {
                name: s,
                reason: "name must not start with a digit",
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(MetaError::InvalidName {
                name: s,
                reason: "name must contain only letters, digits, '_', or '-'",
            });
        }
        Ok(Self(s))
    }

    /// Constructs a `Name` without validation. Only call this on strings
    /// that are already known-valid (e.g. round-tripped from a prior `Name`).
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Name {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(s).map_err(serde::de::Error::custom)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

use std::borrow::Borrow;
