use semver::Version;
use serde::{Deserialize, Serialize};

use crate::dym::did_you_mean;
use crate::error::MetaError;
use crate::library::{Library, RawDependency};
use crate::name::Name;
use crate::package_id::PackageId;

/// The known top-level keys of a `pkg.json` manifest. Anything else is a
/// hard error (with a "did you mean?" suggestion).
const KNOWN_KEYS: &[&str] = &[
    "name",
    "version",
    "pkg-version",
    "namespace",
    "libraries",
    "depends",
    "authors",
    "description",
    "documentation",
    "readme",
    "homepage",
    "repository",
    "license",
    "license-file",
    "x",
];

/// The typed shape of a `pkg.json` manifest (see `SPEC_FULL.md` §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: Name,
    pub version: Version,
    #[serde(rename = "pkg-version")]
    pub pkg_version: u64,
    pub namespace: Name,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub depends: Vec<RawDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "license-file")]
    pub license_file: Option<String>,
    /// Free-form extension data, round-tripped untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub x: serde_json::Map<String, serde_json::Value>,
}

fn validate_known_keys(obj: &serde_json::Map<String, serde_json::Value>) -> Result<(), MetaError> {
    for key in obj.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            let suggestion = did_you_mean(key, KNOWN_KEYS.iter().copied());
            return Err(MetaError::UnknownManifestKey {
                key: key.clone(),
                suggestion: suggestion.into(),
            });
        }
    }
    Ok(())
}

/// An immutable, parsed package manifest plus its canonical JSON form.
///
/// Every attribute other than the canonical `meta_json` is derived from it;
/// `parse` then `to_json` round-trips idempotently because `to_json`
/// re-serializes through a `serde_json::Value`, whose object keys are
/// always emitted in sorted order (this crate does not enable serde_json's
/// `preserve_order` feature, so `Map` is a `BTreeMap` under the hood).
#[derive(Debug, Clone)]
pub struct PackageInfo {
    id: PackageId,
    manifest: Manifest,
    meta_json: String,
}

impl PackageInfo {
    /// Parses and validates a `pkg.json` document.
    pub fn parse(json_text: &str) -> Result<Self, MetaError> {
        let value: serde_json::Value = serde_json::from_str(json_text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, MetaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| MetaError::BadManifestValue {
                key: "<root>".to_string(),
                reason: "manifest must be a JSON object".to_string(),
            })?;
        validate_known_keys(obj)?;

        let manifest: Manifest = serde_json::from_value(value)?;
        if manifest.pkg_version < 1 {
            return Err(MetaError::BadManifestValue {
                key: "pkg-version".to_string(),
                reason: "pkg-version must be an integer >= 1".to_string(),
            });
        }

        let id = PackageId::new(
            manifest.name.clone(),
            manifest.version.clone(),
            manifest.pkg_version,
        );

        let canonical = serde_json::to_value(&manifest)?;
        let meta_json = serde_json::to_string(&canonical)?;

        Ok(Self {
            id,
            manifest,
            meta_json,
        })
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn namespace(&self) -> &Name {
        &self.manifest.namespace
    }

    pub fn libraries(&self) -> &[Library] {
        &self.manifest.libraries
    }

    pub fn depends(&self) -> &[RawDependency] {
        &self.manifest.depends
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The canonical serialized form: keys sorted lexicographically, no
    /// insignificant whitespace.
    pub fn to_json(&self) -> &str {
        &self.meta_json
    }
}

impl PartialEq for PackageInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
