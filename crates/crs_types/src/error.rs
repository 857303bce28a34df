use thiserror::Error;

/// Errors raised while parsing or validating package metadata.
///
/// Variant names follow the taxonomy in the error-handling design: each
/// corresponds to one *input/parse* kind. Context (the offending input) is
/// carried on the variant itself rather than attached out-of-band, so a
/// caller can render a complete message without re-deriving what failed.
#[derive(Debug, Error)]
pub enum MetaError {
    /// A package, library, or `uses` name failed the identifier grammar
    /// (letters, digits, `_`, `-`, no leading digit).
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// A version string did not parse as strict semver.
    #[error("invalid version '{input}': {source}")]
    InvalidVersion {
        input: String,
        #[source]
        source: semver::Error,
    },

    /// A dependency shorthand string (`name<op>version[ using lib, ...]`)
    /// did not match the grammar.
    #[error("invalid dependency shorthand '{input}': {reason}")]
    InvalidDepShorthand { input: String, reason: String },

    /// `pkg.json` contained a key not in the known set.
    #[error("unknown manifest key '{key}'{suggestion}")]
    UnknownManifestKey {
        key: String,
        suggestion: DidYouMeanSuffix,
    },

    /// A known manifest key held a value of the wrong shape.
    #[error("bad value for manifest key '{key}': {reason}")]
    BadManifestValue { key: String, reason: String },

    /// The manifest was not valid JSON at all.
    #[error("malformed manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Renders as `", did you mean 'x'?"` or as nothing, so it can be spliced
/// straight into an error's `Display` without a branch at the call site.
#[derive(Debug, Default)]
pub struct DidYouMeanSuffix(pub Option<String>);

impl std::fmt::Display for DidYouMeanSuffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(candidate) => write!(f, ", did you mean '{candidate}'?"),
            None => Ok(()),
        }
    }
}

impl From<Option<String>> for DidYouMeanSuffix {
    fn from(value: Option<String>) -> Self {
        Self(value)
    }
}
