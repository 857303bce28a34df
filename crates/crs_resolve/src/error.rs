use crs_types::error::DidYouMeanSuffix;
use crs_types::Name;
use thiserror::Error;

/// Errors raised while resolving a root set of dependencies against a
/// package view.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No assignment of one package per name satisfies every accumulated
    /// version constraint. `explanation` traces the derivation graph from
    /// the root incompatibility: the chain of ranges that forced the
    /// conflict, each link naming the package and the narrowing dependency.
    #[error("no set of package versions satisfies the given dependencies:\n{explanation}")]
    DependencySolveFailure { explanation: String },

    /// A resolved package was selected via an explicit-uses selector
    /// naming a library it does not have.
    #[error("package '{package}' has no library named '{library}'{suggestion}")]
    NoSuchLibrary {
        package: Name,
        library: Name,
        suggestion: DidYouMeanSuffix,
    },

    #[error(transparent)]
    Meta(#[from] crs_types::MetaError),
}
