//! Short stable error-kind strings, written to a marker file named by
//! `CRS_TEST_ERROR_MARKER_FILE` when set, so integration tests can assert on
//! *which* error kind fired without string-matching the rendered message.

use std::env;
use std::fs;

use crs_exec::BuildError;
use crs_gateway::GatewayError;
use crs_repo::RepoError;
use crs_resolve::ResolveError;
use crs_toolchain::ToolchainError;
use crs_types::MetaError;

const MARKER_FILE_ENV: &str = "CRS_TEST_ERROR_MARKER_FILE";

fn marker_for(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<RepoError>() {
        return Some(match e {
            RepoError::AlreadyInitialized(_) => "repo-init-already-init",
            RepoError::NotInitialized(_) => "repo-not-initialized",
            RepoError::PkgAlreadyPresent(_) => "pkg-already-present",
            RepoError::NoSuchPackage(_) => "no-such-package",
            RepoError::MissingArchiveMember { .. } => "repo-import-failed",
            RepoError::Db(_) => "generic-sql",
            RepoError::Meta(_) => "invalid-manifest",
            RepoError::Io(_) => "io-other",
        });
    }
    if let Some(e) = err.downcast_ref::<GatewayError>() {
        return Some(match e {
            GatewayError::NoSuchPackage(_) => "no-such-package",
            GatewayError::NoSuchRemote(_) => "no-such-remote",
            GatewayError::InvalidUrl(..) => "invalid-remote-url",
            GatewayError::FetchFailed { .. } => "fetch-failed",
            GatewayError::Db(_) => "generic-sql",
            GatewayError::Meta(_) => "invalid-manifest",
            GatewayError::Io(_) => "io-other",
        });
    }
    if let Some(e) = err.downcast_ref::<ResolveError>() {
        return Some(match e {
            ResolveError::DependencySolveFailure { .. } => "dependency-solve-failure",
            ResolveError::NoSuchLibrary { .. } => "no-such-library",
            ResolveError::Meta(_) => "invalid-manifest",
        });
    }
    if err.downcast_ref::<ToolchainError>().is_some() {
        return Some("toolchain-load-failed");
    }
    if let Some(e) = err.downcast_ref::<BuildError>() {
        return Some(match e {
            BuildError::CompilationFailed { .. } => "compilation-failed",
            BuildError::ArchiveFailed { .. } => "archive-failed",
            BuildError::LinkFailed { .. } => "link-failed",
            BuildError::MissingDepsFile(_) => "missing-deps-file",
            BuildError::Db(_) => "generic-sql",
            BuildError::Io(_) => "io-other",
        });
    }
    if let Some(e) = err.downcast_ref::<MetaError>() {
        return Some(match e {
            MetaError::InvalidName { .. } => "invalid-name",
            MetaError::InvalidVersion { .. } => "invalid-version",
            MetaError::InvalidDepShorthand { .. } => "invalid-dep-shorthand",
            MetaError::UnknownManifestKey { .. } => "unknown-manifest-key",
            MetaError::BadManifestValue { .. } => "bad-manifest-value",
            MetaError::Json(_) => "bad-manifest-value",
        });
    }
    None
}

/// If `CRS_TEST_ERROR_MARKER_FILE` is set, write `err`'s marker string to
/// it. Silently does nothing for unrecognised error kinds or if the
/// environment variable is unset.
pub fn write_marker(err: &anyhow::Error) {
    let Ok(path) = env::var(MARKER_FILE_ENV) else {
        return;
    };
    if let Some(marker) = marker_for(err) {
        let _ = fs::write(path, marker);
    }
}
