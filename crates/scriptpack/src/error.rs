//! Error taxonomy for the bundling pipeline.
//!
//! Fatal errors ([`ConfigurationError`], [`ManifestReadError`]) abort a run before any output is
//! written. The remaining errors are collected per file or per artifact and surfaced as warnings
//! through [`BuildWarning`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A target definition that cannot be resolved into a file list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("target '{target}' references undefined fragment '{fragment}'")]
    UnknownFragment { target: String, fragment: String },

    #[error("target '{target}' resolves to an empty file list")]
    EmptyTarget { target: String },

    #[error("target '{target}' is defined more than once")]
    DuplicateTarget { target: String },

    #[error("no target named '{target}' is configured")]
    UnknownTarget { target: String },
}

/// A listed source file that could not be read. Its contribution to the bundle is empty.
#[derive(Debug, Error)]
#[error("source file {path:?} could not be read")]
pub struct MissingSourceError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Failure of the external minifier or prettifier for one artifact.
#[derive(Debug, Error)]
pub enum ExternalToolError {
    #[error("no {role} is configured")]
    NotConfigured { role: &'static str },

    #[error("{command} is unavailable")]
    Unavailable {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{command} produced output that is not valid UTF-8")]
    InvalidOutput { command: String },
}

/// The version manifest could not supply a current version.
#[derive(Debug, Error)]
pub enum ManifestReadError {
    #[error("failed to read manifest {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse manifest {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest {path:?} has no string \"version\" field")]
    MissingVersion { path: PathBuf },

    #[error("manifest {path:?} holds an invalid version")]
    InvalidVersion {
        path: PathBuf,
        #[source]
        source: SemVerError,
    },

    #[error("version {version} in manifest {path:?} cannot be incremented any further")]
    VersionOverflow { path: PathBuf, version: String },
}

/// A version string that is not exactly three dot-separated non-negative integers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid semantic version '{0}': expected major.minor.patch")]
pub struct SemVerError(pub String);

/// A file targeted for version propagation that could not be rewritten.
#[derive(Debug, Error)]
pub enum VersionedFileWriteError {
    #[error("versioned file {path:?} does not exist")]
    NotFound { path: PathBuf },

    #[error("failed to rewrite versioned file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A non-fatal problem collected during a build pass.
#[derive(Debug, Error)]
pub enum BuildWarning {
    #[error("target '{target}': {error}")]
    MissingSource {
        target: String,
        #[source]
        error: MissingSourceError,
    },

    #[error("artifact {artifact:?}: {error}")]
    ExternalTool {
        artifact: PathBuf,
        #[source]
        error: ExternalToolError,
    },
}
