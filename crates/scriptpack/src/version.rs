//! Semantic version bookkeeping: reading the current version from the package manifest,
//! incrementing it, and propagating the new value into every versioned file.

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ManifestReadError, SemVerError, VersionedFileWriteError};

/// `"version": "1.4.2"` as written in a JSON manifest.
static MANIFEST_FIELD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"("version"\s*:\s*")([^"\\]*)(")"#)
        .expect("Invalid regex pattern for manifest version field")
});

/// `VERSION = "1.4.2"` as assigned in source, e.g. `this.VERSION = "1.4.2";`.
static SOURCE_CONSTANT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\bVERSION\s*=\s*)(["'])([^"'\\\n]*)(["'])"#)
        .expect("Invalid regex pattern for source version constant")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BumpScope {
    #[default]
    Patch,
    Minor,
    Major,
}

impl SemVer {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Increment the component named by `scope`, resetting every lower component to zero.
    /// Returns `None` when the component is already at its maximum.
    #[must_use]
    pub fn bump(self, scope: BumpScope) -> Option<Self> {
        Some(match scope {
            BumpScope::Patch => Self::new(self.major, self.minor, self.patch.checked_add(1)?),
            BumpScope::Minor => Self::new(self.major, self.minor.checked_add(1)?, 0),
            BumpScope::Major => Self::new(self.major.checked_add(1)?, 0, 0),
        })
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemVer {
    type Err = SemVerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SemVerError(s.to_owned());
        let mut parts = s.split('.');
        let mut component = || -> Result<u64, SemVerError> {
            let part = parts.next().ok_or_else(invalid)?;
            // `u64::from_str` accepts a leading `+`, which is not a version digit
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let version = Self::new(component()?, component()?, component()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl FromStr for BumpScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(format!(
                "Invalid bump scope '{s}'. Supported scopes: patch, minor, major"
            )),
        }
    }
}

/// A textual shape that encodes a version string inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionPattern {
    /// A quoted `"version": "x.y.z"` manifest field.
    ManifestField,
    /// A `VERSION = "x.y.z"` assignment in source.
    SourceConstant,
}

impl VersionPattern {
    pub const ALL: [Self; 2] = [Self::ManifestField, Self::SourceConstant];

    /// Replace every occurrence of this pattern in `text` with `version`.
    /// Returns the rewritten text and the number of occurrences rewritten.
    pub fn rewrite(self, text: &str, version: &SemVer) -> (String, usize) {
        let mut count = 0;
        let rewritten = match self {
            Self::ManifestField => {
                MANIFEST_FIELD_PATTERN.replace_all(text, |caps: &Captures<'_>| {
                    count += 1;
                    format!("{}{version}{}", &caps[1], &caps[3])
                })
            }
            Self::SourceConstant => {
                SOURCE_CONSTANT_PATTERN.replace_all(text, |caps: &Captures<'_>| {
                    count += 1;
                    format!("{}{}{version}{}", &caps[1], &caps[2], &caps[4])
                })
            }
        };
        (rewritten.into_owned(), count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedFile {
    pub path: PathBuf,
    pub patterns: Vec<VersionPattern>,
}

impl VersionedFile {
    pub fn new(path: impl Into<PathBuf>, patterns: impl IntoIterator<Item = VersionPattern>) -> Self {
        Self {
            path: path.into(),
            patterns: patterns.into_iter().collect(),
        }
    }

    /// Rewrite every configured pattern in `text`, in declaration order.
    pub fn rewrite(&self, text: &str, version: &SemVer) -> (String, usize) {
        self.patterns
            .iter()
            .fold((text.to_owned(), 0), |(text, total), pattern| {
                let (text, count) = pattern.rewrite(&text, version);
                (text, total + count)
            })
    }
}

/// Outcome of propagating a version across a set of files.
#[derive(Debug, Default)]
pub struct PropagationReport {
    /// Files rewritten, with the number of occurrences replaced in each.
    pub updated: Vec<(PathBuf, usize)>,
    /// Files in which no version pattern was found.
    pub unmatched: Vec<PathBuf>,
    pub errors: Vec<VersionedFileWriteError>,
}

/// Read the current version from the `"version"` field of a JSON manifest.
pub fn read_manifest_version(path: &Path) -> Result<SemVer, ManifestReadError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| ManifestReadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let version = manifest
        .get("version")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ManifestReadError::MissingVersion {
            path: path.to_path_buf(),
        })?;
    version
        .parse()
        .map_err(|source| ManifestReadError::InvalidVersion {
            path: path.to_path_buf(),
            source,
        })
}

/// Write `version` into every file. A file that cannot be rewritten is recorded in the report
/// and the remaining files are still processed.
pub fn propagate(version: &SemVer, files: &[VersionedFile]) -> PropagationReport {
    let mut report = PropagationReport::default();

    for file in files {
        debug!("Propagating version {} into {:?}", version, file.path);
        match propagate_file(version, file) {
            Ok(0) => {
                warn!("No version string found in {:?}", file.path);
                report.unmatched.push(file.path.clone());
            }
            Ok(count) => {
                info!(
                    "Updated {} version occurrence(s) in {:?}",
                    count, file.path
                );
                report.updated.push((file.path.clone(), count));
            }
            Err(err) => {
                warn!("{err}");
                report.errors.push(err);
            }
        }
    }

    report
}

fn propagate_file(version: &SemVer, file: &VersionedFile) -> Result<usize, VersionedFileWriteError> {
    let content = fs::read_to_string(&file.path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            VersionedFileWriteError::NotFound {
                path: file.path.clone(),
            }
        } else {
            VersionedFileWriteError::Io {
                path: file.path.clone(),
                source,
            }
        }
    })?;

    let (rewritten, count) = file.rewrite(&content, version);
    if rewritten != content {
        fs::write(&file.path, rewritten).map_err(|source| VersionedFileWriteError::Io {
            path: file.path.clone(),
            source,
        })?;
    }
    Ok(count)
}

/// The manifest that supplies the current version, and the files that carry it.
#[derive(Debug, Clone)]
pub struct VersionStore {
    manifest: PathBuf,
    files: Vec<VersionedFile>,
}

impl VersionStore {
    /// The manifest is always propagated with the manifest-field pattern, ahead of `files`.
    pub fn new(manifest: impl Into<PathBuf>, files: Vec<VersionedFile>) -> Self {
        let manifest = manifest.into();
        let mut all = vec![VersionedFile::new(
            manifest.clone(),
            [VersionPattern::ManifestField],
        )];
        all.extend(files.into_iter().filter(|file| file.path != manifest));
        Self {
            manifest,
            files: all,
        }
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn files(&self) -> &[VersionedFile] {
        &self.files
    }

    pub fn current(&self) -> Result<SemVer, ManifestReadError> {
        read_manifest_version(&self.manifest)
    }

    /// Read the current version, increment it by `scope`, and propagate the result.
    ///
    /// A manifest that cannot be read, or whose version cannot be incremented, fails before
    /// any file is touched.
    pub fn bump(
        &self,
        scope: BumpScope,
    ) -> Result<(SemVer, SemVer, PropagationReport), ManifestReadError> {
        let current = self.current()?;
        let next = current
            .bump(scope)
            .ok_or_else(|| ManifestReadError::VersionOverflow {
                path: self.manifest.clone(),
                version: current.to_string(),
            })?;
        info!("Bumping version {current} -> {next} ({scope:?})");
        let report = propagate(&next, &self.files);
        Ok((current, next, report))
    }
}
