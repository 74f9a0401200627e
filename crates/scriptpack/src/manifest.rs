//! Expansion of configured bundle targets into ordered source file lists.
//!
//! Resolution is pure: it never touches the filesystem, so configuration mistakes surface
//! before any source file is read or any artifact is written.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::TargetConfig;
use crate::error::ConfigurationError;

/// Named, ordered lists of source paths shared between targets.
pub type FragmentLibrary = IndexMap<String, Vec<PathBuf>>;

/// An output form a target can be emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Concatenated source, optionally pretty-printed.
    Readable,
    /// Concatenated source passed through the minifier.
    Minified,
    /// Source rewritten to assignment-form exports for the second runtime.
    RuntimeConverted,
}

impl Variant {
    pub const ALL: [Self; 3] = [Self::Readable, Self::Minified, Self::RuntimeConverted];

    pub fn all() -> Vec<Self> {
        Self::ALL.to_vec()
    }

    /// Flag name used by `//#if <flag>` regions.
    pub const fn flag(self) -> &'static str {
        match self {
            Self::Readable => "readable",
            Self::Minified => "minified",
            Self::RuntimeConverted => "runtime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTarget {
    pub name: String,
    /// Artifact identifier used to derive output file names.
    pub output: String,
    /// Source files in bundle order. Never empty; may contain duplicates.
    pub files: Vec<PathBuf>,
    pub variants: IndexSet<Variant>,
    pub strip_imports: bool,
}

impl BundleTarget {
    pub fn wants(&self, variant: Variant) -> bool {
        self.variants.contains(&variant)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ManifestResolver<'a> {
    fragments: &'a FragmentLibrary,
    strip_imports: bool,
}

impl<'a> ManifestResolver<'a> {
    /// `strip_imports` is the default for targets that do not set it themselves.
    pub const fn new(fragments: &'a FragmentLibrary, strip_imports: bool) -> Self {
        Self {
            fragments,
            strip_imports,
        }
    }

    /// Concatenate the target's fragments in the order the target declares them.
    pub fn resolve(&self, target: &TargetConfig) -> Result<BundleTarget, ConfigurationError> {
        let mut files = Vec::new();
        for fragment in &target.fragments {
            let paths =
                self.fragments
                    .get(fragment)
                    .ok_or_else(|| ConfigurationError::UnknownFragment {
                        target: target.name.clone(),
                        fragment: fragment.clone(),
                    })?;
            files.extend(paths.iter().cloned());
        }

        if files.is_empty() {
            return Err(ConfigurationError::EmptyTarget {
                target: target.name.clone(),
            });
        }

        Ok(BundleTarget {
            name: target.name.clone(),
            output: target.output.clone().unwrap_or_else(|| target.name.clone()),
            files,
            variants: target.variants.iter().copied().collect(),
            strip_imports: target.strip_imports.unwrap_or(self.strip_imports),
        })
    }

    /// Resolve every target in declaration order, rejecting duplicate names.
    pub fn resolve_all(
        &self,
        targets: &[TargetConfig],
    ) -> Result<Vec<BundleTarget>, ConfigurationError> {
        let mut seen = IndexSet::new();
        targets
            .iter()
            .map(|target| {
                if !seen.insert(target.name.as_str()) {
                    return Err(ConfigurationError::DuplicateTarget {
                        target: target.name.clone(),
                    });
                }
                self.resolve(target)
            })
            .collect()
    }
}

/// Keep only the targets named in `names`, in configuration order. An empty filter keeps all.
pub fn select_targets(
    targets: Vec<BundleTarget>,
    names: &[String],
) -> Result<Vec<BundleTarget>, ConfigurationError> {
    if names.is_empty() {
        return Ok(targets);
    }
    if let Some(unknown) = names
        .iter()
        .find(|name| !targets.iter().any(|target| &target.name == *name))
    {
        return Err(ConfigurationError::UnknownTarget {
            target: unknown.clone(),
        });
    }
    Ok(targets
        .into_iter()
        .filter(|target| names.contains(&target.name))
        .collect())
}
