use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MissingSourceError;
use crate::util::{normalize_line_endings, resolve_path};

/// A full line holding a single `import ...;` declaration, including its line break.
static IMPORT_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*import\b[^\n]*;[ \t]*(?:\n|$)")
        .expect("Invalid regex pattern for import line detection")
});

const FILE_SEPARATOR: char = '\n';

/// The concatenated text of one target. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedUnit {
    text: String,
    sources: Vec<PathBuf>,
}

impl MergedUnit {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Files that contributed text, in bundle order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[derive(Debug)]
pub struct Concatenation {
    pub unit: MergedUnit,
    pub missing: Vec<MissingSourceError>,
}

/// Remove every line that is a single `import ...;` declaration.
///
/// This is a textual filter, not a parser: an import spanning several lines is kept.
pub fn strip_import_lines(text: &str) -> Cow<'_, str> {
    IMPORT_LINE_PATTERN.replace_all(text, "")
}

#[derive(Debug, Clone)]
pub struct Concatenator {
    root: PathBuf,
    strip_imports: bool,
}

impl Concatenator {
    /// Relative source paths are read from `root`.
    pub fn new(root: impl Into<PathBuf>, strip_imports: bool) -> Self {
        Self {
            root: root.into(),
            strip_imports,
        }
    }

    /// Join the files in order, each followed by a newline.
    ///
    /// A file that cannot be read is reported in [`Concatenation::missing`] and contributes
    /// nothing; the remaining files are still joined.
    pub fn concatenate(&self, files: &[PathBuf]) -> Concatenation {
        let mut text = String::new();
        let mut sources = Vec::with_capacity(files.len());
        let mut missing = Vec::new();

        for file in files {
            match self.read_source(file) {
                Ok(content) => {
                    debug!("Concatenating {:?} ({} bytes)", file, content.len());
                    text.push_str(&content);
                    text.push(FILE_SEPARATOR);
                    sources.push(file.clone());
                }
                Err(source) => {
                    warn!("Source file not found: {:?}", file);
                    missing.push(MissingSourceError {
                        path: file.clone(),
                        source,
                    });
                }
            }
        }

        Concatenation {
            unit: MergedUnit { text, sources },
            missing,
        }
    }

    fn read_source(&self, file: &Path) -> std::io::Result<String> {
        let content = normalize_line_endings(fs::read_to_string(resolve_path(&self.root, file))?);
        if self.strip_imports {
            Ok(strip_import_lines(&content).into_owned())
        } else {
            Ok(content)
        }
    }
}
