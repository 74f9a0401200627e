//! The boundary to the external minifier and prettifier, and persistence of finished artifacts.

use anyhow::{Context, Result};
use log::{debug, trace};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::config::{Config, ToolConfig};
use crate::error::ExternalToolError;

/// Turns the text of an artifact into its final form.
pub trait ArtifactEmitter {
    /// Minify `text` when `minify` is set, otherwise produce its readable form.
    fn render(&self, text: &str, minify: bool) -> Result<String, ExternalToolError>;
}

/// A command that reads source on stdin and writes the result to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    command: String,
    args: Vec<String>,
}

impl From<ToolConfig> for ExternalTool {
    fn from(config: ToolConfig) -> Self {
        Self {
            command: config.command,
            args: config.args,
        }
    }
}

impl ExternalTool {
    fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn run(&self, input: &str) -> Result<String, ExternalToolError> {
        let command_line = self.command_line();
        debug!("Running {command_line} on {} bytes", input.len());

        let unavailable = |source: io::Error| ExternalToolError::Unavailable {
            command: command_line.clone(),
            source,
        };

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(unavailable)?;

        // Stdin is fed from a separate thread while stdout and stderr drain here
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_owned();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output().map_err(unavailable)?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The tool may exit without reading all of its input; its status decides
                Ok(Err(err)) => trace!("{command_line} closed stdin early: {err}"),
                Err(_) => trace!("stdin writer for {command_line} panicked"),
            }
        }

        if !output.status.success() {
            return Err(ExternalToolError::Failed {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|_| ExternalToolError::InvalidOutput {
                command: command_line,
            })
    }
}

/// Renders artifacts through the configured minifier and prettifier.
///
/// Without a prettifier, readable artifacts are the input text unchanged. Without a minifier,
/// every minified render fails with [`ExternalToolError::NotConfigured`].
#[derive(Debug, Clone, Default)]
pub struct ToolchainEmitter {
    minifier: Option<ExternalTool>,
    prettifier: Option<ExternalTool>,
}

impl ToolchainEmitter {
    pub fn new(minifier: Option<ExternalTool>, prettifier: Option<ExternalTool>) -> Self {
        Self {
            minifier,
            prettifier,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.minifier.clone().map(ExternalTool::from),
            config.prettifier.clone().map(ExternalTool::from),
        )
    }
}

impl ArtifactEmitter for ToolchainEmitter {
    fn render(&self, text: &str, minify: bool) -> Result<String, ExternalToolError> {
        if minify {
            self.minifier
                .as_ref()
                .ok_or(ExternalToolError::NotConfigured { role: "minifier" })?
                .run(text)
        } else {
            match &self.prettifier {
                Some(prettifier) => prettifier.run(text),
                None => Ok(text.to_owned()),
            }
        }
    }
}

/// One of the four files a target can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Readable,
    Minified,
    RuntimeReadable,
    RuntimeMinified,
}

impl ArtifactKind {
    pub const fn is_minified(self) -> bool {
        matches!(self, Self::Minified | Self::RuntimeMinified)
    }

    pub const fn is_runtime(self) -> bool {
        matches!(self, Self::RuntimeReadable | Self::RuntimeMinified)
    }
}

/// Directories and extensions artifacts are written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub output_dir: PathBuf,
    pub runtime_output_dir: PathBuf,
    pub extension: String,
    pub runtime_extension: String,
}

impl OutputLayout {
    /// Relative directories are placed under `root`.
    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self {
            output_dir: crate::util::resolve_path(root, &config.output_dir),
            runtime_output_dir: crate::util::resolve_path(root, &config.runtime_output_dir),
            extension: config.extension.clone(),
            runtime_extension: config.runtime_extension.clone(),
        }
    }

    /// `<dir>/<output>[.min].<ext>`
    pub fn artifact_path(&self, output: &str, kind: ArtifactKind) -> PathBuf {
        let (dir, extension) = if kind.is_runtime() {
            (&self.runtime_output_dir, &self.runtime_extension)
        } else {
            (&self.output_dir, &self.extension)
        };
        let file_name = if kind.is_minified() {
            format!("{output}.min.{extension}")
        } else {
            format!("{output}.{extension}")
        };
        dir.join(file_name)
    }
}

/// Write an artifact, creating its directory when needed.
pub fn persist(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    fs::write(path, text)
        .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
    Ok(())
}
