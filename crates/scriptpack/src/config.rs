use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::combine::Combine;
use crate::dirs::config_layers;
use crate::error::ConfigurationError;
use crate::manifest::{BundleTarget, FragmentLibrary, ManifestResolver, Variant};
use crate::transform::DEFAULT_EXPORT_TABLE;
use crate::util::resolve_path;
use crate::version::{VersionPattern, VersionStore, VersionedFile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Directory for readable and minified artifacts
    pub output_dir: PathBuf,

    /// Directory for artifacts converted to assignment-form exports
    pub runtime_output_dir: PathBuf,

    /// File extension of primary artifacts
    pub extension: String,

    /// File extension of runtime-converted artifacts
    pub runtime_extension: String,

    /// Export table that runtime-converted artifacts bind their exports onto
    pub export_table: String,

    /// Whether line-anchored `import` declarations are stripped when concatenating.
    /// Targets may override this individually.
    pub strip_imports: bool,

    /// What to do with an artifact whose minifier or prettifier fails
    pub on_tool_failure: ToolFailurePolicy,

    /// External command producing minified artifacts
    pub minifier: Option<ToolConfig>,

    /// External command pretty-printing readable artifacts
    pub prettifier: Option<ToolConfig>,

    /// Reusable, ordered source file lists
    pub fragments: FragmentLibrary,

    /// Bundle targets, built in declaration order
    pub targets: Vec<TargetConfig>,

    /// Version manifest and the files the version is propagated into
    pub version: VersionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build"),
            runtime_output_dir: PathBuf::from("build_node"),
            extension: "js".to_owned(),
            runtime_extension: "cjs".to_owned(),
            export_table: DEFAULT_EXPORT_TABLE.to_owned(),
            strip_imports: true,
            on_tool_failure: ToolFailurePolicy::default(),
            minifier: None,
            prettifier: None,
            fragments: FragmentLibrary::new(),
            targets: Vec::new(),
            version: VersionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    pub name: String,

    /// Artifact identifier; defaults to the target name
    #[serde(default)]
    pub output: Option<String>,

    /// Fragment names, concatenated in this order
    pub fragments: Vec<String>,

    #[serde(default = "Variant::all")]
    pub variants: Vec<Variant>,

    #[serde(default)]
    pub strip_imports: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolConfig {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a whitespace-separated command line, e.g. `"uglifyjs -c --warn"`.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?;
        Some(Self::new(command, words))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolFailurePolicy {
    /// Do not write the artifact
    #[default]
    Skip,
    /// Write the text as it was before the failing tool ran
    Fallback,
}

impl FromStr for ToolFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip" => Ok(Self::Skip),
            "fallback" => Ok(Self::Fallback),
            _ => Err(anyhow::anyhow!(
                "Invalid tool failure policy '{}'. Supported policies: skip, fallback",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VersionConfig {
    /// JSON manifest holding the authoritative `"version"` field
    pub manifest: PathBuf,

    /// Further files carrying the version string
    pub files: Vec<VersionedFileConfig>,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("package.json"),
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VersionedFileConfig {
    pub path: PathBuf,
    #[serde(default = "all_version_patterns")]
    pub patterns: Vec<VersionPattern>,
}

fn all_version_patterns() -> Vec<VersionPattern> {
    VersionPattern::ALL.to_vec()
}

/// `high` unless it still holds the default value.
fn prefer<T: PartialEq>(high: T, low: T, default: &T) -> T {
    if high == *default { low } else { high }
}

impl Combine for Config {
    fn combine(self, other: Self) -> Self {
        let defaults = Self::default();
        Self {
            output_dir: prefer(self.output_dir, other.output_dir, &defaults.output_dir),
            runtime_output_dir: prefer(
                self.runtime_output_dir,
                other.runtime_output_dir,
                &defaults.runtime_output_dir,
            ),
            extension: prefer(self.extension, other.extension, &defaults.extension),
            runtime_extension: prefer(
                self.runtime_extension,
                other.runtime_extension,
                &defaults.runtime_extension,
            ),
            export_table: prefer(self.export_table, other.export_table, &defaults.export_table),
            strip_imports: prefer(self.strip_imports, other.strip_imports, &defaults.strip_imports),
            on_tool_failure: prefer(
                self.on_tool_failure,
                other.on_tool_failure,
                &defaults.on_tool_failure,
            ),
            minifier: self.minifier.combine(other.minifier),
            prettifier: self.prettifier.combine(other.prettifier),
            // Fragments merge by name; targets are replaced wholesale
            fragments: self.fragments.combine(other.fragments),
            targets: if self.targets.is_empty() {
                other.targets
            } else {
                self.targets
            },
            version: prefer(self.version, other.version, &defaults.version),
        }
    }
}

/// Configuration values from environment variables with SCRIPTPACK_ prefix
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub output_dir: Option<PathBuf>,
    pub runtime_output_dir: Option<PathBuf>,
    pub export_table: Option<String>,
    pub strip_imports: Option<bool>,
    pub minifier: Option<ToolConfig>,
    pub prettifier: Option<ToolConfig>,
    pub on_tool_failure: Option<ToolFailurePolicy>,
}

impl EnvConfig {
    /// Load configuration from environment variables with SCRIPTPACK_ prefix
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|value| !value.trim().is_empty());

        Self {
            output_dir: var("SCRIPTPACK_OUTPUT_DIR").map(PathBuf::from),
            runtime_output_dir: var("SCRIPTPACK_RUNTIME_OUTPUT_DIR").map(PathBuf::from),
            export_table: var("SCRIPTPACK_EXPORT_TABLE").map(|table| table.trim().to_owned()),
            strip_imports: var("SCRIPTPACK_STRIP_IMPORTS").and_then(|value| parse_bool(&value)),
            // SCRIPTPACK_MINIFIER / SCRIPTPACK_PRETTIFIER - whitespace-separated command lines
            minifier: var("SCRIPTPACK_MINIFIER").and_then(|line| ToolConfig::from_command_line(&line)),
            prettifier: var("SCRIPTPACK_PRETTIFIER")
                .and_then(|line| ToolConfig::from_command_line(&line)),
            on_tool_failure: var("SCRIPTPACK_ON_TOOL_FAILURE").and_then(|value| {
                value
                    .trim()
                    .parse()
                    .inspect_err(|err| log::warn!("Ignoring SCRIPTPACK_ON_TOOL_FAILURE: {err}"))
                    .ok()
            }),
        }
    }

    /// Apply environment config to base config
    pub fn apply_to(self, mut config: Config) -> Config {
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(runtime_output_dir) = self.runtime_output_dir {
            config.runtime_output_dir = runtime_output_dir;
        }
        if let Some(export_table) = self.export_table {
            config.export_table = export_table;
        }
        if let Some(strip_imports) = self.strip_imports {
            config.strip_imports = strip_imports;
        }
        if let Some(on_tool_failure) = self.on_tool_failure {
            config.on_tool_failure = on_tool_failure;
        }
        config.minifier = self.minifier.combine(config.minifier);
        config.prettifier = self.prettifier.combine(config.prettifier);
        config
    }
}

/// Parse a boolean value from string, supporting various common formats
fn parse_bool(value: &str) -> Option<bool> {
    use cow_utils::CowUtils;
    match value.trim().cow_to_lowercase().as_ref() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Resolve every configured target into its ordered file list.
    pub fn resolve_targets(&self) -> Result<Vec<BundleTarget>, ConfigurationError> {
        ManifestResolver::new(&self.fragments, self.strip_imports).resolve_all(&self.targets)
    }

    /// The version store for a project rooted at `root`.
    pub fn version_store(&self, root: &Path) -> VersionStore {
        let files = self
            .version
            .files
            .iter()
            .map(|file| VersionedFile::new(resolve_path(root, &file.path), file.patterns.clone()))
            .collect();
        VersionStore::new(resolve_path(root, &self.version.manifest), files)
    }

    /// Load a single config file from a path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    fn try_load_and_combine<P: AsRef<Path>>(
        config: &mut Self,
        path: P,
        context: &str,
    ) -> Result<()> {
        if path.as_ref().exists() {
            log::debug!("Loading {} from: {:?}", context, path.as_ref());
            let loaded = Self::load_from_file(&path)
                .with_context(|| format!("Failed to load {} from {:?}", context, path.as_ref()))?;
            *config = loaded.combine(config.clone());
        }
        Ok(())
    }

    /// Load configuration with hierarchical precedence:
    /// 1. CLI-provided config path (highest precedence)
    /// 2. Environment variables (SCRIPTPACK_*)
    /// 3. Project config (scriptpack.toml in the project root)
    /// 4. User config (~/.config/scriptpack/scriptpack.toml)
    /// 5. System config (/etc/scriptpack/scriptpack.toml or equivalent)
    /// 6. Default values (lowest precedence)
    pub fn load(root: &Path, cli_config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        for (layer, path) in config_layers(root) {
            Self::try_load_and_combine(&mut config, &path, layer.describe())?;
        }

        config = EnvConfig::from_env().apply_to(config);

        if let Some(cli_config_path) = cli_config_path {
            if !cli_config_path.exists() {
                return Err(anyhow::anyhow!(
                    "Config file does not exist: {:?}",
                    cli_config_path
                ));
            }
            Self::try_load_and_combine(&mut config, cli_config_path, "CLI config")?;
        }

        // Pre-flight: every target must resolve before any file is touched
        config
            .resolve_targets()
            .context("Invalid bundle target configuration")?;

        Ok(config)
    }
}
