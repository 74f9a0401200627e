use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::concat::{Concatenator, MergedUnit};
use crate::config::{Config, ToolFailurePolicy};
use crate::emit::{ArtifactEmitter, ArtifactKind, OutputLayout, persist};
use crate::error::BuildWarning;
use crate::manifest::{BundleTarget, Variant, select_targets};
use crate::transform::{ModuleFormatTransformer, apply_regions};

/// Switches for a single build pass.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Do not produce minified artifacts
    pub skip_minify: bool,
    /// Write readable artifacts without running the prettifier
    pub skip_prettify: bool,
    /// Build only these targets; empty builds all of them
    pub targets: Vec<String>,
}

/// Everything a build pass wrote and every non-fatal problem it ran into.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Artifacts written, in build order
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<BuildWarning>,
}

impl BuildReport {
    /// Whether the pass finished without a single warning.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Builds every selected target of a project, one after another.
pub struct BundleOrchestrator {
    config: Config,
    root: PathBuf,
    layout: OutputLayout,
    transformer: ModuleFormatTransformer,
}

impl BundleOrchestrator {
    /// Relative source and output paths are resolved against `root`.
    pub fn new(config: Config, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let layout = OutputLayout::from_config(&config, &root);
        let transformer = ModuleFormatTransformer::new(config.export_table.clone());
        Self {
            config,
            root,
            layout,
            transformer,
        }
    }

    /// Targets selected by `options`, in configuration order.
    ///
    /// Fails on any configuration error, so nothing has been read or written yet.
    pub fn plan(&self, options: &BuildOptions) -> Result<Vec<BundleTarget>> {
        let targets = self
            .config
            .resolve_targets()
            .context("Invalid bundle target configuration")?;
        let targets =
            select_targets(targets, &options.targets).context("Invalid target selection")?;
        Ok(targets)
    }

    /// Main bundling function. Only a configuration error or a failed write stops the pass.
    pub fn build(
        &self,
        emitter: &dyn ArtifactEmitter,
        options: &BuildOptions,
    ) -> Result<BuildReport> {
        let targets = self.plan(options)?;
        info!("Starting build of {} target(s)", targets.len());

        let mut report = BuildReport::default();
        for target in &targets {
            self.build_target(target, emitter, options, &mut report)?;
        }

        info!(
            "Build finished: {} artifact(s) written, {} warning(s)",
            report.artifacts.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    fn build_target(
        &self,
        target: &BundleTarget,
        emitter: &dyn ArtifactEmitter,
        options: &BuildOptions,
        report: &mut BuildReport,
    ) -> Result<()> {
        info!(
            "Building target '{}' from {} file(s)",
            target.name,
            target.files.len()
        );

        let concatenation =
            Concatenator::new(&self.root, target.strip_imports).concatenate(&target.files);
        report
            .warnings
            .extend(
                concatenation
                    .missing
                    .into_iter()
                    .map(|error| BuildWarning::MissingSource {
                        target: target.name.clone(),
                        error,
                    }),
            );
        let unit = concatenation.unit;
        debug!(
            "Target '{}' merged {} byte(s) from {} source(s)",
            target.name,
            unit.as_str().len(),
            unit.sources().len()
        );

        for variant in &target.variants {
            self.build_variant(target, *variant, &unit, emitter, options, report)?;
        }
        Ok(())
    }

    fn build_variant(
        &self,
        target: &BundleTarget,
        variant: Variant,
        unit: &MergedUnit,
        emitter: &dyn ArtifactEmitter,
        options: &BuildOptions,
        report: &mut BuildReport,
    ) -> Result<()> {
        let text = apply_regions(unit.as_str(), variant.flag());

        match variant {
            Variant::Readable => {
                self.emit(target, ArtifactKind::Readable, &text, emitter, options, report)
            }
            Variant::Minified => {
                self.emit(target, ArtifactKind::Minified, &text, emitter, options, report)
            }
            Variant::RuntimeConverted => {
                let conversion = self.transformer.convert_to_assignment_form(&text);
                self.emit(
                    target,
                    ArtifactKind::RuntimeReadable,
                    &conversion.text,
                    emitter,
                    options,
                    report,
                )?;
                self.emit(
                    target,
                    ArtifactKind::RuntimeMinified,
                    &conversion.text,
                    emitter,
                    options,
                    report,
                )
            }
        }
    }

    fn emit(
        &self,
        target: &BundleTarget,
        kind: ArtifactKind,
        text: &str,
        emitter: &dyn ArtifactEmitter,
        options: &BuildOptions,
        report: &mut BuildReport,
    ) -> Result<()> {
        let path = self.layout.artifact_path(&target.output, kind);

        let rendered = if kind.is_minified() {
            if options.skip_minify {
                debug!("Minification disabled, skipping {:?}", path);
                return Ok(());
            }
            emitter.render(text, true)
        } else if options.skip_prettify {
            Ok(text.to_owned())
        } else {
            emitter.render(text, false)
        };

        let output = match rendered {
            Ok(output) => output,
            Err(error) => {
                let fallback = self.config.on_tool_failure == ToolFailurePolicy::Fallback;
                if fallback {
                    warn!("{error}; writing {:?} unprocessed", path);
                } else {
                    warn!("{error}; skipping {:?}", path);
                }
                report.warnings.push(BuildWarning::ExternalTool {
                    artifact: path.clone(),
                    error,
                });
                if !fallback {
                    return Ok(());
                }
                text.to_owned()
            }
        };

        persist(&path, &output)?;
        info!("Wrote {:?}", path);
        report.artifacts.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;
    use crate::error::ExternalToolError;
    use crate::manifest::FragmentLibrary;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    /// Upper-cases minified output and leaves readable output alone.
    struct UppercaseEmitter;

    impl ArtifactEmitter for UppercaseEmitter {
        fn render(&self, text: &str, minify: bool) -> Result<String, ExternalToolError> {
            Ok(if minify {
                text.to_uppercase()
            } else {
                text.to_owned()
            })
        }
    }

    /// Fails every minified render.
    struct BrokenMinifier;

    impl ArtifactEmitter for BrokenMinifier {
        fn render(&self, text: &str, minify: bool) -> Result<String, ExternalToolError> {
            if minify {
                Err(ExternalToolError::Failed {
                    command: "uglifyjs".to_owned(),
                    status: "exit status: 1".to_owned(),
                    stderr: "Unexpected token".to_owned(),
                })
            } else {
                Ok(text.to_owned())
            }
        }
    }

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn config(files: &[&str], variants: Vec<Variant>) -> Config {
        Config {
            fragments: FragmentLibrary::from([(
                "core".to_owned(),
                files.iter().map(PathBuf::from).collect(),
            )]),
            targets: vec![TargetConfig {
                name: "lib".to_owned(),
                output: None,
                fragments: vec!["core".to_owned()],
                variants,
                strip_imports: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_all_variants_are_written() {
        let dir = project(&[("a.js", "export class A {}")]);
        let orchestrator = BundleOrchestrator::new(config(&["a.js"], Variant::all()), dir.path());

        let report = orchestrator
            .build(&UppercaseEmitter, &BuildOptions::default())
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.artifacts.len(), 4);
        let read = |path: &str| fs::read_to_string(dir.path().join(path)).unwrap();
        assert_eq!(read("build/lib.js"), "export class A {}\n");
        assert_eq!(read("build/lib.min.js"), "EXPORT CLASS A {}\n");
        assert_eq!(
            read("build_node/lib.cjs"),
            "class A {}\nmodule.exports.A = A;\n"
        );
        assert_eq!(
            read("build_node/lib.min.cjs"),
            "CLASS A {}\nMODULE.EXPORTS.A = A;\n"
        );
    }

    #[test]
    fn test_skip_minify() {
        let dir = project(&[("a.js", "var a;")]);
        let orchestrator = BundleOrchestrator::new(config(&["a.js"], Variant::all()), dir.path());

        let options = BuildOptions {
            skip_minify: true,
            ..Default::default()
        };
        let report = orchestrator.build(&UppercaseEmitter, &options).unwrap();

        assert_eq!(
            report.artifacts,
            vec![
                dir.path().join("build/lib.js"),
                dir.path().join("build_node/lib.cjs")
            ]
        );
        assert!(!dir.path().join("build/lib.min.js").exists());
    }

    /// Marks readable output as prettified and upper-cases minified output.
    struct PrettifyingEmitter;

    impl ArtifactEmitter for PrettifyingEmitter {
        fn render(&self, text: &str, minify: bool) -> Result<String, ExternalToolError> {
            Ok(if minify {
                text.to_uppercase()
            } else {
                format!("/* pretty */\n{text}")
            })
        }
    }

    #[test]
    fn test_prettifier_runs_on_readable_artifacts() {
        let dir = project(&[("a.js", "export class A {}")]);
        let orchestrator = BundleOrchestrator::new(config(&["a.js"], Variant::all()), dir.path());

        orchestrator
            .build(&PrettifyingEmitter, &BuildOptions::default())
            .unwrap();

        let read = |path: &str| fs::read_to_string(dir.path().join(path)).unwrap();
        assert_eq!(read("build/lib.js"), "/* pretty */\nexport class A {}\n");
        assert_eq!(
            read("build_node/lib.cjs"),
            "/* pretty */\nclass A {}\nmodule.exports.A = A;\n"
        );
    }

    #[test]
    fn test_skip_prettify_writes_raw_readable_text() {
        let dir = project(&[("a.js", "export class A {}")]);
        let orchestrator = BundleOrchestrator::new(config(&["a.js"], Variant::all()), dir.path());
        let options = BuildOptions {
            skip_prettify: true,
            ..Default::default()
        };

        let report = orchestrator.build(&PrettifyingEmitter, &options).unwrap();

        assert_eq!(report.artifacts.len(), 4);
        let read = |path: &str| fs::read_to_string(dir.path().join(path)).unwrap();
        assert_eq!(read("build/lib.js"), "export class A {}\n");
        assert_eq!(
            read("build_node/lib.cjs"),
            "class A {}\nmodule.exports.A = A;\n"
        );
        assert_eq!(read("build/lib.min.js"), "EXPORT CLASS A {}\n");
        assert_eq!(
            read("build_node/lib.min.cjs"),
            "CLASS A {}\nMODULE.EXPORTS.A = A;\n"
        );
    }

    #[test]
    fn test_tool_failure_skips_artifact_by_default() {
        let dir = project(&[("a.js", "var a;")]);
        let orchestrator = BundleOrchestrator::new(
            config(&["a.js"], vec![Variant::Readable, Variant::Minified]),
            dir.path(),
        );

        let report = orchestrator
            .build(&BrokenMinifier, &BuildOptions::default())
            .unwrap();

        assert_eq!(report.artifacts, vec![dir.path().join("build/lib.js")]);
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            &report.warnings[0],
            BuildWarning::ExternalTool { artifact, .. } if artifact.ends_with("lib.min.js")
        ));
    }

    #[test]
    fn test_tool_failure_fallback_writes_unprocessed_text() {
        let dir = project(&[("a.js", "var a;")]);
        let mut config = config(&["a.js"], vec![Variant::Minified]);
        config.on_tool_failure = ToolFailurePolicy::Fallback;
        let orchestrator = BundleOrchestrator::new(config, dir.path());

        let report = orchestrator
            .build(&BrokenMinifier, &BuildOptions::default())
            .unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("build/lib.min.js")).unwrap(),
            "var a;\n"
        );
    }

    #[test]
    fn test_regions_follow_variant() {
        let source = "//#if runtime\n// const os = require(\"os\");\n//#endif\nvar a;\n";
        let dir = project(&[("a.js", source)]);
        let orchestrator = BundleOrchestrator::new(
            config(&["a.js"], vec![Variant::Readable, Variant::RuntimeConverted]),
            dir.path(),
        );
        let options = BuildOptions {
            skip_minify: true,
            ..Default::default()
        };

        orchestrator.build(&UppercaseEmitter, &options).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("build/lib.js")).unwrap(),
            format!("{source}\n")
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("build_node/lib.cjs")).unwrap(),
            "//#if runtime\nconst os = require(\"os\");\n//#endif\nvar a;\n\n"
        );
    }

    #[test]
    fn test_unknown_fragment_fails_before_writing() {
        let dir = project(&[("a.js", "var a;")]);
        let mut config = config(&["a.js"], Variant::all());
        config.targets[0].fragments.push("missing".to_owned());
        let orchestrator = BundleOrchestrator::new(config, dir.path());

        assert!(
            orchestrator
                .build(&UppercaseEmitter, &BuildOptions::default())
                .is_err()
        );
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn test_unknown_target_filter_is_rejected() {
        let dir = project(&[("a.js", "var a;")]);
        let orchestrator = BundleOrchestrator::new(config(&["a.js"], Variant::all()), dir.path());
        let options = BuildOptions {
            targets: vec!["nope".to_owned()],
            ..Default::default()
        };

        let err = orchestrator.plan(&options).unwrap_err();
        assert!(format!("{err:#}").contains("no target named 'nope'"));
    }
}
