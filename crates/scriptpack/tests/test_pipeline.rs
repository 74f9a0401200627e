use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use scriptpack::concat::Concatenator;
use scriptpack::config::{Config, TargetConfig, VersionConfig, VersionedFileConfig};
use scriptpack::emit::ArtifactEmitter;
use scriptpack::error::{BuildWarning, ExternalToolError};
use scriptpack::manifest::{FragmentLibrary, Variant};
use scriptpack::orchestrator::{BuildOptions, BundleOrchestrator};
use scriptpack::version::{BumpScope, SemVer, VersionPattern};

/// Stands in for the external tools: minification collapses every line break.
struct FakeToolchain;

impl ArtifactEmitter for FakeToolchain {
    fn render(&self, text: &str, minify: bool) -> Result<String, ExternalToolError> {
        if minify {
            Ok(text.lines().map(str::trim).collect::<Vec<_>>().join(""))
        } else {
            Ok(text.to_owned())
        }
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn target(name: &str, fragments: &[&str], variants: Vec<Variant>) -> TargetConfig {
    TargetConfig {
        name: name.to_owned(),
        output: None,
        fragments: fragments.iter().map(|f| (*f).to_owned()).collect(),
        variants,
        strip_imports: None,
    }
}

fn library(entries: &[(&str, &[&str])]) -> FragmentLibrary {
    entries
        .iter()
        .map(|(name, files)| {
            (
                (*name).to_owned(),
                files.iter().map(PathBuf::from).collect(),
            )
        })
        .collect()
}

#[test]
fn test_missing_source_is_skipped_with_warning() {
    let project = TempDir::new().unwrap();
    write(project.path(), "src/a.js", "var a = 1;");
    write(project.path(), "src/c.js", "var c = 3;");

    let config = Config {
        fragments: library(&[("core", &["src/a.js", "src/b.js", "src/c.js"])]),
        targets: vec![target("litegraph", &["core"], vec![Variant::Readable])],
        ..Default::default()
    };
    let report = BundleOrchestrator::new(config, project.path())
        .build(&FakeToolchain, &BuildOptions::default())
        .unwrap();

    let expected = Concatenator::new(project.path(), true)
        .concatenate(&[PathBuf::from("src/a.js"), PathBuf::from("src/c.js")])
        .unit
        .into_string();
    assert_eq!(
        fs::read_to_string(project.path().join("build/litegraph.js")).unwrap(),
        expected
    );
    assert_eq!(expected, "var a = 1;\nvar c = 3;\n");

    assert_eq!(report.warnings.len(), 1);
    match &report.warnings[0] {
        BuildWarning::MissingSource { target, error } => {
            assert_eq!(target, "litegraph");
            assert_eq!(error.path, PathBuf::from("src/b.js"));
        }
        other => panic!("unexpected warning: {other}"),
    }
}

#[test]
fn test_full_build_of_shared_fragments() {
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "src/litegraph.js",
        "import { LGraphNode } from \"./nodes.js\";\nexport class LiteGraph {\n    constructor() {\n        this.VERSION = \"1.4.2\";\n    }\n}\n",
    );
    write(
        project.path(),
        "src/nodes.js",
        "export function LGraphNode() {}\n//#if runtime\n// const fs = require(\"fs\");\n//#endif\n",
    );

    let config = Config {
        fragments: library(&[
            ("core", &["src/litegraph.js"]),
            ("nodes", &["src/nodes.js"]),
        ]),
        targets: vec![
            target("litegraph.core", &["core"], Variant::all()),
            TargetConfig {
                output: Some("litegraph".to_owned()),
                ..target("full", &["core", "nodes"], Variant::all())
            },
        ],
        ..Default::default()
    };

    let report = BundleOrchestrator::new(config, project.path())
        .build(&FakeToolchain, &BuildOptions::default())
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.artifacts.len(), 8);

    let read = |path: &str| fs::read_to_string(project.path().join(path)).unwrap();

    // The import line is stripped by default
    assert_eq!(
        read("build/litegraph.js"),
        "export class LiteGraph {\n    constructor() {\n        this.VERSION = \"1.4.2\";\n    }\n}\n\nexport function LGraphNode() {}\n//#if runtime\n// const fs = require(\"fs\");\n//#endif\n\n"
    );
    insta::assert_snapshot!(read("build_node/litegraph.cjs"), @r#"
    class LiteGraph {
        constructor() {
            this.VERSION = "1.4.2";
        }
    }

    function LGraphNode() {}
    //#if runtime
    const fs = require("fs");
    //#endif

    module.exports.LiteGraph = LiteGraph;
    module.exports.LGraphNode = LGraphNode;
    "#);
    assert_eq!(
        read("build/litegraph.core.min.js"),
        "export class LiteGraph {constructor() {this.VERSION = \"1.4.2\";}}"
    );
    assert!(project.path().join("build_node/litegraph.core.min.cjs").exists());
}

#[test]
fn test_target_filter_builds_only_selected_targets() {
    let project = TempDir::new().unwrap();
    write(project.path(), "a.js", "var a;");

    let config = Config {
        fragments: library(&[("core", &["a.js"])]),
        targets: vec![
            target("one", &["core"], vec![Variant::Readable]),
            target("two", &["core"], vec![Variant::Readable]),
        ],
        ..Default::default()
    };
    let options = BuildOptions {
        targets: vec!["two".to_owned()],
        ..Default::default()
    };

    let report = BundleOrchestrator::new(config, project.path())
        .build(&FakeToolchain, &options)
        .unwrap();

    assert_eq!(report.artifacts, vec![project.path().join("build/two.js")]);
}

#[test]
fn test_rebuild_is_reproducible() {
    let project = TempDir::new().unwrap();
    write(project.path(), "a.js", "export class A {}\r\nexport const B = 1;\r\n");

    let config = Config {
        fragments: library(&[("core", &["a.js"])]),
        targets: vec![target("lib", &["core"], Variant::all())],
        ..Default::default()
    };
    let orchestrator = BundleOrchestrator::new(config, project.path());

    orchestrator
        .build(&FakeToolchain, &BuildOptions::default())
        .unwrap();
    let first = fs::read_to_string(project.path().join("build_node/lib.cjs")).unwrap();
    orchestrator
        .build(&FakeToolchain, &BuildOptions::default())
        .unwrap();
    let second = fs::read_to_string(project.path().join("build_node/lib.cjs")).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, "class A {}\nconst B = 1;\n\nmodule.exports.A = A;\n");
}

#[test]
fn test_minor_bump_propagates_to_manifest_and_source() {
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "package.json",
        "{\n  \"name\": \"litegraph.js\",\n  \"version\": \"1.4.2\",\n  \"main\": \"build/litegraph.js\"\n}\n",
    );
    write(
        project.path(),
        "src/litegraph.js",
        "var LiteGraph = (global.LiteGraph = {\n    VERSION = \"1.4.2\",\n});\nthis.VERSION = \"1.4.2\";\n",
    );

    let config = Config {
        version: VersionConfig {
            manifest: PathBuf::from("package.json"),
            files: vec![VersionedFileConfig {
                path: PathBuf::from("src/litegraph.js"),
                patterns: vec![VersionPattern::SourceConstant],
            }],
        },
        ..Default::default()
    };
    let store = config.version_store(project.path());

    let (previous, next, report) = store.bump(BumpScope::Minor).unwrap();

    assert_eq!(previous, SemVer::new(1, 4, 2));
    assert_eq!(next, SemVer::new(1, 5, 0));
    assert!(report.errors.is_empty());
    assert!(report.unmatched.is_empty());
    assert_eq!(
        fs::read_to_string(project.path().join("package.json")).unwrap(),
        "{\n  \"name\": \"litegraph.js\",\n  \"version\": \"1.5.0\",\n  \"main\": \"build/litegraph.js\"\n}\n"
    );
    assert_eq!(
        fs::read_to_string(project.path().join("src/litegraph.js")).unwrap(),
        "var LiteGraph = (global.LiteGraph = {\n    VERSION = \"1.5.0\",\n});\nthis.VERSION = \"1.5.0\";\n"
    );
    assert_eq!(store.current().unwrap(), next);
}

#[test]
fn test_missing_versioned_file_does_not_stop_propagation() {
    let project = TempDir::new().unwrap();
    write(project.path(), "package.json", "{\"version\": \"0.9.9\"}");
    write(project.path(), "src/b.js", "static VERSION = '0.9.9';\n");

    let config = Config {
        version: VersionConfig {
            manifest: PathBuf::from("package.json"),
            files: vec![
                VersionedFileConfig {
                    path: PathBuf::from("src/a.js"),
                    patterns: VersionPattern::ALL.to_vec(),
                },
                VersionedFileConfig {
                    path: PathBuf::from("src/b.js"),
                    patterns: VersionPattern::ALL.to_vec(),
                },
            ],
        },
        ..Default::default()
    };

    let (_, next, report) = config
        .version_store(project.path())
        .bump(BumpScope::Major)
        .unwrap();

    assert_eq!(next.to_string(), "1.0.0");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.updated.len(), 2);
    assert_eq!(
        fs::read_to_string(project.path().join("src/b.js")).unwrap(),
        "static VERSION = '1.0.0';\n"
    );
}
