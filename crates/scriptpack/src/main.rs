use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{debug, info, warn};
use std::path::PathBuf;

use scriptpack::config::Config;
use scriptpack::emit::ToolchainEmitter;
use scriptpack::orchestrator::{BuildOptions, BundleOrchestrator};
use scriptpack::version::BumpScope;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root; relative paths in the configuration are resolved against it
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Build only this target (can be repeated)
    #[arg(short, long = "target", value_name = "NAME")]
    targets: Vec<String>,

    /// Do not produce minified artifacts
    #[arg(long)]
    no_minify: bool,

    /// Write readable artifacts without running the prettifier
    #[arg(long)]
    no_prettify: bool,

    /// Increment the project version before building
    #[arg(long)]
    bump: bool,

    /// Version component to increment with --bump
    #[arg(long, value_enum, default_value_t = Scope::Patch)]
    scope: Scope,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scope {
    Patch,
    Minor,
    Major,
}

impl From<Scope> for BumpScope {
    fn from(value: Scope) -> Self {
        match value {
            Scope::Patch => BumpScope::Patch,
            Scope::Minor => BumpScope::Minor,
            Scope::Major => BumpScope::Major,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let log_level = match cli.verbose {
        0 => "warn",  // Default: warnings and errors only
        1 => "info",  // -v: informational messages
        2 => "debug", // -vv: debug messages
        _ => "trace", // -vvv or more: trace messages
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    debug!(
        "Verbosity level: {} (log level: {})",
        cli.verbose, log_level
    );
    info!("Starting scriptpack in {:?}", cli.root);

    let config = Config::load(&cli.root, cli.config.as_deref())?;
    debug!("Configuration: {:?}", config);

    let options = BuildOptions {
        skip_minify: cli.no_minify,
        skip_prettify: cli.no_prettify,
        targets: cli.targets,
    };
    let store = config.version_store(&cli.root);
    let emitter = ToolchainEmitter::from_config(&config);
    let orchestrator = BundleOrchestrator::new(config, &cli.root);

    // Target selection must be valid before the version files are touched
    orchestrator.plan(&options)?;

    let mut warnings = Vec::new();

    if cli.bump {
        let (previous, next, propagation) = store
            .bump(cli.scope.into())
            .context("Failed to bump the project version")?;
        info!(
            "Version {} -> {}: {} file(s) updated",
            previous,
            next,
            propagation.updated.len()
        );
        warnings.extend(propagation.errors.iter().map(ToString::to_string));
        warnings.extend(
            propagation
                .unmatched
                .iter()
                .map(|path| format!("no version string found in {:?}", path)),
        );
        println!("{next}");
    }

    let report = orchestrator.build(&emitter, &options)?;

    for artifact in &report.artifacts {
        info!("Artifact: {:?}", artifact);
    }
    warnings.extend(report.warnings.iter().map(|warning| warning.to_string()));

    if !warnings.is_empty() {
        warn!("Finished with {} warning(s):", warnings.len());
        for warning in &warnings {
            warn!("  {warning}");
        }
    }

    Ok(())
}
