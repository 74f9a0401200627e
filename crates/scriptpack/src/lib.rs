pub mod combine;
pub mod concat;
pub mod config;
pub mod dirs;
pub mod emit;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod transform;
pub mod util;
pub mod version;

pub use config::Config;
pub use orchestrator::{BuildOptions, BuildReport, BundleOrchestrator};
