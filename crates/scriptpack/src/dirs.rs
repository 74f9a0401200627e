use std::env;
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;

/// Directory holding `scriptpack.toml` under the user and system config roots.
pub const CONFIG_DIR: &str = "scriptpack";

/// Name of every configuration file: system, user, and project.
pub const CONFIG_FILE: &str = "scriptpack.toml";

/// Where a configuration layer comes from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    System,
    User,
    Project,
}

impl ConfigLayer {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::System => "system config",
            Self::User => "user config",
            Self::Project => "project config",
        }
    }
}

/// The user configuration file, e.g. `~/.config/scriptpack/scriptpack.toml` on Linux and
/// `%APPDATA%\scriptpack\scriptpack.toml` on Windows.
pub fn user_config_file() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join(CONFIG_DIR).join(CONFIG_FILE))
}

/// `scriptpack.toml` at the root of the project being bundled.
pub fn project_config_file(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// First existing `<dir>/scriptpack/scriptpack.toml` among the colon-separated `dirs`,
/// defaulting to `/etc/xdg` when unset or empty.
#[cfg(not(windows))]
fn find_in_xdg_dirs(dirs: Option<&str>) -> Option<PathBuf> {
    dirs.filter(|value| !value.is_empty())
        .unwrap_or("/etc/xdg")
        .split(':')
        .take_while(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(CONFIG_DIR).join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

#[cfg(windows)]
fn find_in_program_data(system_drive: &Path) -> Option<PathBuf> {
    let candidate = system_drive
        .join("ProgramData")
        .join(CONFIG_DIR)
        .join(CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

/// The system configuration file.
///
/// On Unix-like systems, searches `XDG_CONFIG_DIRS` and then `/etc/scriptpack/scriptpack.toml`.
/// On Windows, uses `%SYSTEMDRIVE%\ProgramData\scriptpack\scriptpack.toml`.
pub fn system_config_file() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        let drive = env::var_os("SYSTEMDRIVE")?;
        find_in_program_data(Path::new(&drive))
    }

    #[cfg(not(windows))]
    {
        let xdg_config_dirs = env::var("XDG_CONFIG_DIRS").ok();
        find_in_xdg_dirs(xdg_config_dirs.as_deref()).or_else(|| {
            let candidate = Path::new("/etc").join(CONFIG_DIR).join(CONFIG_FILE);
            match candidate.try_exists() {
                Ok(exists) => exists.then_some(candidate),
                Err(err) => {
                    log::warn!("Failed to query system configuration file: {err}");
                    None
                }
            }
        })
    }
}

/// Candidate configuration files for `root`, lowest precedence first. Candidates may not exist.
pub fn config_layers(root: &Path) -> Vec<(ConfigLayer, PathBuf)> {
    let mut layers = Vec::with_capacity(3);
    if let Some(path) = system_config_file() {
        layers.push((ConfigLayer::System, path));
    }
    if let Some(path) = user_config_file() {
        layers.push((ConfigLayer::User, path));
    }
    layers.push((ConfigLayer::Project, project_config_file(root)));
    layers
}
