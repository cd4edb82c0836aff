//! XDG Base Directory paths for sweetspot.
//!
//! The CLI resolves XDG paths on every platform rather than platform-native
//! locations, so a config written on Linux works unchanged on macOS.

use std::path::PathBuf;

const APP: &str = "sweetspot";

/// Environment variable that overrides the project config directory.
pub const PROJECT_CONFIG_DIR_ENV: &str = "SWEETSPOT_PROJECT_CONFIG_DIR";

/// Name of the config file inside either config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Get the sweetspot user config directory.
///
/// Returns `$XDG_CONFIG_HOME/sweetspot` if set, otherwise
/// `~/.config/sweetspot`.
///
/// # Examples
///
/// ```
/// use sweetspot_paths::config_dir;
///
/// let config = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join(APP)
    } else {
        PathBuf::from(".config").join(APP)
    }
}

/// Get the project config directory.
///
/// Returns `$SWEETSPOT_PROJECT_CONFIG_DIR` if set, otherwise `.sweetspot`
/// relative to the working directory.
pub fn project_config_dir() -> PathBuf {
    std::env::var(PROJECT_CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(format!(".{APP}")))
}

/// User config file path.
pub fn user_config_file() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Project config file path.
pub fn project_config_file() -> PathBuf {
    project_config_dir().join(CONFIG_FILE)
}
