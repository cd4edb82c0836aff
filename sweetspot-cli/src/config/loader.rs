use super::types::{
    DEFAULT_RECENT_INFO, DisplayConfig, RawDisplayConfig, RawEngineConfig, RawSweetspotConfig,
    SweetspotConfig,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use sweetspot_core::EngineConfig;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<SweetspotConfig> {
        Self::load_from_paths(&Self::user_config_path(), &Self::project_config_path())
    }

    /// Load and merge the given layers; missing files are skipped
    pub fn load_from_paths(user: &Path, project: &Path) -> Result<SweetspotConfig> {
        let mut raw = RawSweetspotConfig::default();

        // Layer 1: User config
        if let Some(user_config) = Self::read_layer(user)? {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_layer(project)? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/sweetspot/config.toml`)
    pub fn user_config_path() -> PathBuf {
        sweetspot_paths::user_config_file()
    }

    /// Get project config path
    /// Can be overridden with SWEETSPOT_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        sweetspot_paths::project_config_file()
    }

    fn read_layer(path: &Path) -> Result<Option<RawSweetspotConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        debug!(path = %path.display(), "loading config layer");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(Some(config))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawSweetspotConfig, overlay: RawSweetspotConfig) -> RawSweetspotConfig {
        RawSweetspotConfig {
            engine: RawEngineConfig {
                max_pending_events: overlay
                    .engine
                    .max_pending_events
                    .or(base.engine.max_pending_events),
                info_capacity: overlay.engine.info_capacity.or(base.engine.info_capacity),
                domain_policy: overlay.engine.domain_policy.or(base.engine.domain_policy),
            },
            display: RawDisplayConfig {
                format: overlay.display.format.or(base.display.format),
                recent_info: overlay.display.recent_info.or(base.display.recent_info),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawSweetspotConfig) -> SweetspotConfig {
        let defaults = EngineConfig::default();
        SweetspotConfig {
            engine: EngineConfig {
                max_pending_events: raw
                    .engine
                    .max_pending_events
                    .unwrap_or(defaults.max_pending_events),
                info_capacity: raw.engine.info_capacity.unwrap_or(defaults.info_capacity),
                domain_policy: raw.engine.domain_policy.unwrap_or(defaults.domain_policy),
            },
            display: DisplayConfig {
                format: raw.display.format.unwrap_or_default(),
                recent_info: raw.display.recent_info.unwrap_or(DEFAULT_RECENT_INFO),
            },
        }
    }
}
