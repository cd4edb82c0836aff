use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sweetspot_core::{DomainPolicy, EngineConfig};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSweetspotConfig {
    #[serde(default)]
    pub engine: RawEngineConfig,

    #[serde(default)]
    pub display: RawDisplayConfig,
}

/// Engine config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEngineConfig {
    pub max_pending_events: Option<usize>,
    pub info_capacity: Option<usize>,
    pub domain_policy: Option<DomainPolicy>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDisplayConfig {
    pub format: Option<OutputFormat>,
    pub recent_info: Option<usize>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SweetspotConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// How commands print their results
    pub format: OutputFormat,

    /// Info entries shown in summaries
    pub recent_info: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            recent_info: DEFAULT_RECENT_INFO,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Default number of info entries shown in summaries
pub const DEFAULT_RECENT_INFO: usize = 5;
