//! Configuration management
//!
//! Two scopes are layered:
//! - Global: `<config dir>/autosub/autosub.toml`
//! - Project: `./autosub.toml`, overriding global values

pub mod merge;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use merge::merge_configs;
pub use parser::{parse_autosub_toml, parse_autosub_toml_str, to_toml};
pub use paths::{CONFIG_FILE_NAME, config_path_for_scope, default_global_dir};
pub use schema::{AutosubConfig, CONFIG_KEYS, Settings};
pub use store::ConfigStore;

/// Configuration scope levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    /// User-wide configuration
    Global,
    /// Configuration in the current project directory
    Project,
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Global => f.write_str("global"),
            ConfigScope::Project => f.write_str("project"),
        }
    }
}

impl FromStr for ConfigScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(ConfigScope::Global),
            "project" => Ok(ConfigScope::Project),
            other => anyhow::bail!("Unknown config scope '{}' (expected global or project)", other),
        }
    }
}
