//! Config command implementation.
//!
//! Reads and edits scalar keys of autosub.toml in a single scope.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{CONFIG_KEYS, ConfigScope};
use crate::context::AppContext;

/// Keys whose values are masked when listed.
const SECRET_KEYS: &[&str] = &["api_key", "indexer_api_key"];

/// One key of a config listing
#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Option<String>,
}

/// Result of a config operation
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub scope: ConfigScope,
    pub path: PathBuf,
    /// Whether the file was modified
    pub changed: bool,
    pub entries: Vec<ConfigEntry>,
}

pub struct ConfigCommand {
    ctx: AppContext,
}

impl ConfigCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Value of `key` in `scope`; `None` when the scope leaves it unset.
    pub fn get(&self, scope: ConfigScope, key: &str) -> anyhow::Result<ConfigReport> {
        let store = self.ctx.config_store(scope);
        let value = store.load()?.get(key)?;
        Ok(ConfigReport {
            scope,
            path: store.config_path().to_path_buf(),
            changed: false,
            entries: vec![ConfigEntry {
                key: key.to_string(),
                value,
            }],
        })
    }

    pub fn set(&self, scope: ConfigScope, key: &str, value: &str) -> anyhow::Result<ConfigReport> {
        let store = self.ctx.config_store(scope);
        let mut config = store.load()?;
        let previous = config.get(key)?;
        config.set(key, value)?;
        let current = config.get(key)?;
        let changed = previous != current;
        if changed {
            store.save(&config)?;
        }
        Ok(ConfigReport {
            scope,
            path: store.config_path().to_path_buf(),
            changed,
            entries: vec![ConfigEntry {
                key: key.to_string(),
                value: current,
            }],
        })
    }

    pub fn unset(&self, scope: ConfigScope, key: &str) -> anyhow::Result<ConfigReport> {
        let store = self.ctx.config_store(scope);
        let mut config = store.load()?;
        let changed = config.unset(key)?;
        if changed {
            store.save(&config)?;
        }
        Ok(ConfigReport {
            scope,
            path: store.config_path().to_path_buf(),
            changed,
            entries: vec![ConfigEntry {
                key: key.to_string(),
                value: None,
            }],
        })
    }

    /// Every known key in `scope`, secrets masked.
    pub fn show(&self, scope: ConfigScope) -> anyhow::Result<ConfigReport> {
        let store = self.ctx.config_store(scope);
        let config = store.load()?;
        let entries = CONFIG_KEYS
            .iter()
            .map(|key| {
                let value = config.get(key)?.map(|value| {
                    if SECRET_KEYS.contains(key) {
                        mask(&value)
                    } else {
                        value
                    }
                });
                Ok(ConfigEntry {
                    key: key.to_string(),
                    value,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(ConfigReport {
            scope,
            path: store.config_path().to_path_buf(),
            changed: false,
            entries,
        })
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
