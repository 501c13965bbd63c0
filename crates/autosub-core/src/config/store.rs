//! Config store for loading and saving autosub.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{AutosubConfig, ConfigScope, parser, paths};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    scope: ConfigScope,
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_scope(scope: ConfigScope) -> anyhow::Result<Self> {
        let global_dir = paths::default_global_dir()?;
        let project_root = std::env::current_dir()?;

        Ok(Self::from_paths(scope, &global_dir, &project_root))
    }

    pub fn from_paths(scope: ConfigScope, global_dir: &Path, project_root: &Path) -> Self {
        Self {
            scope,
            config_path: paths::config_path_for_scope(scope, global_dir, project_root),
        }
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Load this scope; a missing file is an empty configuration.
    pub fn load(&self) -> anyhow::Result<AutosubConfig> {
        if !self.config_path.exists() {
            return Ok(AutosubConfig::new());
        }
        parser::parse_autosub_toml(&self.config_path)
    }

    pub fn save(&self, config: &AutosubConfig) -> anyhow::Result<()> {
        config.validate().context("Refusing to save invalid config")?;
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!("Failed to write config file: {}", self.config_path.display())
        })?;
        tracing::debug!(path = %self.config_path.display(), "config saved");
        Ok(())
    }
}
