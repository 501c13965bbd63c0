//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::api::{DeployerApi, HttpDeployerApi, HttpIndexer, IndexerTrigger};
use crate::chain::{JsonRpcClient, RpcChain, RpcWallet};
use crate::config::{AutosubConfig, ConfigScope, ConfigStore, Settings, merge_configs};
use crate::notify::Notifier;
use crate::orchestration::{Collaborators, Deployer};

/// Unified application context for dependency injection.
///
/// Frontends create this once and pass it to commands. Services are built
/// from resolved [`Settings`] on demand.
#[derive(Debug, Clone)]
pub struct AppContext {
    project_root: PathBuf,
    global_config_dir: PathBuf,
}

impl AppContext {
    /// Context for `project_root` with the default global config directory.
    pub fn new(project_root: PathBuf) -> anyhow::Result<Self> {
        let global_config_dir = crate::config::default_global_dir()?;
        Ok(Self {
            project_root,
            global_config_dir,
        })
    }

    /// Context rooted at the current working directory.
    pub fn from_current_dir() -> anyhow::Result<Self> {
        let project_root =
            std::env::current_dir().context("Failed to determine current directory")?;
        Self::new(project_root)
    }

    /// Create context with custom global config directory (for testing).
    pub fn with_global_config_dir(project_root: PathBuf, global_config_dir: PathBuf) -> Self {
        Self {
            project_root,
            global_config_dir,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn global_config_dir(&self) -> &Path {
        &self.global_config_dir
    }

    /// Get a ConfigStore for the given scope.
    pub fn config_store(&self, scope: ConfigScope) -> ConfigStore {
        ConfigStore::from_paths(scope, &self.global_config_dir, &self.project_root)
    }

    /// Global and project configuration merged.
    pub fn load_config(&self) -> anyhow::Result<AutosubConfig> {
        let global = self.config_store(ConfigScope::Global).load()?;
        let project = self.config_store(ConfigScope::Project).load()?;
        Ok(merge_configs(Some(global), Some(project)))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.load_config()?
            .resolve()
            .context("Invalid configuration")
    }

    pub fn deployer_api(&self, settings: &Settings) -> anyhow::Result<Arc<dyn DeployerApi>> {
        let api = HttpDeployerApi::new(
            settings.api_url.clone(),
            settings.api_key.clone(),
            settings.request_timeout,
        )?;
        Ok(Arc::new(api))
    }

    pub fn chain(&self, settings: &Settings) -> anyhow::Result<Arc<RpcChain>> {
        let rpc = JsonRpcClient::new(settings.require_rpc_url()?.clone(), settings.request_timeout)?;
        Ok(Arc::new(RpcChain::new(rpc)))
    }

    /// Wallet endpoint. Signature prompts can take a while, so requests to it
    /// are not bounded by `request_timeout_secs`.
    pub fn wallet(&self, settings: &Settings) -> anyhow::Result<Arc<RpcWallet>> {
        let rpc = JsonRpcClient::new(
            settings.require_wallet_rpc_url()?.clone(),
            WALLET_REQUEST_TIMEOUT,
        )?;
        Ok(Arc::new(RpcWallet::new(rpc)))
    }

    pub fn indexer(&self, settings: &Settings) -> anyhow::Result<Option<Arc<dyn IndexerTrigger>>> {
        let Some(url) = &settings.indexer_url else {
            return Ok(None);
        };
        let indexer = HttpIndexer::new(
            url.clone(),
            settings.indexer_api_key.clone(),
            settings.request_timeout,
        )?;
        Ok(Some(Arc::new(indexer)))
    }

    /// Deployer wired to the configured HTTP and JSON-RPC services.
    pub fn deployer(
        &self,
        settings: &Settings,
        wallet: Arc<RpcWallet>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Deployer> {
        let mut services = Collaborators::new(
            self.deployer_api(settings)?,
            self.chain(settings)?,
            wallet,
        )
        .with_notifier(notifier);
        if let Some(indexer) = self.indexer(settings)? {
            services = services.with_indexer(indexer);
        }
        Ok(Deployer::new(Arc::new(settings.deploy_settings()?), services))
    }
}

const WALLET_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(600);
