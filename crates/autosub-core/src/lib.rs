//! Autosub Core Library
//!
//! Deploys automation subscriptions: precomputes the sub-account address,
//! funds it, collects the owner's typed-data signature, grants the operator
//! permission and follows the deployment task until it settles.

pub mod api;
pub mod assets;
pub mod chain;
pub mod commands;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod notify;
pub mod orchestration;
pub mod policy;
pub mod session;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{AutosubConfig, ConfigScope, ConfigStore, Settings};
    pub use crate::context::AppContext;

    // Remote services
    pub use crate::api::{DeployerApi, HttpDeployerApi, HttpIndexer, IndexerTrigger};
    pub use crate::chain::{ChainReader, RpcChain, RpcWallet, WalletProvider};

    // Deployment
    pub use crate::deploy::{DeploySettings, ToggleMode};
    pub use crate::error::{DeployError, ErrorClass};
    pub use crate::notify::{Notice, NoticeKind, Notifier, TracingNotifier};
    pub use crate::orchestration::{Collaborators, Deployer, DeploymentOrchestrator, SessionOutcome};
    pub use crate::policy::{DraftParams, FundingInput};
    pub use crate::session::{DeploymentSession, SessionStatus};

    // Chain types
    pub use crate::types::{Address, B256, Bytes, ChainId, TaskStatus, U256};
}
