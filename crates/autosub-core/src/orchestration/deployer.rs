//! Factory for deployment sessions sharing one set of collaborators.

use std::sync::Arc;

use crate::api::{DeployerApi, IndexerTrigger};
use crate::chain::{ChainReader, WalletProvider};
use crate::deploy::{
    AddressPrecomputer, AddressResolver, BalanceGate, DeploySettings, DeploymentSubmitter,
    DraftBuilder, PermissionGuard, SignatureCollector, StatusPoller,
};
use crate::notify::{Notifier, TracingNotifier};
use crate::session::DeploymentSession;
use crate::types::{Address, ChainId};

use super::orchestrator::DeploymentOrchestrator;

/// External services a [`Deployer`] talks to.
pub struct Collaborators {
    pub api: Arc<dyn DeployerApi>,
    pub chain: Arc<dyn ChainReader>,
    pub wallet: Arc<dyn WalletProvider>,
    pub indexer: Option<Arc<dyn IndexerTrigger>>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    pub fn new(
        api: Arc<dyn DeployerApi>,
        chain: Arc<dyn ChainReader>,
        wallet: Arc<dyn WalletProvider>,
    ) -> Self {
        Self {
            api,
            chain,
            wallet,
            indexer: None,
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn IndexerTrigger>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// The step components, built once and shared by every session.
pub(crate) struct DeploySteps {
    pub precomputer: AddressPrecomputer,
    pub gate: BalanceGate,
    pub drafts: DraftBuilder,
    pub signatures: SignatureCollector,
    pub addresses: AddressResolver,
    pub guard: PermissionGuard,
    pub submitter: DeploymentSubmitter,
    pub poller: StatusPoller,
}

/// Creates [`DeploymentOrchestrator`]s. Cheap to clone.
#[derive(Clone)]
pub struct Deployer {
    settings: Arc<DeploySettings>,
    steps: Arc<DeploySteps>,
}

impl Deployer {
    pub fn new(settings: Arc<DeploySettings>, services: Collaborators) -> Self {
        let Collaborators {
            api,
            chain,
            wallet,
            indexer,
            notifier,
        } = services;
        let registry_id = settings.registry_id.clone();

        let mut poller = StatusPoller::new(
            api.clone(),
            notifier.clone(),
            settings.explorer_url.clone(),
            settings.chain_id,
        )
        .with_interval(settings.poll_interval)
        .with_timeout(settings.poll_timeout);
        if let Some(indexer) = indexer {
            poller = poller.with_indexer(indexer);
        }

        let steps = DeploySteps {
            precomputer: AddressPrecomputer::new(api.clone(), notifier.clone()),
            gate: BalanceGate::new(chain.clone(), wallet.clone(), notifier.clone()),
            drafts: DraftBuilder::new(api.clone(), notifier.clone(), registry_id.clone()),
            signatures: SignatureCollector::new(wallet.clone(), notifier.clone()),
            addresses: AddressResolver::new(api.clone(), notifier.clone(), registry_id.clone()),
            guard: PermissionGuard::new(chain, wallet, notifier.clone(), settings.operator_contract),
            submitter: DeploymentSubmitter::new(api, notifier, registry_id),
            poller,
        };

        Self {
            settings,
            steps: Arc::new(steps),
        }
    }

    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    pub fn poller(&self) -> &StatusPoller {
        &self.steps.poller
    }

    /// Session for `owner` on the configured chain and fee token.
    pub fn session(&self, owner: Address) -> DeploymentOrchestrator {
        self.session_for(owner, self.settings.chain_id, self.settings.fee_token)
    }

    pub fn session_for(
        &self,
        owner: Address,
        chain_id: ChainId,
        fee_token: Address,
    ) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(
            DeploymentSession::new(owner, chain_id, fee_token),
            self.steps.clone(),
            self.settings.toggle_mode,
        )
    }
}
