//! Deploy command implementation.
//!
//! Drives one full deployment session: precompute, fund, draft, sign,
//! resolve, toggle permission, submit and poll until the task settles.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::deploy::ToggleMode;
use crate::notify::{Notifier, TracingNotifier};
use crate::orchestration::SessionOutcome;
use crate::policy::FundingInput;
use crate::session::{DeploymentSession, PermissionGrant, SessionStatus};
use crate::types::{Address, B256, ChainId, TaskStatus};

/// Options for a deployment
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Subscription owner (None = first wallet account)
    pub owner: Option<Address>,
    /// Tokens deposited into the sub-account at deployment
    pub funding: Vec<FundingInput>,
    /// Toggle mode override (None = configured mode)
    pub toggle_mode: Option<ToggleMode>,
}

impl DeployOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_funding(mut self, input: FundingInput) -> Self {
        self.funding.push(input);
        self
    }

    pub fn with_toggle_mode(mut self, mode: ToggleMode) -> Self {
        self.toggle_mode = Some(mode);
        self
    }
}

/// Result of a deployment session that ran to completion or was declined
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub owner: Address,
    pub chain_id: ChainId,
    #[serde(flatten)]
    pub outcome: SessionOutcome,
    pub status: SessionStatus,
    /// Precomputed console address
    pub target: Option<Address>,
    /// Resolved sub-account address
    pub sub_account: Option<Address>,
    pub permission: Option<PermissionGrant>,
    pub task_status: Option<TaskStatus>,
}

impl DeployReport {
    pub fn task_id(&self) -> Option<&str> {
        match &self.outcome {
            SessionOutcome::Succeeded { task_id, .. } => Some(task_id),
            SessionOutcome::Declined => None,
        }
    }

    pub fn tx_hash(&self) -> Option<B256> {
        match &self.outcome {
            SessionOutcome::Succeeded { tx_hash, .. } => *tx_hash,
            SessionOutcome::Declined => None,
        }
    }

    pub fn explorer_url(&self) -> Option<&str> {
        match &self.outcome {
            SessionOutcome::Succeeded { explorer_url, .. } => explorer_url.as_deref(),
            SessionOutcome::Declined => None,
        }
    }
}

/// Error context for a failed run.
///
/// A lazy permission toggle can fail after the task already succeeded; the
/// deployment is live then, so the context names where to find it.
fn failure_context(owner: Address, session: &DeploymentSession) -> String {
    if session.status() != SessionStatus::Succeeded {
        return format!(
            "Deployment for {} failed (session {})",
            owner,
            session.status()
        );
    }

    let mut message = format!("Deployment for {owner} succeeded but a follow-up step failed");
    if let Some(task_id) = session.task_id() {
        message.push_str(&format!(" (task {task_id}"));
        if let Some(tx_hash) = session.tx_hash() {
            message.push_str(&format!(", tx {tx_hash}"));
        }
        message.push(')');
    }
    if let Some(url) = session.explorer_url() {
        message.push_str(&format!("; explorer: {url}"));
    }
    message
}

/// Deploy command orchestrator
pub struct DeployCommand {
    ctx: AppContext,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
}

impl DeployCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            notifier: Arc::new(TracingNotifier),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Cancelling `token` resets the running session.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn execute(&self, options: &DeployOptions) -> anyhow::Result<DeployReport> {
        let mut settings = self.ctx.settings()?;
        if let Some(mode) = options.toggle_mode {
            settings.toggle_mode = mode;
        }

        let wallet = self.ctx.wallet(&settings)?;
        let owner = match options.owner {
            Some(owner) => owner,
            None => super::first_account(&wallet).await?,
        };
        let deployer = self.ctx.deployer(&settings, wallet, self.notifier.clone())?;
        let params = deployer
            .settings()
            .draft_params(owner, options.funding.clone());

        tracing::info!(
            %owner,
            chain_id = settings.chain_id,
            toggle_mode = %settings.toggle_mode,
            "starting deployment session"
        );

        let mut orchestrator = deployer.session(owner);
        let reset = orchestrator.reset_token();
        let external = self.cancel.clone();
        let relay = tokio::spawn(async move {
            tokio::select! {
                _ = external.cancelled() => reset.cancel(),
                _ = reset.cancelled() => {}
            }
        });

        let result = orchestrator.run(params).await;
        relay.abort();

        let session = orchestrator.session();
        let outcome = result.with_context(|| failure_context(owner, session))?;

        Ok(DeployReport {
            owner,
            chain_id: session.chain_id(),
            outcome,
            status: session.status(),
            target: session.target(),
            sub_account: session.sub_account(),
            permission: session.permission(),
            task_status: session.task_status(),
        })
    }
}
