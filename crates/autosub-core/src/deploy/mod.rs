//! Deployment steps.
//!
//! Each step is a small struct holding its collaborators behind trait
//! objects. Steps read prerequisites from and record results into the
//! [`DeploymentSession`] they are handed; lifecycle status transitions are
//! left to the orchestrator.

pub mod address;
pub mod draft;
pub mod funding;
pub mod permission;
pub mod poller;
pub mod precompute;
pub mod signature;
pub mod submit;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::DeployRequest;
use crate::error::{DeployError, Result};
use crate::notify::{Notice, Notifier};
use crate::policy::{AutomationPolicy, DraftParams, FundingInput, RewardSchedule, split_funding};
use crate::session::DeploymentSession;
use crate::types::{Address, ChainId, U256};

pub use address::AddressResolver;
pub use draft::DraftBuilder;
pub use funding::{BalanceGate, FundingOutcome};
pub use permission::PermissionGuard;
pub use poller::{PollEvent, PollHandle, StatusPoller};
pub use precompute::AddressPrecomputer;
pub use signature::{SignatureCollector, SignatureOutcome};
pub use submit::DeploymentSubmitter;

/// Token-input sentinel the service expects in the default policy.
pub const DEFAULT_INPUT_TOKEN: Address =
    alloy_primitives::address!("CeeeeCeeeCeCeeCeCeCeeCCCeeeeCeeeeeeeCCeC");

/// Where the permission guard runs relative to submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToggleMode {
    /// Grant operator permission before submitting the deployment.
    #[default]
    BeforeDeploy,
    /// Grant operator permission once the deployment task succeeded.
    Lazy,
}

impl fmt::Display for ToggleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleMode::BeforeDeploy => f.write_str("before-deploy"),
            ToggleMode::Lazy => f.write_str("lazy"),
        }
    }
}

impl FromStr for ToggleMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "before-deploy" => Ok(ToggleMode::BeforeDeploy),
            "lazy" => Ok(ToggleMode::Lazy),
            other => Err(format!(
                "unknown toggle mode '{other}' (expected 'before-deploy' or 'lazy')"
            )),
        }
    }
}

/// Read-only settings shared by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub chain_id: ChainId,
    pub fee_token: Address,
    pub registry_id: String,
    /// Contract exposing `operators` / `toggleOperator`.
    pub operator_contract: Address,
    pub reward_token: Address,
    pub reward_interval: u64,
    pub reward_token_limit: U256,
    pub explorer_url: Url,
    pub poll_interval: Duration,
    /// `None` polls until a terminal status.
    pub poll_timeout: Option<Duration>,
    pub toggle_mode: ToggleMode,
}

impl DeploySettings {
    /// Default automation policy: unbounded duration, reward-token spend cap.
    pub fn default_policy(&self) -> AutomationPolicy {
        AutomationPolicy::unbounded()
            .with_input(DEFAULT_INPUT_TOKEN, U256::ZERO)
            .with_limit(self.reward_token, self.reward_token_limit)
    }

    pub fn reward_schedule(&self, beneficiary: Address) -> RewardSchedule {
        RewardSchedule {
            every: self.reward_interval,
            user_address: beneficiary,
            reward_token: self.reward_token,
        }
    }

    /// Draft parameters for `owner` using the configured policy and schedule.
    pub fn draft_params(&self, owner: Address, funding: Vec<FundingInput>) -> DraftParams {
        DraftParams {
            funding,
            policy: self.default_policy(),
            schedule: self.reward_schedule(owner),
        }
    }
}

/// Emit an error notice for a failed step result.
pub(crate) fn notify_failure<T>(
    notifier: &dyn Notifier,
    notice_id: &str,
    result: Result<T>,
) -> Result<T> {
    if let Err(err) = &result {
        notifier.notify(Notice::error(notice_id, err.to_string()));
    }
    result
}

/// Body for address resolution and deployment.
///
/// Refuses to build without both the wallet signature and the fee-quote
/// signature.
pub(crate) fn deploy_request(
    session: &DeploymentSession,
    registry_id: &str,
) -> Result<DeployRequest> {
    let draft = session
        .draft()
        .ok_or(DeployError::MissingPrerequisite("subscription draft"))?;
    let quote = session
        .quote()
        .ok_or(DeployError::MissingPrerequisite("fee quote"))?;
    let signature = session
        .signature()
        .ok_or(DeployError::MissingPrerequisite("wallet signature"))?;
    if quote.signature().is_empty() {
        return Err(DeployError::MissingPrerequisite("fee quote signature"));
    }

    let (tokens, amounts) = split_funding(&draft.params.funding);
    Ok(DeployRequest {
        owner: session.owner(),
        chain_id: session.chain_id(),
        registry_id: registry_id.to_string(),
        subscription_draft_id: draft.draft_id.clone(),
        sub_account_policy_commit: draft.policy_commit.clone(),
        fee_token: session.fee_token(),
        tokens,
        amounts,
        sub_account_chainer_signature: signature.clone(),
        fee_estimate_signature: quote.signature().to_string(),
        fee_estimate: quote.amount(),
        metadata: draft.params.schedule.clone(),
    })
}
