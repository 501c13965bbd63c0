//! Per-deployment session state.
//!
//! A [`DeploymentSession`] is owned by one orchestrator and handed to each step
//! by `&mut`. Fields are append-only: once a value is recorded it is only
//! cleared by [`DeploymentSession::reset`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{Precomputed, SubscriptionDraft};
use crate::error::{DeployError, Result};
use crate::types::{Address, B256, Bytes, ChainId, TaskStatus, U256};

/// Lifecycle of a deployment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Idle,
    Precomputing,
    AwaitingSignature,
    TogglingPermission,
    Submitting,
    Polling,
    Succeeded,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Succeeded | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Precomputing => "precomputing",
            SessionStatus::AwaitingSignature => "awaiting-signature",
            SessionStatus::TogglingPermission => "toggling-permission",
            SessionStatus::Submitting => "submitting",
            SessionStatus::Polling => "polling",
            SessionStatus::Succeeded => "succeeded",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Fee amount plus the backend signature authorizing it.
///
/// A quote is bound to the owner/chain/fee-token triple it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    owner: Address,
    chain_id: ChainId,
    fee_token: Address,
    amount: U256,
    signature: String,
}

impl FeeQuote {
    pub fn new(
        owner: Address,
        chain_id: ChainId,
        fee_token: Address,
        amount: U256,
        signature: String,
    ) -> Self {
        Self {
            owner,
            chain_id,
            fee_token,
            amount,
            signature,
        }
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn is_scoped_to(&self, owner: Address, chain_id: ChainId, fee_token: Address) -> bool {
        self.owner == owner && self.chain_id == chain_id && self.fee_token == fee_token
    }

    pub fn ensure_scope(&self, owner: Address, chain_id: ChainId, fee_token: Address) -> Result<()> {
        if self.is_scoped_to(owner, chain_id, fee_token) {
            Ok(())
        } else {
            Err(DeployError::QuoteScopeMismatch)
        }
    }
}

/// Outcome of the permission guard for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionGrant {
    /// Permission was already present on-chain.
    AlreadyGranted,
    /// Permission was granted by this session's toggle transaction.
    Granted { tx_hash: B256 },
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSession {
    owner: Address,
    chain_id: ChainId,
    fee_token: Address,
    status: SessionStatus,
    precomputed: Option<Precomputed>,
    funded: bool,
    draft: Option<SubscriptionDraft>,
    signature: Option<Bytes>,
    sub_account: Option<Address>,
    permission: Option<PermissionGrant>,
    submission_attempts: u32,
    task_id: Option<String>,
    task_status: Option<TaskStatus>,
    tx_hash: Option<B256>,
    explorer_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl DeploymentSession {
    pub fn new(owner: Address, chain_id: ChainId, fee_token: Address) -> Self {
        Self {
            owner,
            chain_id,
            fee_token,
            status: SessionStatus::Idle,
            precomputed: None,
            funded: false,
            draft: None,
            signature: None,
            sub_account: None,
            permission: None,
            submission_attempts: 0,
            task_id: None,
            task_status: None,
            tx_hash: None,
            explorer_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn fee_token(&self) -> Address {
        self.fee_token
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn precomputed(&self) -> Option<&Precomputed> {
        self.precomputed.as_ref()
    }

    pub fn target(&self) -> Option<Address> {
        self.precomputed.as_ref().map(|p| p.target)
    }

    pub fn quote(&self) -> Option<&FeeQuote> {
        self.precomputed.as_ref().map(|p| &p.quote)
    }

    pub fn fee_estimate(&self) -> Option<U256> {
        self.quote().map(FeeQuote::amount)
    }

    pub fn fee_estimate_signature(&self) -> Option<&str> {
        self.quote().map(FeeQuote::signature)
    }

    pub fn is_funded(&self) -> bool {
        self.funded
    }

    pub fn draft(&self) -> Option<&SubscriptionDraft> {
        self.draft.as_ref()
    }

    pub fn draft_id(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.draft_id.as_str())
    }

    pub fn policy_commit(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.policy_commit.as_str())
    }

    pub fn signature(&self) -> Option<&Bytes> {
        self.signature.as_ref()
    }

    pub fn sub_account(&self) -> Option<Address> {
        self.sub_account
    }

    pub fn permission(&self) -> Option<PermissionGrant> {
        self.permission
    }

    pub fn submission_attempts(&self) -> u32 {
        self.submission_attempts
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn task_status(&self) -> Option<TaskStatus> {
        self.task_status
    }

    pub fn tx_hash(&self) -> Option<B256> {
        self.tx_hash
    }

    pub fn explorer_url(&self) -> Option<&str> {
        self.explorer_url.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn set_status(&mut self, status: SessionStatus) {
        if self.status.is_terminal() && status != self.status {
            tracing::warn!(from = %self.status, to = %status, "ignoring transition out of terminal state");
            return;
        }
        tracing::debug!(owner = %self.owner, from = %self.status, to = %status, "session transition");
        self.status = status;
    }

    /// Record a (possibly refreshed) precompute result.
    ///
    /// Refreshing replaces the quote; once a draft has been built the quote is
    /// locked because the draft commits to its amount. A new target or fee
    /// amount means the funding check has to run again.
    pub(crate) fn record_precompute(&mut self, precomputed: Precomputed) -> Result<()> {
        precomputed
            .quote
            .ensure_scope(self.owner, self.chain_id, self.fee_token)?;
        if self.draft.is_some() {
            return Err(DeployError::InvalidState(
                "fee quote is locked once a draft has been built".to_string(),
            ));
        }
        if let Some(existing) = &self.precomputed
            && (existing.target != precomputed.target
                || existing.quote.amount() != precomputed.quote.amount())
        {
            self.funded = false;
        }
        self.precomputed = Some(precomputed);
        Ok(())
    }

    pub(crate) fn mark_funded(&mut self) {
        self.funded = true;
    }

    pub(crate) fn record_draft(&mut self, draft: SubscriptionDraft) -> Result<()> {
        set_once(&mut self.draft, draft, "subscription draft")
    }

    pub(crate) fn record_signature(&mut self, signature: Bytes) -> Result<()> {
        set_once(&mut self.signature, signature, "wallet signature")
    }

    pub(crate) fn record_sub_account(&mut self, address: Address) -> Result<()> {
        set_once(&mut self.sub_account, address, "sub-account address")
    }

    pub(crate) fn record_permission(&mut self, grant: PermissionGrant) {
        if self.permission.is_none() {
            self.permission = Some(grant);
        }
    }

    pub(crate) fn begin_submission(&mut self) {
        self.submission_attempts += 1;
    }

    pub(crate) fn record_task(&mut self, task_id: String) -> Result<()> {
        set_once(&mut self.task_id, task_id, "deployment task id")?;
        self.task_status = Some(TaskStatus::Pending);
        Ok(())
    }

    /// Record an observed backend status. Terminal statuses are sticky.
    pub(crate) fn record_task_status(&mut self, status: TaskStatus, tx_hash: Option<B256>) {
        if let Some(current) = self.task_status
            && current.is_terminal()
        {
            return;
        }
        self.task_status = Some(status);
        if self.tx_hash.is_none() {
            self.tx_hash = tx_hash;
        }
    }

    pub(crate) fn record_explorer_url(&mut self, url: String) {
        if self.explorer_url.is_none() {
            self.explorer_url = Some(url);
        }
    }

    /// Discard all progress and return to `idle` for the same owner/chain/token.
    pub fn reset(&mut self) {
        *self = Self::new(self.owner, self.chain_id, self.fee_token);
    }
}

fn set_once<T: PartialEq>(slot: &mut Option<T>, value: T, what: &str) -> Result<()> {
    match slot {
        Some(existing) if *existing == value => Ok(()),
        Some(_) => Err(DeployError::InvalidState(format!(
            "{what} is already recorded for this session"
        ))),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}
