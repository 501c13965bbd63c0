//! Sequential driver for one deployment session.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::deployer::DeploySteps;
use crate::api::{Precomputed, SubscriptionDraft};
use crate::deploy::{FundingOutcome, PollEvent, SignatureOutcome, ToggleMode};
use crate::error::{DeployError, Result};
use crate::policy::DraftParams;
use crate::session::{DeploymentSession, PermissionGrant, SessionStatus};
use crate::types::{Address, B256, DeploymentTask, TaskStatus};

/// How a full run ended, when it did not end in an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SessionOutcome {
    Succeeded {
        task_id: String,
        tx_hash: Option<B256>,
        explorer_url: Option<String>,
    },
    /// The owner declined to sign; nothing was submitted.
    Declined,
}

/// Owns a [`DeploymentSession`] and runs the deploy steps against it.
pub struct DeploymentOrchestrator {
    session: DeploymentSession,
    steps: Arc<DeploySteps>,
    toggle_mode: ToggleMode,
    cancel: CancellationToken,
}

impl DeploymentOrchestrator {
    pub(crate) fn new(
        session: DeploymentSession,
        steps: Arc<DeploySteps>,
        toggle_mode: ToggleMode,
    ) -> Self {
        Self {
            session,
            steps,
            toggle_mode,
            cancel: CancellationToken::new(),
        }
    }

    pub fn session(&self) -> &DeploymentSession {
        &self.session
    }

    pub fn toggle_mode(&self) -> ToggleMode {
        self.toggle_mode
    }

    /// Token that resets the session when cancelled from another task.
    ///
    /// In-flight work is abandoned and its results are discarded. The token
    /// is replaced after each reset.
    pub fn reset_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop any poll loop and discard all session progress.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.session.reset();
        tracing::info!(owner = %self.session.owner(), "session reset");
    }

    /// Run the whole flow from wherever the session currently stands.
    ///
    /// Completed steps are skipped, so a run interrupted by a retryable
    /// error can be resumed by calling this again. `params` are only used
    /// when no draft exists yet.
    pub async fn run(&mut self, params: DraftParams) -> Result<SessionOutcome> {
        if self.session.precomputed().is_none() {
            self.precompute().await?;
        }
        if !self.session.is_funded() {
            self.ensure_funded().await?;
        }
        if self.session.draft().is_none() {
            self.build_draft(params).await?;
        }
        if self.session.signature().is_none()
            && let SignatureOutcome::Declined = self.sign().await?
        {
            return Ok(SessionOutcome::Declined);
        }
        if self.session.sub_account().is_none() {
            self.resolve_address().await?;
        }
        if self.toggle_mode == ToggleMode::BeforeDeploy && self.session.permission().is_none() {
            self.ensure_permission().await?;
        }
        let task_id = match self.session.task_id() {
            Some(id) => id.to_string(),
            None => self.submit().await?,
        };

        let task = self.poll().await?;
        match task.status {
            TaskStatus::Successful => {
                if self.toggle_mode == ToggleMode::Lazy {
                    self.ensure_permission().await?;
                }
                Ok(SessionOutcome::Succeeded {
                    task_id,
                    tx_hash: self.session.tx_hash(),
                    explorer_url: self.session.explorer_url().map(str::to_string),
                })
            }
            status => Err(DeployError::TaskFailed { task_id, status }),
        }
    }

    pub async fn precompute(&mut self) -> Result<Precomputed> {
        self.ensure_active()?;
        self.session.set_status(SessionStatus::Precomputing);
        let result = guarded(
            &self.cancel,
            self.steps.precomputer.precompute(&mut self.session),
        )
        .await;
        self.settle(result)
    }

    pub async fn ensure_funded(&mut self) -> Result<FundingOutcome> {
        self.ensure_active()?;
        let result = guarded(&self.cancel, self.steps.gate.ensure_funded(&mut self.session)).await;
        self.settle(result)
    }

    pub async fn build_draft(&mut self, params: DraftParams) -> Result<SubscriptionDraft> {
        self.ensure_active()?;
        self.session.set_status(SessionStatus::AwaitingSignature);
        let result = guarded(
            &self.cancel,
            self.steps.drafts.build(&mut self.session, params),
        )
        .await;
        self.settle(result)
    }

    /// Collect the wallet signature. A decline cancels the session.
    pub async fn sign(&mut self) -> Result<SignatureOutcome> {
        self.ensure_active()?;
        self.session.set_status(SessionStatus::AwaitingSignature);
        let result = guarded(
            &self.cancel,
            self.steps.signatures.collect(&mut self.session),
        )
        .await;
        let outcome = self.settle(result)?;
        if outcome == SignatureOutcome::Declined {
            self.session.set_status(SessionStatus::Cancelled);
        }
        Ok(outcome)
    }

    pub async fn resolve_address(&mut self) -> Result<Address> {
        self.ensure_active()?;
        let result = guarded(
            &self.cancel,
            self.steps.addresses.resolve(&mut self.session),
        )
        .await;
        self.settle(result)
    }

    /// Run the permission guard.
    ///
    /// In lazy mode this is also allowed on a succeeded session; a failure
    /// there is returned without touching the session status.
    pub async fn ensure_permission(&mut self) -> Result<PermissionGrant> {
        let after_success =
            self.toggle_mode == ToggleMode::Lazy && self.session.status() == SessionStatus::Succeeded;
        if !after_success {
            self.ensure_active()?;
            self.session.set_status(SessionStatus::TogglingPermission);
        }
        let result = guarded(
            &self.cancel,
            self.steps.guard.ensure_permission(&mut self.session),
        )
        .await;
        self.settle(result)
    }

    /// Submit the signed draft. Only one automatic attempt is made.
    pub async fn submit(&mut self) -> Result<String> {
        self.ensure_active()?;
        self.session.set_status(SessionStatus::Submitting);
        let result = guarded(
            &self.cancel,
            self.steps.submitter.submit(&mut self.session),
        )
        .await;
        self.settle(result)
    }

    /// Explicitly resubmit after a failed submission.
    pub async fn retry_submit(&mut self) -> Result<String> {
        self.ensure_active()?;
        self.session.set_status(SessionStatus::Submitting);
        let result = guarded(
            &self.cancel,
            self.steps.submitter.retry(&mut self.session),
        )
        .await;
        self.settle(result)
    }

    /// Poll the submitted task until it reaches a terminal status.
    ///
    /// Returns the terminal task, whatever its status. After a
    /// [`DeployError::PollTimeout`] the session stays in `polling` and this
    /// may be called again.
    pub async fn poll(&mut self) -> Result<DeploymentTask> {
        let task_id = self
            .session
            .task_id()
            .ok_or(DeployError::MissingPrerequisite("deployment task id"))?
            .to_string();
        if let Some(status) = self.session.task_status()
            && status.is_terminal()
        {
            return Ok(DeploymentTask {
                task_id,
                status,
                output_tx_hash: self.session.tx_hash(),
            });
        }

        self.session.set_status(SessionStatus::Polling);
        let mut handle = self.steps.poller.spawn(task_id.clone(), &self.cancel);

        loop {
            let event = handle.next_event().await;
            if self.cancel.is_cancelled() {
                self.reset();
                return Err(DeployError::SessionReset);
            }
            match event {
                Some(PollEvent::Observed(task)) => {
                    self.session
                        .record_task_status(task.status, task.output_tx_hash);
                }
                Some(PollEvent::Terminal { task, explorer_url }) => {
                    self.session
                        .record_task_status(task.status, task.output_tx_hash);
                    if let Some(url) = explorer_url {
                        self.session.record_explorer_url(url);
                    }
                    self.session.set_status(match task.status {
                        TaskStatus::Successful => SessionStatus::Succeeded,
                        TaskStatus::Cancelled => SessionStatus::Cancelled,
                        _ => SessionStatus::Failed,
                    });
                    return Ok(task);
                }
                Some(PollEvent::TimedOut { elapsed }) => {
                    return Err(DeployError::PollTimeout { task_id, elapsed });
                }
                None => {
                    return Err(DeployError::InvalidState(format!(
                        "poll loop for task {task_id} stopped unexpectedly"
                    )));
                }
            }
        }
    }

    fn ensure_active(&self) -> Result<()> {
        let status = self.session.status();
        if status.is_terminal() {
            return Err(DeployError::InvalidState(format!(
                "session is {status}; reset it to start over"
            )));
        }
        Ok(())
    }

    /// Apply a step result to the session lifecycle.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if self.cancel.is_cancelled() || matches!(result, Err(DeployError::SessionReset)) {
            self.reset();
            return Err(DeployError::SessionReset);
        }
        if let Err(err) = &result
            && fails_session(err)
            && !self.session.status().is_terminal()
        {
            tracing::warn!(owner = %self.session.owner(), error = %err, "session failed");
            self.session.set_status(SessionStatus::Failed);
        }
        result
    }
}

/// Errors after which the session cannot continue without a reset.
fn fails_session(err: &DeployError) -> bool {
    matches!(
        err,
        DeployError::InvalidPrecomputeResponse { .. }
            | DeployError::InvalidResponse { .. }
            | DeployError::OnChainFailure { .. }
            | DeployError::AddressResolutionFailed { .. }
            | DeployError::PermissionToggleFailed { .. }
            | DeployError::QuoteScopeMismatch
    )
}

/// Run a step unless the session is reset first.
async fn guarded<T>(cancel: &CancellationToken, step: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployError::SessionReset),
        result = step => result,
    }
}
