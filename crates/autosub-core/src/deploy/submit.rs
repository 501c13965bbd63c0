//! Deployment submission.
//!
//! A signed draft is submitted at most once automatically. After a failed
//! attempt the caller has to ask for [`DeploymentSubmitter::retry`].

use std::sync::Arc;

use crate::api::DeployerApi;
use crate::error::{DeployError, RemoteCall, Result};
use crate::notify::{Notice, Notifier, ids};
use crate::session::DeploymentSession;

pub struct DeploymentSubmitter {
    api: Arc<dyn DeployerApi>,
    notifier: Arc<dyn Notifier>,
    registry_id: String,
}

impl DeploymentSubmitter {
    pub fn new(
        api: Arc<dyn DeployerApi>,
        notifier: Arc<dyn Notifier>,
        registry_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            notifier,
            registry_id: registry_id.into(),
        }
    }

    /// Submit the signed draft and return the task id.
    pub async fn submit(&self, session: &mut DeploymentSession) -> Result<String> {
        if let Some(task_id) = session.task_id() {
            return Ok(task_id.to_string());
        }
        if session.submission_attempts() > 0 {
            return Err(DeployError::InvalidState(
                "deployment was already submitted once for this draft; retry explicitly"
                    .to_string(),
            ));
        }
        self.send(session).await
    }

    /// Resubmit after a failed attempt, reusing the existing signatures.
    pub async fn retry(&self, session: &mut DeploymentSession) -> Result<String> {
        if let Some(task_id) = session.task_id() {
            return Ok(task_id.to_string());
        }
        self.send(session).await
    }

    async fn send(&self, session: &mut DeploymentSession) -> Result<String> {
        let request = super::deploy_request(session, &self.registry_id)?;

        self.notifier.notify(Notice::loading(
            ids::DEPLOY_AUTOMATION,
            "Deploying automation console...",
        ));
        session.begin_submission();
        tracing::debug!(
            owner = %session.owner(),
            attempt = session.submission_attempts(),
            "submitting deployment"
        );

        let result = match self.api.deploy(&request).await {
            Ok(response) => response
                .task_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| DeployError::invalid(RemoteCall::Deploy, "missing taskId")),
            Err(err) => Err(err),
        };
        let task_id = super::notify_failure(self.notifier.as_ref(), ids::SETUP_ERROR, result)?;

        session.record_task(task_id.clone())?;
        tracing::info!(owner = %session.owner(), %task_id, "deployment submitted");
        Ok(task_id)
    }
}
