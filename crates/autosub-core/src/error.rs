//! Session-scoped failure taxonomy for the deployment flow.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::TaskStatus;

/// Remote calls issued against the deployer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    Precompute,
    GenerateSignaturePayload,
    ComputeDeploymentAddress,
    Deploy,
    TaskStatus,
    IndexerTrigger,
    JsonRpc,
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteCall::Precompute => "precompute",
            RemoteCall::GenerateSignaturePayload => "generate-signature-payload",
            RemoteCall::ComputeDeploymentAddress => "compute-deployment-address",
            RemoteCall::Deploy => "deploy",
            RemoteCall::TaskStatus => "task-status",
            RemoteCall::IndexerTrigger => "indexer-trigger",
            RemoteCall::JsonRpc => "json-rpc",
        };
        f.write_str(name)
    }
}

/// On-chain actions the flow may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnChainAction {
    FundingTransfer,
    ToggleOperator,
    Read,
}

impl fmt::Display for OnChainAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OnChainAction::FundingTransfer => "funding transfer",
            OnChainAction::ToggleOperator => "operator toggle",
            OnChainAction::Read => "contract read",
        };
        f.write_str(name)
    }
}

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The same step may be re-invoked by the caller.
    Retryable,
    /// The session cannot make progress without a restart.
    Fatal,
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid precompute response: missing {missing}")]
    InvalidPrecomputeResponse { missing: &'static str },

    #[error("invalid {call} response: {reason}")]
    InvalidResponse { call: RemoteCall, reason: String },

    #[error("{call} request failed: {message}")]
    RemoteCallFailure {
        call: RemoteCall,
        status: Option<u16>,
        message: String,
    },

    #[error("signature request was rejected by the user")]
    UserRejected,

    #[error("{action} failed: {reason}")]
    OnChainFailure {
        action: OnChainAction,
        reason: String,
    },

    #[error("funding the deployment target failed: {source}")]
    FundingFailed {
        #[source]
        source: Box<DeployError>,
    },

    #[error("resolving the sub-account address failed: {source}")]
    AddressResolutionFailed {
        #[source]
        source: Box<DeployError>,
    },

    #[error("granting operator permission failed: {source}")]
    PermissionToggleFailed {
        #[source]
        source: Box<DeployError>,
    },

    #[error("backend returned unknown task status '{0}'")]
    UnknownStatus(String),

    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(&'static str),

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("fee quote was issued for a different owner, chain or fee token")]
    QuoteScopeMismatch,

    #[error("deployment task {task_id} ended with status {status}")]
    TaskFailed { task_id: String, status: TaskStatus },

    #[error("task {task_id} did not reach a terminal status within {}s", elapsed.as_secs())]
    PollTimeout { task_id: String, elapsed: Duration },

    #[error("session was reset")]
    SessionReset,
}

impl DeployError {
    pub fn remote(call: RemoteCall, message: impl Into<String>) -> Self {
        DeployError::RemoteCallFailure {
            call,
            status: None,
            message: message.into(),
        }
    }

    pub fn invalid(call: RemoteCall, reason: impl Into<String>) -> Self {
        DeployError::InvalidResponse {
            call,
            reason: reason.into(),
        }
    }

    pub fn on_chain(action: OnChainAction, reason: impl Into<String>) -> Self {
        DeployError::OnChainFailure {
            action,
            reason: reason.into(),
        }
    }

    pub fn funding(source: DeployError) -> Self {
        DeployError::FundingFailed {
            source: Box::new(source),
        }
    }

    pub fn address_resolution(source: DeployError) -> Self {
        DeployError::AddressResolutionFailed {
            source: Box::new(source),
        }
    }

    pub fn permission_toggle(source: DeployError) -> Self {
        DeployError::PermissionToggleFailed {
            source: Box::new(source),
        }
    }

    /// Funding failures take the class of their cause: a dropped RPC call can
    /// be retried, a reverted transfer cannot.
    pub fn class(&self) -> ErrorClass {
        match self {
            DeployError::FundingFailed { source } => source.class(),
            DeployError::RemoteCallFailure { .. }
            | DeployError::PollTimeout { .. }
            | DeployError::UnknownStatus(_) => ErrorClass::Retryable,
            _ => ErrorClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
