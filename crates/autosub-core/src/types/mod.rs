//! Shared core types used across the api, chain and deploy layers.

pub mod amount;
pub mod chain_id;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use alloy_primitives::{Address, B256, Bytes, U256};
pub use chain_id::{decode_chain_id, encode_chain_id};

/// Numeric EVM chain identifier.
pub type ChainId = u64;

/// Sentinel address used by the deployer service for the native currency.
pub const NATIVE_TOKEN: Address =
    alloy_primitives::address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Backend status of an asynchronous deployment task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Executing,
    Successful,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses never change again for the same task.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Successful | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Executing => "executing",
            TaskStatus::Successful => "successful",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = crate::error::DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "executing" => Ok(TaskStatus::Executing),
            "successful" => Ok(TaskStatus::Successful),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(crate::error::DeployError::UnknownStatus(other.to_string())),
        }
    }
}

/// Snapshot of a deployment task as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub output_tx_hash: Option<B256>,
}
