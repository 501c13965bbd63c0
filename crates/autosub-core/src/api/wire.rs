//! Request and response bodies of the deployer service.
//!
//! Responses keep every field optional: completeness is checked by the step
//! that consumes them so a partial response fails that step loudly instead
//! of failing JSON decoding with an opaque message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::policy::{AutomationPolicy, RewardSchedule};
use crate::types::amount::{decimal, decimal_opt};
use crate::types::{Address, Bytes, ChainId, U256};

/// `{"data": ...}` wrapper around every deployer response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecomputeRequest {
    pub owner: Address,
    #[serde(rename = "chainID")]
    pub chain_id: ChainId,
    pub fee_token: Address,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecomputeResponse {
    #[serde(default)]
    pub precomputed_address: Option<Address>,
    #[serde(default, with = "decimal_opt")]
    pub fee_estimate: Option<U256>,
    #[serde(default)]
    pub fee_estimate_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayloadRequest {
    pub owner: Address,
    pub precomputed_console_address: Address,
    #[serde(rename = "chainID")]
    pub chain_id: ChainId,
    #[serde(rename = "registryID")]
    pub registry_id: String,
    pub fee_token: Address,
    #[serde(with = "decimal")]
    pub fee_estimate: U256,
    pub tokens: Vec<Address>,
    pub amounts: Vec<String>,
    pub automation_subscription_limits: AutomationPolicy,
    pub metadata: RewardSchedule,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayloadResponse {
    #[serde(default)]
    pub signature_payload: Option<WireSignaturePayload>,
    #[serde(default)]
    pub sub_account_policy_commit: Option<String>,
    #[serde(default, rename = "subscriptionDraftID")]
    pub subscription_draft_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSignaturePayload {
    pub domain: WireDomain,
    #[serde(default)]
    pub message: Value,
    #[serde(default)]
    pub types: Value,
    #[serde(default)]
    pub primary_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDomain {
    #[serde(default)]
    pub verifying_contract: Option<Address>,
    /// Hex-encoded chain id, e.g. `"0x783"`.
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub salt: Option<String>,
}

/// Body shared by `compute-addresses` and `deploy`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub owner: Address,
    #[serde(rename = "chainID")]
    pub chain_id: ChainId,
    #[serde(rename = "registryID")]
    pub registry_id: String,
    #[serde(rename = "subscriptionDraftID")]
    pub subscription_draft_id: String,
    pub sub_account_policy_commit: String,
    pub fee_token: Address,
    pub tokens: Vec<Address>,
    pub amounts: Vec<String>,
    pub sub_account_chainer_signature: Bytes,
    pub fee_estimate_signature: String,
    #[serde(with = "decimal")]
    pub fee_estimate: U256,
    pub metadata: RewardSchedule,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentAddressResponse {
    #[serde(default)]
    pub sub_account_address: Option<Address>,
    #[serde(default)]
    pub console_address: Option<Address>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    #[serde(default)]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output_transaction_hash: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
