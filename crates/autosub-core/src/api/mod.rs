//! Deployer service seam.
//!
//! [`DeployerApi`] is the only way the deploy steps talk to the remote
//! calldata/status service. [`HttpDeployerApi`] is the production
//! implementation; tests substitute in-memory fakes.

pub mod client;
pub mod indexer;
pub mod wire;

use alloy_sol_types::Eip712Domain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::policy::DraftParams;
use crate::session::FeeQuote;
use crate::types::{Address, ChainId, U256, encode_chain_id};

pub use client::HttpDeployerApi;
pub use indexer::{HttpIndexer, IndexerTrigger};
pub use wire::{
    DeployRequest, DeployResponse, DeploymentAddressResponse, PrecomputeRequest,
    PrecomputeResponse, SignaturePayloadRequest, SignaturePayloadResponse, TaskStatusResponse,
};

/// Validated result of the precompute call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precomputed {
    /// Deterministic address the deployment will occupy.
    pub target: Address,
    pub quote: FeeQuote,
}

/// EIP-712 domain of the draft payload, with the chain id already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    pub chain_id: ChainId,
    pub verifying_contract: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl TypedDataDomain {
    /// Domain actually signed over.
    ///
    /// Only the verifying contract and numeric chain id are kept; the service
    /// sends empty name/version/salt placeholders which are dropped.
    pub fn eip712_domain(&self) -> Eip712Domain {
        Eip712Domain {
            name: None,
            version: None,
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(self.verifying_contract),
            salt: None,
        }
    }

    /// `EIP712Domain` type entries and the domain object handed to the
    /// wallet, both in the canonical EIP-712 field order.
    pub fn signing_domain(&self) -> (Value, Value) {
        let domain = self.eip712_domain();
        let mut fields = Vec::new();
        let mut values = Map::new();

        if let Some(name) = &domain.name {
            fields.push(json!({ "name": "name", "type": "string" }));
            values.insert("name".to_string(), json!(name));
        }
        if let Some(version) = &domain.version {
            fields.push(json!({ "name": "version", "type": "string" }));
            values.insert("version".to_string(), json!(version));
        }
        if let Some(chain_id) = domain.chain_id {
            fields.push(json!({ "name": "chainId", "type": "uint256" }));
            values.insert("chainId".to_string(), json!(chain_id.saturating_to::<u64>()));
        }
        if let Some(contract) = domain.verifying_contract {
            fields.push(json!({ "name": "verifyingContract", "type": "address" }));
            values.insert("verifyingContract".to_string(), json!(contract));
        }
        if let Some(salt) = domain.salt {
            fields.push(json!({ "name": "salt", "type": "bytes32" }));
            values.insert("salt".to_string(), json!(salt));
        }

        (Value::Array(fields), Value::Object(values))
    }

    pub fn hex_chain_id(&self) -> String {
        encode_chain_id(self.chain_id)
    }
}

/// Typed-data payload ready for `eth_signTypedData_v4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataPayload {
    pub domain: TypedDataDomain,
    pub message: Value,
    pub types: Value,
    pub primary_type: String,
}

/// A subscription draft issued by the service for the session's policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDraft {
    /// Parameters the draft was generated for; resent verbatim downstream.
    pub params: DraftParams,
    pub payload: TypedDataPayload,
    pub policy_commit: String,
    pub draft_id: String,
}

/// Remote calldata/status service.
///
/// Methods return the raw wire responses; the calling step validates them.
#[async_trait]
pub trait DeployerApi: Send + Sync {
    async fn precompute(&self, request: &PrecomputeRequest) -> Result<PrecomputeResponse>;

    async fn generate_signature_payload(
        &self,
        request: &SignaturePayloadRequest,
    ) -> Result<SignaturePayloadResponse>;

    async fn compute_deployment_address(
        &self,
        request: &DeployRequest,
    ) -> Result<DeploymentAddressResponse>;

    async fn deploy(&self, request: &DeployRequest) -> Result<DeployResponse>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse>;
}
