//! Blockchain seams: read-only queries and the wallet provider.

pub mod abi;
pub mod rpc;

use async_trait::async_trait;

use crate::api::TypedDataPayload;
use crate::error::{OnChainAction, Result};
use crate::types::{Address, B256, Bytes, U256};

pub use rpc::{JsonRpcClient, RpcChain, RpcWallet};

/// Read-only blockchain queries.
///
/// Implementors only need the two raw calls; contract reads are provided on
/// top of `call` and may be overridden by in-memory implementations.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn native_balance(&self, holder: Address) -> Result<U256>;

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// `operators(owner, operator)` on the operator registry contract.
    async fn operator_permission(
        &self,
        registry: Address,
        owner: Address,
        operator: Address,
    ) -> Result<U256> {
        let data = self
            .call(registry, abi::operators_calldata(owner, operator))
            .await?;
        abi::decode_operators(&data)
    }

    async fn erc20_balance(&self, token: Address, holder: Address) -> Result<U256> {
        let data = self.call(token, abi::balance_of_calldata(holder)).await?;
        abi::decode_balance_of(&data)
    }
}

/// Transaction handed to the wallet for signing and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    /// What the transaction is for; used to label failures.
    pub action: OnChainAction,
}

impl TransactionRequest {
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            data: Bytes::new(),
            action: OnChainAction::FundingTransfer,
        }
    }

    pub fn toggle_operator(registry: Address, owner: Address, operator: Address) -> Self {
        Self {
            to: registry,
            value: U256::ZERO,
            data: abi::toggle_operator_calldata(owner, operator),
            action: OnChainAction::ToggleOperator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Wallet capable of typed-data signing and transaction submission.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request an EIP-712 signature. `Ok(None)` means the user declined.
    async fn sign_typed_data(
        &self,
        signer: Address,
        payload: &TypedDataPayload,
    ) -> Result<Option<Bytes>>;

    async fn send_transaction(&self, from: Address, tx: TransactionRequest) -> Result<B256>;

    /// Wait until the transaction is mined.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt>;
}
