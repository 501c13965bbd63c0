//! Minimal Ethereum JSON-RPC transport plus the chain and wallet adapters
//! built on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use url::Url;

use super::{ChainReader, TransactionReceipt, TransactionRequest, WalletProvider};
use crate::api::TypedDataPayload;
use crate::error::{DeployError, OnChainAction, RemoteCall, Result};
use crate::types::{Address, B256, Bytes, U256};

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_REQUEST_CODE: i64 = 4001;

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

/// Error object returned by a JSON-RPC endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::api::client::USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build JSON-RPC client")?;
        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue a call, keeping JSON-RPC level errors separate from transport
    /// failures.
    pub async fn request_raw<P, R>(
        &self,
        method: &str,
        params: P,
    ) -> Result<std::result::Result<Option<R>, RpcErrorObject>>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let call = RemoteCall::JsonRpc;
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        tracing::trace!(method, "json-rpc request");

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| DeployError::remote(call, format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeployError::RemoteCallFailure {
                call,
                status: Some(status.as_u16()),
                message: format!("{method}: HTTP {status}"),
            });
        }

        let decoded: RpcResponse<R> = response
            .json()
            .await
            .map_err(|e| DeployError::invalid(call, format!("{method}: {e}")))?;

        match decoded.error {
            Some(err) => Ok(Err(err)),
            None => Ok(Ok(decoded.result)),
        }
    }

    /// Issue a call whose result must be present.
    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        match self.request_raw(method, params).await? {
            Ok(Some(result)) => Ok(result),
            Ok(None) => Err(DeployError::invalid(
                RemoteCall::JsonRpc,
                format!("{method}: empty result"),
            )),
            Err(err) => Err(DeployError::remote(
                RemoteCall::JsonRpc,
                format!("{method}: rpc error {}: {}", err.code, err.message),
            )),
        }
    }
}

/// Read-only chain access over `eth_getBalance` / `eth_call`.
#[derive(Debug)]
pub struct RpcChain {
    rpc: JsonRpcClient,
}

impl RpcChain {
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl ChainReader for RpcChain {
    async fn native_balance(&self, holder: Address) -> Result<U256> {
        self.rpc
            .request("eth_getBalance", json!([holder, "latest"]))
            .await
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.rpc
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    #[serde(default)]
    status: Option<U256>,
    #[serde(default)]
    block_number: Option<U256>,
}

/// Wallet backed by an account-managing JSON-RPC endpoint (a local node or an
/// external signer).
#[derive(Debug)]
pub struct RpcWallet {
    rpc: JsonRpcClient,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcWallet {
    pub fn new(rpc: JsonRpcClient) -> Self {
        Self {
            rpc,
            receipt_poll_interval: Duration::from_secs(2),
            receipt_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_receipt_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_timeout = timeout;
        self
    }

    /// Accounts the endpoint can sign for.
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.rpc.request("eth_accounts", json!([])).await
    }
}

/// Build the `eth_signTypedData_v4` document.
///
/// The `EIP712Domain` type is always derived from the signed domain so the
/// wallet hashes exactly the fields that are sent, in canonical order.
pub fn typed_data_document(payload: &TypedDataPayload) -> Value {
    let (domain_type, domain) = payload.domain.signing_domain();
    let mut types = payload.types.clone();
    if let Value::Object(map) = &mut types {
        map.insert("EIP712Domain".to_string(), domain_type);
    }
    json!({
        "types": types,
        "domain": domain,
        "primaryType": payload.primary_type,
        "message": payload.message,
    })
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn sign_typed_data(
        &self,
        signer: Address,
        payload: &TypedDataPayload,
    ) -> Result<Option<Bytes>> {
        let document = typed_data_document(payload).to_string();
        match self
            .rpc
            .request_raw::<_, Bytes>("eth_signTypedData_v4", json!([signer, document]))
            .await?
        {
            Ok(signature) => Ok(signature.filter(|s| !s.is_empty())),
            Err(err) if err.code == USER_REJECTED_REQUEST_CODE => {
                tracing::info!(%signer, "wallet rejected signature request");
                Ok(None)
            }
            Err(err) => Err(DeployError::remote(
                RemoteCall::JsonRpc,
                format!("eth_signTypedData_v4: rpc error {}: {}", err.code, err.message),
            )),
        }
    }

    async fn send_transaction(&self, from: Address, tx: TransactionRequest) -> Result<B256> {
        let params = json!([{
            "from": from,
            "to": tx.to,
            "value": tx.value,
            "data": tx.data,
        }]);
        match self
            .rpc
            .request_raw::<_, B256>("eth_sendTransaction", params)
            .await?
        {
            Ok(Some(hash)) => Ok(hash),
            Ok(None) => Err(DeployError::invalid(
                RemoteCall::JsonRpc,
                "eth_sendTransaction: empty result",
            )),
            Err(err) if err.code == USER_REJECTED_REQUEST_CODE => Err(DeployError::UserRejected),
            Err(err) => Err(DeployError::on_chain(
                tx.action,
                format!("rpc error {}: {}", err.code, err.message),
            )),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            let receipt: Option<RpcReceipt> = self
                .rpc
                .request_raw("eth_getTransactionReceipt", json!([tx_hash]))
                .await?
                .map_err(|err| {
                    DeployError::remote(
                        RemoteCall::JsonRpc,
                        format!("eth_getTransactionReceipt: rpc error {}: {}", err.code, err.message),
                    )
                })?;

            if let Some(receipt) = receipt {
                return Ok(TransactionReceipt {
                    tx_hash: receipt.transaction_hash,
                    success: receipt.status.is_none_or(|s| s == U256::from(1)),
                    block_number: receipt.block_number.map(|n| n.saturating_to::<u64>()),
                });
            }

            if Instant::now() >= deadline {
                return Err(DeployError::on_chain(
                    OnChainAction::Read,
                    format!("no receipt for {tx_hash} within {}s", self.receipt_timeout.as_secs()),
                ));
            }
            sleep(self.receipt_poll_interval).await;
        }
    }
}
