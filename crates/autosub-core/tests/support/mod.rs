//! In-memory collaborators for driving deployment sessions in tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use autosub_core::api::wire::{WireDomain, WireSignaturePayload};
use autosub_core::api::{
    DeployRequest, DeployResponse, DeployerApi, DeploymentAddressResponse, IndexerTrigger,
    PrecomputeRequest, PrecomputeResponse, SignaturePayloadRequest, SignaturePayloadResponse,
    TaskStatusResponse, TypedDataPayload,
};
use autosub_core::chain::{ChainReader, TransactionReceipt, TransactionRequest, WalletProvider};
use autosub_core::deploy::{DeploySettings, ToggleMode};
use autosub_core::error::{DeployError, OnChainAction, RemoteCall, Result};
use autosub_core::notify::{Notice, Notifier};
use autosub_core::orchestration::{Collaborators, Deployer};
use autosub_core::types::{Address, B256, Bytes, ChainId, NATIVE_TOKEN, U256};

pub const CHAIN_ID: ChainId = 1923;

pub fn owner() -> Address {
    Address::repeat_byte(0x01)
}

/// A second wallet owner for sessions running alongside [`owner`].
pub fn second_owner() -> Address {
    Address::repeat_byte(0x09)
}

fn assert_known_owner(account: Address) {
    assert!(account == owner() || account == second_owner(), "unexpected owner {account}");
}

pub fn target() -> Address {
    Address::repeat_byte(0x02)
}

pub fn sub_account() -> Address {
    Address::repeat_byte(0x03)
}

pub fn operator_contract() -> Address {
    Address::repeat_byte(0x04)
}

pub fn output_hash() -> B256 {
    B256::repeat_byte(0xab)
}

pub fn settings(toggle_mode: ToggleMode) -> DeploySettings {
    DeploySettings {
        chain_id: CHAIN_ID,
        fee_token: NATIVE_TOKEN,
        registry_id: "registry-1".to_string(),
        operator_contract: operator_contract(),
        reward_token: Address::repeat_byte(0x05),
        reward_interval: 3600,
        reward_token_limit: U256::from(100_000u64),
        explorer_url: "https://explorer.test".parse().unwrap(),
        poll_interval: Duration::from_millis(10),
        poll_timeout: Some(Duration::from_secs(5)),
        toggle_mode,
    }
}

// =============================================================================
// Deployer service
// =============================================================================

/// Scripted deployer service that counts every call.
pub struct FakeApi {
    fee: Mutex<Option<U256>>,
    sub_account: Mutex<Option<Address>>,
    deploy_failures: AtomicUsize,
    statuses: Mutex<VecDeque<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    pub signature_requests: Mutex<Vec<SignaturePayloadRequest>>,
    pub deploy_requests: Mutex<Vec<DeployRequest>>,
}

impl FakeApi {
    /// Zero fee, resolvable sub-account, task goes straight to `successful`.
    pub fn new() -> Self {
        Self {
            fee: Mutex::new(Some(U256::ZERO)),
            sub_account: Mutex::new(Some(sub_account())),
            deploy_failures: AtomicUsize::new(0),
            statuses: Mutex::new(VecDeque::from(["successful"])),
            calls: Mutex::new(Vec::new()),
            signature_requests: Mutex::new(Vec::new()),
            deploy_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fee(self, fee: U256) -> Self {
        self.set_fee(fee);
        self
    }

    /// Change the fee quoted by later precompute calls.
    pub fn set_fee(&self, fee: U256) {
        *self.fee.lock().unwrap() = Some(fee);
    }

    /// Precompute responses omit the fee estimate.
    pub fn without_fee(self) -> Self {
        *self.fee.lock().unwrap() = None;
        self
    }

    pub fn without_sub_account(self) -> Self {
        *self.sub_account.lock().unwrap() = None;
        self
    }

    /// Fail the next `n` deploy calls with a transport error.
    pub fn failing_deploys(self, n: usize) -> Self {
        self.deploy_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Status sequence; the last entry repeats. `"error"` fails the poll.
    pub fn with_statuses(self, statuses: &[&'static str]) -> Self {
        self.set_statuses(statuses);
        self
    }

    pub fn set_statuses(&self, statuses: &[&'static str]) {
        *self.statuses.lock().unwrap() = statuses.iter().copied().collect();
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == name)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

#[async_trait]
impl DeployerApi for FakeApi {
    async fn precompute(&self, request: &PrecomputeRequest) -> Result<PrecomputeResponse> {
        self.record("precompute");
        assert_eq!(request.chain_id, CHAIN_ID);
        Ok(PrecomputeResponse {
            precomputed_address: Some(target()),
            fee_estimate: *self.fee.lock().unwrap(),
            fee_estimate_signature: Some("0xfee5160".to_string()),
        })
    }

    async fn generate_signature_payload(
        &self,
        request: &SignaturePayloadRequest,
    ) -> Result<SignaturePayloadResponse> {
        self.record("signature");
        self.signature_requests.lock().unwrap().push(request.clone());
        Ok(SignaturePayloadResponse {
            signature_payload: Some(WireSignaturePayload {
                domain: WireDomain {
                    verifying_contract: Some(target()),
                    chain_id: Some("0x783".to_string()),
                    name: Some(String::new()),
                    version: Some(String::new()),
                    salt: None,
                },
                message: json!({ "to": target(), "nonce": 0 }),
                types: json!({ "SafeTx": [{ "name": "to", "type": "address" }] }),
                primary_type: Some("SafeTx".to_string()),
            }),
            sub_account_policy_commit: Some("0xc0ffee".to_string()),
            subscription_draft_id: Some("draft-1".to_string()),
        })
    }

    async fn compute_deployment_address(
        &self,
        _request: &DeployRequest,
    ) -> Result<DeploymentAddressResponse> {
        self.record("compute-address");
        Ok(DeploymentAddressResponse {
            sub_account_address: *self.sub_account.lock().unwrap(),
            console_address: Some(target()),
        })
    }

    async fn deploy(&self, request: &DeployRequest) -> Result<DeployResponse> {
        self.record("deploy");
        self.deploy_requests.lock().unwrap().push(request.clone());
        let remaining = self.deploy_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.deploy_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DeployError::remote(RemoteCall::Deploy, "connection reset"));
        }
        Ok(DeployResponse {
            task_id: Some("task-1".to_string()),
        })
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse> {
        self.record("status");
        let status = {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().copied()
            }
        }
        .unwrap_or("pending");
        if status == "error" {
            return Err(DeployError::remote(RemoteCall::TaskStatus, "bad gateway"));
        }
        Ok(TaskStatusResponse {
            task_id: Some(task_id.to_string()),
            status: Some(status.to_string()),
            output_transaction_hash: (status == "successful").then(|| output_hash().to_string()),
            created_at: None,
        })
    }
}

// =============================================================================
// Chain
// =============================================================================

pub struct FakeChain {
    pub balance: Mutex<U256>,
    pub operator_value: Mutex<U256>,
    pub balance_reads: AtomicUsize,
    pub operator_reads: AtomicUsize,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            balance: Mutex::new(U256::ZERO),
            operator_value: Mutex::new(U256::ZERO),
            balance_reads: AtomicUsize::new(0),
            operator_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_balance(self, balance: U256) -> Self {
        *self.balance.lock().unwrap() = balance;
        self
    }

    pub fn with_operator_granted(self) -> Self {
        *self.operator_value.lock().unwrap() = U256::from(1u64);
        self
    }

    pub fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }

    pub fn operator_reads(&self) -> usize {
        self.operator_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn native_balance(&self, _holder: Address) -> Result<U256> {
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        Ok(*self.balance.lock().unwrap())
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes> {
        Err(DeployError::on_chain(OnChainAction::Read, "raw calls are not scripted"))
    }

    async fn operator_permission(
        &self,
        registry: Address,
        account: Address,
        _operator: Address,
    ) -> Result<U256> {
        assert_eq!(registry, operator_contract());
        assert_known_owner(account);
        self.operator_reads.fetch_add(1, Ordering::SeqCst);
        Ok(*self.operator_value.lock().unwrap())
    }
}

// =============================================================================
// Wallet
// =============================================================================

pub enum SignBehavior {
    Sign,
    ReturnNothing,
    Reject,
}

pub struct FakeWallet {
    sign: Mutex<SignBehavior>,
    receipts_succeed: AtomicBool,
    pub sign_calls: AtomicUsize,
    pub signed_payloads: Mutex<Vec<TypedDataPayload>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self {
            sign: Mutex::new(SignBehavior::Sign),
            receipts_succeed: AtomicBool::new(true),
            sign_calls: AtomicUsize::new(0),
            signed_payloads: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_sign_behavior(self, behavior: SignBehavior) -> Self {
        *self.sign.lock().unwrap() = behavior;
        self
    }

    pub fn with_reverting_receipts(self) -> Self {
        self.receipts_succeed.store(false, Ordering::SeqCst);
        self
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn signature() -> Bytes {
        Bytes::from(vec![0x5a; 65])
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn sign_typed_data(
        &self,
        signer: Address,
        payload: &TypedDataPayload,
    ) -> Result<Option<Bytes>> {
        assert_known_owner(signer);
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.signed_payloads.lock().unwrap().push(payload.clone());
        match *self.sign.lock().unwrap() {
            SignBehavior::Sign => Ok(Some(Self::signature())),
            SignBehavior::ReturnNothing => Ok(None),
            SignBehavior::Reject => Err(DeployError::UserRejected),
        }
    }

    async fn send_transaction(&self, from: Address, tx: TransactionRequest) -> Result<B256> {
        assert_known_owner(from);
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx);
        Ok(B256::repeat_byte(sent.len() as u8))
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        Ok(TransactionReceipt {
            tx_hash,
            success: self.receipts_succeed.load(Ordering::SeqCst),
            block_number: Some(1),
        })
    }
}

// =============================================================================
// Indexer and notifier
// =============================================================================

pub struct FakeIndexer {
    fail: bool,
    pub calls: Mutex<Vec<(B256, ChainId)>>,
}

impl FakeIndexer {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl IndexerTrigger for FakeIndexer {
    async fn trigger(&self, tx_hash: B256, chain_id: ChainId) -> Result<()> {
        self.calls.lock().unwrap().push((tx_hash, chain_id));
        if self.fail {
            return Err(DeployError::remote(RemoteCall::IndexerTrigger, "indexer down"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn ids(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|notice| notice.id.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Fakes wired into a [`Deployer`], kept reachable for assertions.
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub chain: Arc<FakeChain>,
    pub wallet: Arc<FakeWallet>,
    pub indexer: Arc<FakeIndexer>,
    pub notifier: Arc<RecordingNotifier>,
    pub deployer: Deployer,
}

impl Harness {
    pub fn new(api: FakeApi, chain: FakeChain, wallet: FakeWallet) -> Self {
        Self::build(api, chain, wallet, FakeIndexer::new(), ToggleMode::BeforeDeploy)
    }

    pub fn build(
        api: FakeApi,
        chain: FakeChain,
        wallet: FakeWallet,
        indexer: FakeIndexer,
        toggle_mode: ToggleMode,
    ) -> Self {
        Self::with_settings(api, chain, wallet, indexer, settings(toggle_mode))
    }

    pub fn with_settings(
        api: FakeApi,
        chain: FakeChain,
        wallet: FakeWallet,
        indexer: FakeIndexer,
        settings: DeploySettings,
    ) -> Self {
        let api = Arc::new(api);
        let chain = Arc::new(chain);
        let wallet = Arc::new(wallet);
        let indexer = Arc::new(indexer);
        let notifier = Arc::new(RecordingNotifier::default());

        let services = Collaborators::new(api.clone(), chain.clone(), wallet.clone())
            .with_indexer(indexer.clone())
            .with_notifier(notifier.clone());
        let deployer = Deployer::new(Arc::new(settings), services);

        Self {
            api,
            chain,
            wallet,
            indexer,
            notifier,
            deployer,
        }
    }

    pub fn default_params(&self) -> autosub_core::policy::DraftParams {
        self.deployer.settings().draft_params(owner(), Vec::new())
    }
}
