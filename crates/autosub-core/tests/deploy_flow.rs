//! End-to-end deployment sessions against in-memory collaborators.

mod support;

use std::time::Duration;

use autosub_core::deploy::{FundingOutcome, ToggleMode};
use autosub_core::error::{DeployError, ErrorClass, OnChainAction};
use autosub_core::notify::ids;
use autosub_core::orchestration::SessionOutcome;
use autosub_core::session::{PermissionGrant, SessionStatus};
use autosub_core::types::{NATIVE_TOKEN, TaskStatus, U256};

use support::{
    FakeApi, FakeChain, FakeIndexer, FakeWallet, Harness, SignBehavior, owner, output_hash,
    second_owner, settings, sub_account, target,
};

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn zero_fee_goes_straight_to_draft() {
    let h = Harness::new(FakeApi::new(), FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    let outcome = session.run(h.default_params()).await.unwrap();

    assert!(matches!(outcome, SessionOutcome::Succeeded { .. }));
    assert_eq!(h.chain.balance_reads(), 0);
    assert!(
        h.wallet
            .sent()
            .iter()
            .all(|tx| tx.action != OnChainAction::FundingTransfer)
    );
    assert!(session.session().is_funded());
    assert_eq!(h.api.calls("signature"), 1);
}

#[tokio::test]
async fn successful_run_records_explorer_link_and_indexes_once() {
    let api = FakeApi::new().with_statuses(&["pending", "executing", "successful"]);
    let h = Harness::new(api, FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    let outcome = session.run(h.default_params()).await.unwrap();

    let expected_url = format!("https://explorer.test/tx/{}", output_hash());
    assert_eq!(
        outcome,
        SessionOutcome::Succeeded {
            task_id: "task-1".to_string(),
            tx_hash: Some(output_hash()),
            explorer_url: Some(expected_url.clone()),
        }
    );
    let state = session.session();
    assert_eq!(state.status(), SessionStatus::Succeeded);
    assert_eq!(state.task_status(), Some(TaskStatus::Successful));
    assert_eq!(state.sub_account(), Some(sub_account()));
    assert_eq!(state.explorer_url(), Some(expected_url.as_str()));

    assert_eq!(h.indexer.call_count(), 1);
    assert_eq!(h.indexer.calls.lock().unwrap()[0], (output_hash(), support::CHAIN_ID));
    assert_eq!(h.api.calls("status"), 3);

    let ids = h.notifier.ids();
    assert!(ids.contains(&"deployment-executing".to_string()));
    assert!(ids.contains(&"deployment-successful".to_string()));
}

#[tokio::test]
async fn indexer_failure_does_not_change_outcome() {
    let h = Harness::build(
        FakeApi::new(),
        FakeChain::new(),
        FakeWallet::new(),
        FakeIndexer::failing(),
        ToggleMode::BeforeDeploy,
    );
    let mut session = h.deployer.session(owner());

    let outcome = session.run(h.default_params()).await.unwrap();

    assert!(matches!(outcome, SessionOutcome::Succeeded { .. }));
    assert_eq!(session.session().status(), SessionStatus::Succeeded);
    assert_eq!(h.indexer.call_count(), 1);
}

#[tokio::test]
async fn signed_payload_carries_decoded_chain_id() {
    let h = Harness::new(FakeApi::new(), FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());
    session.run(h.default_params()).await.unwrap();

    let payloads = h.wallet.signed_payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].domain.chain_id, support::CHAIN_ID);
    assert_eq!(payloads[0].domain.verifying_contract, target());
    assert_eq!(payloads[0].primary_type, "SafeTx");
}

// =============================================================================
// Balance gate
// =============================================================================

#[tokio::test]
async fn empty_target_is_funded_with_the_full_fee() {
    let fee = U256::from(1_000_000_000_000_000u64);
    let h = Harness::new(
        FakeApi::new().with_fee(fee),
        FakeChain::new(),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());

    session.precompute().await.unwrap();
    let outcome = session.ensure_funded().await.unwrap();

    assert!(matches!(outcome, FundingOutcome::Transferred { amount, .. } if amount == fee));
    let sent = h.wallet.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, target());
    assert_eq!(sent[0].value, fee);
    assert!(session.session().is_funded());
}

#[tokio::test]
async fn partial_balance_transfers_only_the_shortfall() {
    let h = Harness::new(
        FakeApi::new().with_fee(U256::from(1000u64)),
        FakeChain::new().with_balance(U256::from(400u64)),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());

    session.precompute().await.unwrap();
    session.ensure_funded().await.unwrap();

    assert_eq!(h.wallet.sent()[0].value, U256::from(600u64));
}

#[tokio::test]
async fn sufficient_balance_skips_transfer() {
    let h = Harness::new(
        FakeApi::new().with_fee(U256::from(1000u64)),
        FakeChain::new().with_balance(U256::from(1000u64)),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());

    session.precompute().await.unwrap();
    let outcome = session.ensure_funded().await.unwrap();

    assert_eq!(outcome, FundingOutcome::Covered);
    assert_eq!(h.chain.balance_reads(), 1);
    assert!(h.wallet.sent().is_empty());
}

#[tokio::test]
async fn reverted_funding_transfer_leaves_session_unfunded() {
    let h = Harness::new(
        FakeApi::new().with_fee(U256::from(1000u64)),
        FakeChain::new(),
        FakeWallet::new().with_reverting_receipts(),
    );
    let mut session = h.deployer.session(owner());

    session.precompute().await.unwrap();
    let err = session.ensure_funded().await.unwrap_err();

    assert!(matches!(err, DeployError::FundingFailed { .. }));
    assert_eq!(err.class(), ErrorClass::Fatal);
    assert!(!session.session().is_funded());
    assert!(!session.session().status().is_terminal());
    assert!(h.notifier.ids().contains(&ids::DEPOSIT_CHECK.to_string()));
}

#[tokio::test]
async fn refreshed_higher_fee_is_funded_again() {
    let h = Harness::new(
        FakeApi::new().with_fee(U256::from(1000u64)),
        FakeChain::new(),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());

    session.precompute().await.unwrap();
    session.ensure_funded().await.unwrap();
    assert!(session.session().is_funded());

    // The first transfer landed, then the service quotes a higher fee.
    *h.chain.balance.lock().unwrap() = U256::from(1000u64);
    h.api.set_fee(U256::from(5000u64));
    session.precompute().await.unwrap();
    assert!(!session.session().is_funded());

    let outcome = session.run(h.default_params()).await.unwrap();

    assert!(matches!(outcome, SessionOutcome::Succeeded { .. }));
    let transfers: Vec<U256> = h
        .wallet
        .sent()
        .iter()
        .filter(|tx| tx.to == target())
        .map(|tx| tx.value)
        .collect();
    assert_eq!(transfers, vec![U256::from(1000u64), U256::from(4000u64)]);
    assert_eq!(
        h.api.signature_requests.lock().unwrap()[0].fee_estimate,
        U256::from(5000u64)
    );
}

// =============================================================================
// Precompute and draft
// =============================================================================

#[tokio::test]
async fn incomplete_precompute_response_fails_session() {
    let h = Harness::new(FakeApi::new().without_fee(), FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    let err = session.run(h.default_params()).await.unwrap_err();

    assert!(matches!(
        err,
        DeployError::InvalidPrecomputeResponse {
            missing: "feeEstimate"
        }
    ));
    assert_eq!(session.session().status(), SessionStatus::Failed);
    assert_eq!(h.api.total_calls(), 1);
    assert!(h.notifier.ids().contains(&ids::COMPUTE_ADDRESS_ERROR.to_string()));
}

#[tokio::test]
async fn draft_requires_funded_target() {
    let h = Harness::new(FakeApi::new(), FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    session.precompute().await.unwrap();
    let err = session.build_draft(h.default_params()).await.unwrap_err();

    assert!(matches!(err, DeployError::MissingPrerequisite(_)));
    assert_eq!(h.api.calls("signature"), 0);
}

#[tokio::test]
async fn draft_request_carries_quote_and_funding() {
    let fee = U256::from(5u64);
    let h = Harness::new(
        FakeApi::new().with_fee(fee),
        FakeChain::new().with_balance(fee),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());
    let params = h.deployer.settings().draft_params(
        owner(),
        vec![autosub_core::policy::FundingInput {
            token: NATIVE_TOKEN,
            amount: U256::from(42u64),
        }],
    );

    session.precompute().await.unwrap();
    session.ensure_funded().await.unwrap();
    session.build_draft(params.clone()).await.unwrap();
    // Same parameters again: no second call.
    session.build_draft(params).await.unwrap();

    let requests = h.api.signature_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].fee_estimate, fee);
    assert_eq!(requests[0].precomputed_console_address, target());
    assert_eq!(requests[0].amounts, vec!["42".to_string()]);
    assert_eq!(requests[0].registry_id, "registry-1");
}

// =============================================================================
// Signature
// =============================================================================

#[tokio::test]
async fn absent_signature_cancels_without_further_calls() {
    let h = Harness::new(
        FakeApi::new(),
        FakeChain::new(),
        FakeWallet::new().with_sign_behavior(SignBehavior::ReturnNothing),
    );
    let mut session = h.deployer.session(owner());

    let outcome = session.run(h.default_params()).await.unwrap();

    assert_eq!(outcome, SessionOutcome::Declined);
    assert_eq!(session.session().status(), SessionStatus::Cancelled);
    assert_eq!(h.api.calls("compute-address"), 0);
    assert_eq!(h.api.calls("deploy"), 0);
    assert_eq!(h.chain.operator_reads(), 0);
    assert!(h.wallet.sent().is_empty());
}

#[tokio::test]
async fn wallet_rejection_is_a_decline() {
    let h = Harness::new(
        FakeApi::new(),
        FakeChain::new(),
        FakeWallet::new().with_sign_behavior(SignBehavior::Reject),
    );
    let mut session = h.deployer.session(owner());

    let outcome = session.run(h.default_params()).await.unwrap();

    assert_eq!(outcome, SessionOutcome::Declined);
    assert_eq!(session.session().status(), SessionStatus::Cancelled);
    assert!(!h.notifier.ids().contains(&ids::SETUP_ERROR.to_string()));
}

// =============================================================================
// Address resolution and permission
// =============================================================================

#[tokio::test]
async fn missing_sub_account_fails_before_any_toggle() {
    let h = Harness::new(
        FakeApi::new().without_sub_account(),
        FakeChain::new(),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());

    let err = session.run(h.default_params()).await.unwrap_err();

    assert!(matches!(err, DeployError::AddressResolutionFailed { .. }));
    assert_eq!(session.session().status(), SessionStatus::Failed);
    assert_eq!(h.chain.operator_reads(), 0);
    assert_eq!(h.api.calls("deploy"), 0);
}

#[tokio::test]
async fn missing_permission_is_toggled_before_deploy() {
    let h = Harness::new(FakeApi::new(), FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    session.run(h.default_params()).await.unwrap();

    let toggles: Vec<_> = h
        .wallet
        .sent()
        .into_iter()
        .filter(|tx| tx.action == OnChainAction::ToggleOperator)
        .collect();
    assert_eq!(toggles.len(), 1);
    assert_eq!(toggles[0].to, support::operator_contract());
    assert!(matches!(
        session.session().permission(),
        Some(PermissionGrant::Granted { .. })
    ));
}

#[tokio::test]
async fn granted_permission_sends_no_transaction() {
    let h = Harness::new(
        FakeApi::new(),
        FakeChain::new().with_operator_granted(),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());

    session.run(h.default_params()).await.unwrap();

    assert!(h.wallet.sent().is_empty());
    assert_eq!(
        session.session().permission(),
        Some(PermissionGrant::AlreadyGranted)
    );
}

#[tokio::test]
async fn guard_twice_reads_once_and_never_writes() {
    let h = Harness::new(
        FakeApi::new(),
        FakeChain::new().with_operator_granted(),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());

    session.precompute().await.unwrap();
    session.ensure_funded().await.unwrap();
    session.build_draft(h.default_params()).await.unwrap();
    session.sign().await.unwrap();
    session.resolve_address().await.unwrap();
    session.ensure_permission().await.unwrap();
    session.ensure_permission().await.unwrap();

    assert_eq!(h.chain.operator_reads(), 1);
    assert!(h.wallet.sent().is_empty());
}

#[tokio::test]
async fn reverted_toggle_blocks_deployment() {
    let h = Harness::new(
        FakeApi::new(),
        FakeChain::new(),
        FakeWallet::new().with_reverting_receipts(),
    );
    let mut session = h.deployer.session(owner());

    let err = session.run(h.default_params()).await.unwrap_err();

    assert!(matches!(err, DeployError::PermissionToggleFailed { .. }));
    assert_eq!(session.session().status(), SessionStatus::Failed);
    assert_eq!(h.api.calls("deploy"), 0);
    assert!(h.notifier.ids().contains(&ids::TOGGLE_OPERATOR.to_string()));
}

#[tokio::test]
async fn lazy_mode_toggles_after_success() {
    let h = Harness::build(
        FakeApi::new(),
        FakeChain::new(),
        FakeWallet::new(),
        FakeIndexer::new(),
        ToggleMode::Lazy,
    );
    let mut session = h.deployer.session(owner());

    session.run(h.default_params()).await.unwrap();

    assert_eq!(h.chain.operator_reads(), 1);
    assert_eq!(h.wallet.sent().len(), 1);
    assert_eq!(session.session().status(), SessionStatus::Succeeded);
}

#[tokio::test]
async fn lazy_toggle_failure_keeps_succeeded_state() {
    let h = Harness::build(
        FakeApi::new(),
        FakeChain::new(),
        FakeWallet::new().with_reverting_receipts(),
        FakeIndexer::new(),
        ToggleMode::Lazy,
    );
    let mut session = h.deployer.session(owner());

    let err = session.run(h.default_params()).await.unwrap_err();

    assert!(matches!(err, DeployError::PermissionToggleFailed { .. }));
    assert_eq!(session.session().status(), SessionStatus::Succeeded);
    assert_eq!(h.api.calls("deploy"), 1);
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn submission_sends_both_signatures() {
    let h = Harness::new(FakeApi::new(), FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    session.run(h.default_params()).await.unwrap();

    let requests = h.api.deploy_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].sub_account_chainer_signature, FakeWallet::signature());
    assert_eq!(requests[0].fee_estimate_signature, "0xfee5160");
    assert_eq!(requests[0].subscription_draft_id, "draft-1");
    assert_eq!(requests[0].sub_account_policy_commit, "0xc0ffee");
}

#[tokio::test]
async fn submit_without_signature_never_calls_deploy() {
    let h = Harness::new(FakeApi::new(), FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    session.precompute().await.unwrap();
    session.ensure_funded().await.unwrap();
    session.build_draft(h.default_params()).await.unwrap();
    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, DeployError::MissingPrerequisite("wallet signature")));
    assert_eq!(h.api.calls("deploy"), 0);
}

#[tokio::test]
async fn failed_submission_needs_explicit_retry() {
    let h = Harness::new(
        FakeApi::new().failing_deploys(1),
        FakeChain::new(),
        FakeWallet::new(),
    );
    let mut session = h.deployer.session(owner());

    let err = session.run(h.default_params()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(session.session().status(), SessionStatus::Submitting);
    assert!(session.session().task_id().is_none());

    // Resuming the run does not resubmit on its own.
    let err = session.run(h.default_params()).await.unwrap_err();
    assert!(matches!(err, DeployError::InvalidState(_)));
    assert_eq!(h.api.calls("deploy"), 1);

    let task_id = session.retry_submit().await.unwrap();
    assert_eq!(task_id, "task-1");
    assert_eq!(h.wallet.sign_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    let outcome = session.run(h.default_params()).await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Succeeded { .. }));
    assert_eq!(h.api.calls("deploy"), 2);
}

// =============================================================================
// Polling
// =============================================================================

#[tokio::test]
async fn failed_task_is_terminal_without_indexing() {
    let api = FakeApi::new().with_statuses(&["pending", "failed"]);
    let h = Harness::new(api, FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    let err = session.run(h.default_params()).await.unwrap_err();

    assert!(matches!(
        err,
        DeployError::TaskFailed {
            status: TaskStatus::Failed,
            ..
        }
    ));
    assert_eq!(session.session().status(), SessionStatus::Failed);
    assert_eq!(h.indexer.call_count(), 0);
}

#[tokio::test]
async fn cancelled_task_cancels_session() {
    let api = FakeApi::new().with_statuses(&["cancelled"]);
    let h = Harness::new(api, FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    let err = session.run(h.default_params()).await.unwrap_err();

    assert!(matches!(err, DeployError::TaskFailed { .. }));
    assert_eq!(session.session().status(), SessionStatus::Cancelled);
}

#[tokio::test]
async fn transient_poll_errors_and_unknown_statuses_keep_polling() {
    let api = FakeApi::new().with_statuses(&["error", "queued", "executing", "successful"]);
    let h = Harness::new(api, FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    let outcome = session.run(h.default_params()).await.unwrap();

    assert!(matches!(outcome, SessionOutcome::Succeeded { .. }));
    assert_eq!(h.api.calls("status"), 4);
}

#[tokio::test]
async fn no_poll_after_terminal_status() {
    let api = FakeApi::new().with_statuses(&["executing", "successful"]);
    let h = Harness::new(api, FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    session.run(h.default_params()).await.unwrap();
    let polls = h.api.calls("status");
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(h.api.calls("status"), polls);
    // A second poll on a settled session answers from the session.
    session.poll().await.unwrap();
    assert_eq!(h.api.calls("status"), polls);
}

#[tokio::test]
async fn poll_timeout_keeps_session_polling_until_resumed() {
    let mut config = settings(ToggleMode::BeforeDeploy);
    config.poll_timeout = Some(Duration::from_millis(100));
    let h = Harness::with_settings(
        FakeApi::new().with_statuses(&["pending"]),
        FakeChain::new().with_operator_granted(),
        FakeWallet::new(),
        FakeIndexer::new(),
        config,
    );
    let mut session = h.deployer.session(owner());

    let err = session.run(h.default_params()).await.unwrap_err();

    assert!(matches!(err, DeployError::PollTimeout { ref task_id, .. } if task_id == "task-1"));
    assert!(err.is_retryable());
    assert_eq!(session.session().status(), SessionStatus::Polling);
    assert_eq!(session.session().task_id(), Some("task-1"));

    h.api.set_statuses(&["pending", "successful"]);
    let task = session.poll().await.unwrap();

    assert_eq!(task.status, TaskStatus::Successful);
    assert_eq!(session.session().status(), SessionStatus::Succeeded);
    assert_eq!(session.session().tx_hash(), Some(output_hash()));
    assert_eq!(h.api.calls("deploy"), 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn sessions_for_different_owners_run_concurrently() {
    let h = Harness::new(
        FakeApi::new(),
        FakeChain::new().with_operator_granted(),
        FakeWallet::new(),
    );
    let mut first = h.deployer.session(owner());
    let mut second = h.deployer.session(second_owner());
    let first_params = h.default_params();
    let second_params = h
        .deployer
        .settings()
        .draft_params(second_owner(), Vec::new());

    let (first_result, second_result) =
        tokio::join!(first.run(first_params), second.run(second_params));

    assert!(matches!(first_result.unwrap(), SessionOutcome::Succeeded { .. }));
    assert!(matches!(second_result.unwrap(), SessionOutcome::Succeeded { .. }));
    assert_eq!(first.session().owner(), owner());
    assert_eq!(second.session().owner(), second_owner());
    assert_eq!(first.session().status(), SessionStatus::Succeeded);
    assert_eq!(second.session().status(), SessionStatus::Succeeded);

    assert_eq!(h.api.calls("deploy"), 2);
    let owners: Vec<_> = h
        .api
        .deploy_requests
        .lock()
        .unwrap()
        .iter()
        .map(|request| request.owner)
        .collect();
    assert!(owners.contains(&owner()));
    assert!(owners.contains(&second_owner()));
}

// =============================================================================
// Reset
// =============================================================================

#[tokio::test]
async fn reset_during_polling_discards_progress() {
    let api = FakeApi::new().with_statuses(&["pending"]);
    let h = Harness::new(api, FakeChain::new(), FakeWallet::new());
    let mut session = h.deployer.session(owner());

    let token = session.reset_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let err = session.run(h.default_params()).await.unwrap_err();

    assert!(matches!(err, DeployError::SessionReset));
    let state = session.session();
    assert_eq!(state.status(), SessionStatus::Idle);
    assert!(state.task_id().is_none());
    assert!(state.precomputed().is_none());

    let polls = h.api.calls("status");
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(h.api.calls("status"), polls);
}

#[tokio::test]
async fn terminal_session_refuses_steps_until_reset() {
    let h = Harness::new(
        FakeApi::new(),
        FakeChain::new(),
        FakeWallet::new().with_sign_behavior(SignBehavior::ReturnNothing),
    );
    let mut session = h.deployer.session(owner());
    session.run(h.default_params()).await.unwrap();

    assert!(matches!(
        session.precompute().await.unwrap_err(),
        DeployError::InvalidState(_)
    ));

    session.reset();
    session.precompute().await.unwrap();
    assert_eq!(session.session().status(), SessionStatus::Precomputing);
}
