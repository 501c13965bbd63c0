//! Operator permission guard.
//!
//! Reads `operators(owner, sub_account)` and only sends `toggleOperator`
//! when the permission is absent. A grant recorded in the session is
//! trusted without another read.

use std::sync::Arc;

use crate::chain::{ChainReader, TransactionRequest, WalletProvider};
use crate::error::{DeployError, OnChainAction, Result};
use crate::notify::{Notice, Notifier, ids};
use crate::session::{DeploymentSession, PermissionGrant};
use crate::types::Address;

pub struct PermissionGuard {
    chain: Arc<dyn ChainReader>,
    wallet: Arc<dyn WalletProvider>,
    notifier: Arc<dyn Notifier>,
    operator_contract: Address,
}

impl PermissionGuard {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        wallet: Arc<dyn WalletProvider>,
        notifier: Arc<dyn Notifier>,
        operator_contract: Address,
    ) -> Self {
        Self {
            chain,
            wallet,
            notifier,
            operator_contract,
        }
    }

    pub async fn ensure_permission(
        &self,
        session: &mut DeploymentSession,
    ) -> Result<PermissionGrant> {
        if let Some(grant) = session.permission() {
            return Ok(grant);
        }
        let sub_account = session
            .sub_account()
            .ok_or(DeployError::MissingPrerequisite("sub-account address"))?;

        let result = self.grant(session.owner(), sub_account).await;
        let grant = super::notify_failure(
            self.notifier.as_ref(),
            ids::TOGGLE_OPERATOR,
            result.map_err(DeployError::permission_toggle),
        )?;
        session.record_permission(grant);
        Ok(grant)
    }

    async fn grant(&self, owner: Address, sub_account: Address) -> Result<PermissionGrant> {
        let current = self
            .chain
            .operator_permission(self.operator_contract, owner, sub_account)
            .await?;
        if !current.is_zero() {
            tracing::info!(%owner, %sub_account, "operator permission already granted");
            return Ok(PermissionGrant::AlreadyGranted);
        }

        self.notifier.notify(Notice::loading(
            ids::TOGGLE_OPERATOR,
            "Enabling automated claiming...",
        ));
        let tx = TransactionRequest::toggle_operator(self.operator_contract, owner, sub_account);
        let tx_hash = self.wallet.send_transaction(owner, tx).await?;
        let receipt = self.wallet.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(DeployError::on_chain(
                OnChainAction::ToggleOperator,
                format!("transaction {tx_hash} did not succeed"),
            ));
        }

        tracing::info!(%owner, %sub_account, %tx_hash, "operator permission granted");
        Ok(PermissionGrant::Granted { tx_hash })
    }
}
