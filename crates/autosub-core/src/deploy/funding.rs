//! Balance gate: make sure the precomputed target can pay its setup fee.

use std::sync::Arc;

use crate::chain::{ChainReader, TransactionRequest, WalletProvider};
use crate::error::{DeployError, OnChainAction, Result};
use crate::notify::{Notice, Notifier, ids};
use crate::session::DeploymentSession;
use crate::types::{Address, B256, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingOutcome {
    /// The quoted fee is zero; nothing was read.
    NoFeeRequired,
    /// The target already held enough native currency.
    Covered,
    /// The shortfall was transferred and confirmed.
    Transferred { amount: U256, tx_hash: B256 },
}

pub struct BalanceGate {
    chain: Arc<dyn ChainReader>,
    wallet: Arc<dyn WalletProvider>,
    notifier: Arc<dyn Notifier>,
}

impl BalanceGate {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        wallet: Arc<dyn WalletProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            chain,
            wallet,
            notifier,
        }
    }

    /// Ensure the target holds at least the quoted fee.
    ///
    /// The session is only marked funded once the check passed or the
    /// transfer was confirmed; failures leave it untouched.
    pub async fn ensure_funded(&self, session: &mut DeploymentSession) -> Result<FundingOutcome> {
        let target = session
            .target()
            .ok_or(DeployError::MissingPrerequisite("precomputed target"))?;
        let fee = session
            .fee_estimate()
            .ok_or(DeployError::MissingPrerequisite("fee quote"))?;

        if fee.is_zero() {
            tracing::debug!(%target, "zero setup fee, skipping balance check");
            session.mark_funded();
            return Ok(FundingOutcome::NoFeeRequired);
        }

        let result = self.fund(session, target, fee).await;
        let outcome = super::notify_failure(
            self.notifier.as_ref(),
            ids::DEPOSIT_CHECK,
            result.map_err(DeployError::funding),
        )?;
        session.mark_funded();
        Ok(outcome)
    }

    async fn fund(
        &self,
        session: &DeploymentSession,
        target: Address,
        fee: U256,
    ) -> Result<FundingOutcome> {
        let balance = self.chain.native_balance(target).await?;
        if balance >= fee {
            tracing::debug!(%target, %balance, %fee, "target balance covers fee");
            return Ok(FundingOutcome::Covered);
        }

        let shortfall = fee - balance;
        tracing::info!(%target, %balance, %fee, %shortfall, "funding deployment target");
        self.notifier.notify(Notice::loading(
            ids::DEPOSIT_CHECK,
            "Depositing setup fee...",
        ));

        let tx_hash = self
            .wallet
            .send_transaction(session.owner(), TransactionRequest::transfer(target, shortfall))
            .await?;
        let receipt = self.wallet.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(DeployError::on_chain(
                OnChainAction::FundingTransfer,
                format!("transaction {tx_hash} reverted"),
            ));
        }

        Ok(FundingOutcome::Transferred {
            amount: shortfall,
            tx_hash,
        })
    }
}
