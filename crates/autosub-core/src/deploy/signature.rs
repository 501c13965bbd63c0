//! Wallet signature acquisition for the subscription draft.

use std::sync::Arc;

use crate::chain::WalletProvider;
use crate::error::{DeployError, Result};
use crate::notify::{Notifier, ids};
use crate::session::DeploymentSession;
use crate::types::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    Signed(Bytes),
    /// The user declined to sign.
    Declined,
}

pub struct SignatureCollector {
    wallet: Arc<dyn WalletProvider>,
    notifier: Arc<dyn Notifier>,
}

impl SignatureCollector {
    pub fn new(wallet: Arc<dyn WalletProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self { wallet, notifier }
    }

    /// Ask the owner's wallet to sign the draft's typed data.
    pub async fn collect(&self, session: &mut DeploymentSession) -> Result<SignatureOutcome> {
        if let Some(signature) = session.signature() {
            return Ok(SignatureOutcome::Signed(signature.clone()));
        }
        let draft = session
            .draft()
            .ok_or(DeployError::MissingPrerequisite("subscription draft"))?;

        let signed = self
            .wallet
            .sign_typed_data(session.owner(), &draft.payload)
            .await;
        match signed {
            Ok(Some(signature)) => {
                session.record_signature(signature.clone())?;
                tracing::info!(owner = %session.owner(), "draft signed");
                Ok(SignatureOutcome::Signed(signature))
            }
            Ok(None) | Err(DeployError::UserRejected) => {
                tracing::info!(owner = %session.owner(), "signature declined");
                Ok(SignatureOutcome::Declined)
            }
            Err(err) => super::notify_failure(self.notifier.as_ref(), ids::SETUP_ERROR, Err(err)),
        }
    }
}
