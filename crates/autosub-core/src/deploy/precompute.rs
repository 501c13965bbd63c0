//! Address precomputation and fee quoting.

use std::sync::Arc;

use crate::api::{DeployerApi, Precomputed, PrecomputeRequest, PrecomputeResponse};
use crate::error::{DeployError, Result};
use crate::notify::{Notifier, ids};
use crate::session::{DeploymentSession, FeeQuote};

pub struct AddressPrecomputer {
    api: Arc<dyn DeployerApi>,
    notifier: Arc<dyn Notifier>,
}

impl AddressPrecomputer {
    pub fn new(api: Arc<dyn DeployerApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Fetch the deterministic target and a fresh fee quote for the session.
    ///
    /// Calling again replaces the previous quote.
    pub async fn precompute(&self, session: &mut DeploymentSession) -> Result<Precomputed> {
        let result = self.fetch(session).await;
        let precomputed =
            super::notify_failure(self.notifier.as_ref(), ids::COMPUTE_ADDRESS_ERROR, result)?;
        session.record_precompute(precomputed.clone())?;

        tracing::info!(
            owner = %session.owner(),
            chain_id = session.chain_id(),
            target = %precomputed.target,
            fee = %precomputed.quote.amount(),
            "precomputed deployment target"
        );
        Ok(precomputed)
    }

    async fn fetch(&self, session: &DeploymentSession) -> Result<Precomputed> {
        let request = PrecomputeRequest {
            owner: session.owner(),
            chain_id: session.chain_id(),
            fee_token: session.fee_token(),
        };
        let response = self.api.precompute(&request).await?;
        validate(&request, response)
    }
}

fn validate(request: &PrecomputeRequest, response: PrecomputeResponse) -> Result<Precomputed> {
    let target = response
        .precomputed_address
        .ok_or(DeployError::InvalidPrecomputeResponse {
            missing: "precomputedAddress",
        })?;
    let amount = response
        .fee_estimate
        .ok_or(DeployError::InvalidPrecomputeResponse {
            missing: "feeEstimate",
        })?;
    let signature = response
        .fee_estimate_signature
        .filter(|s| !s.is_empty())
        .ok_or(DeployError::InvalidPrecomputeResponse {
            missing: "feeEstimateSignature",
        })?;

    Ok(Precomputed {
        target,
        quote: FeeQuote::new(
            request.owner,
            request.chain_id,
            request.fee_token,
            amount,
            signature,
        ),
    })
}
