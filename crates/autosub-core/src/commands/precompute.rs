//! Precompute command implementation.
//!
//! Asks the deployer service where the sub-account will live and what the
//! setup fee is, then reports whether the target already holds the fee.
//! Nothing is signed or sent.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::chain::ChainReader;
use crate::context::AppContext;
use crate::deploy::AddressPrecomputer;
use crate::notify::{Notifier, TracingNotifier};
use crate::session::DeploymentSession;
use crate::types::amount::{decimal, decimal_opt, format_units};
use crate::types::{Address, ChainId, NATIVE_TOKEN, U256};

/// Options for precomputing a deployment target
#[derive(Debug, Clone, Default)]
pub struct PrecomputeOptions {
    /// Subscription owner (None = first wallet account)
    pub owner: Option<Address>,
    /// Fee token override (None = configured fee token)
    pub fee_token: Option<Address>,
    /// Skip the on-chain balance read
    pub skip_balance: bool,
}

impl PrecomputeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_fee_token(mut self, fee_token: Address) -> Self {
        self.fee_token = Some(fee_token);
        self
    }

    pub fn with_skip_balance(mut self, skip: bool) -> Self {
        self.skip_balance = skip;
        self
    }
}

/// Result of a precompute
#[derive(Debug, Clone, Serialize)]
pub struct PrecomputeReport {
    pub owner: Address,
    pub chain_id: ChainId,
    pub fee_token: Address,
    /// Address the sub-account console will be deployed at
    pub target: Address,
    #[serde(with = "decimal")]
    pub fee_estimate: U256,
    /// Fee in whole native units, for display
    pub fee_display: String,
    /// Native balance of the target, when it was read
    #[serde(with = "decimal_opt")]
    pub target_balance: Option<U256>,
    /// Whether the target balance already covers the fee
    pub covered: Option<bool>,
}

/// Precompute command orchestrator
pub struct PrecomputeCommand {
    ctx: AppContext,
    notifier: Arc<dyn Notifier>,
}

impl PrecomputeCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub async fn execute(&self, options: &PrecomputeOptions) -> anyhow::Result<PrecomputeReport> {
        let settings = self.ctx.settings()?;
        let owner = super::resolve_owner(&self.ctx, &settings, options.owner).await?;
        let fee_token = options.fee_token.unwrap_or(settings.fee_token);

        let precomputer =
            AddressPrecomputer::new(self.ctx.deployer_api(&settings)?, self.notifier.clone());
        let mut session = DeploymentSession::new(owner, settings.chain_id, fee_token);
        let precomputed = precomputer
            .precompute(&mut session)
            .await
            .with_context(|| format!("Failed to precompute deployment address for {}", owner))?;
        let fee_estimate = precomputed.quote.amount();

        let target_balance = if options.skip_balance || settings.rpc_url.is_none() {
            None
        } else {
            let chain = self.ctx.chain(&settings)?;
            let read = if fee_token == NATIVE_TOKEN {
                chain.native_balance(precomputed.target).await
            } else {
                chain.erc20_balance(fee_token, precomputed.target).await
            };
            match read {
                Ok(balance) => Some(balance),
                Err(err) => {
                    tracing::warn!(target = %precomputed.target, error = %err, "target balance read failed");
                    None
                }
            }
        };

        Ok(PrecomputeReport {
            owner,
            chain_id: settings.chain_id,
            fee_token,
            target: precomputed.target,
            fee_estimate,
            fee_display: format_units(fee_estimate, 18),
            target_balance,
            covered: target_balance.map(|balance| balance >= fee_estimate),
        })
    }
}
