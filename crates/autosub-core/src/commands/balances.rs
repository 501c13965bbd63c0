//! Balances command implementation.
//!
//! Lists configured asset balances for a holder. Without an explicit holder
//! the owner's precomputed deployment target is used.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::assets::{AssetBalance, fetch_balances, filter_balances};
use crate::context::AppContext;
use crate::deploy::AddressPrecomputer;
use crate::notify::NullNotifier;
use crate::session::DeploymentSession;
use crate::types::Address;

#[derive(Debug, Clone, Default)]
pub struct BalancesOptions {
    /// Address to list (None = precomputed target of `owner`)
    pub holder: Option<Address>,
    /// Owner whose target is listed when no holder is given
    pub owner: Option<Address>,
    /// Include zero balances and likely-scam tokens
    pub all: bool,
}

impl BalancesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holder(mut self, holder: Address) -> Self {
        self.holder = Some(holder);
        self
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BalancesReport {
    pub holder: Address,
    pub assets: Vec<AssetBalance>,
    /// Number of assets filtered out
    pub hidden: usize,
}

pub struct BalancesCommand {
    ctx: AppContext,
}

impl BalancesCommand {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, options: &BalancesOptions) -> anyhow::Result<BalancesReport> {
        let settings = self.ctx.settings()?;
        let chain = self.ctx.chain(&settings)?;

        let holder = match options.holder {
            Some(holder) => holder,
            None => {
                let owner = super::resolve_owner(&self.ctx, &settings, options.owner).await?;
                let precomputer =
                    AddressPrecomputer::new(self.ctx.deployer_api(&settings)?, Arc::new(NullNotifier));
                let mut session =
                    DeploymentSession::new(owner, settings.chain_id, settings.fee_token);
                precomputer
                    .precompute(&mut session)
                    .await
                    .with_context(|| format!("Failed to resolve deployment target for {}", owner))?
                    .target
            }
        };

        let balances = fetch_balances(chain.as_ref(), holder, &settings.assets)
            .await
            .with_context(|| format!("Failed to read balances for {}", holder))?;
        let total = balances.len();
        let assets = if options.all {
            balances
        } else {
            filter_balances(balances)
        };

        Ok(BalancesReport {
            holder,
            hidden: total - assets.len(),
            assets,
        })
    }
}
