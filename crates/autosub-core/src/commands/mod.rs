//! High-level commands for autosub operations.
//!
//! Each command takes an [`AppContext`], builds the services it needs from
//! the resolved configuration and returns a serializable report for the
//! frontend to render.

pub mod balances;
pub mod config;
pub mod deploy;
pub mod precompute;
pub mod status;

pub use balances::{BalancesCommand, BalancesOptions, BalancesReport};
pub use config::{ConfigCommand, ConfigEntry, ConfigReport};
pub use deploy::{DeployCommand, DeployOptions, DeployReport};
pub use precompute::{PrecomputeCommand, PrecomputeOptions, PrecomputeReport};
pub use status::{StatusCommand, StatusOptions, StatusReport};

use anyhow::Context;

use crate::chain::RpcWallet;
use crate::context::AppContext;
use crate::config::Settings;
use crate::types::Address;

/// The explicit owner, or the first account the wallet endpoint exposes.
pub(crate) async fn resolve_owner(
    ctx: &AppContext,
    settings: &Settings,
    owner: Option<Address>,
) -> anyhow::Result<Address> {
    if let Some(owner) = owner {
        return Ok(owner);
    }
    let wallet = ctx.wallet(settings)?;
    first_account(&wallet).await
}

pub(crate) async fn first_account(wallet: &RpcWallet) -> anyhow::Result<Address> {
    let accounts = wallet
        .accounts()
        .await
        .context("Failed to list wallet accounts")?;
    accounts
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Wallet exposes no accounts; pass --owner explicitly"))
}
