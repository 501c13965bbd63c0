//! Configuration layer merging
//!
//! Global -> Project; a value set in a later layer wins.

use super::schema::AutosubConfig;

/// Merge the global and project layers.
pub fn merge_configs(global: Option<AutosubConfig>, project: Option<AutosubConfig>) -> AutosubConfig {
    let mut merged = global.unwrap_or_default();
    if let Some(project) = project {
        overlay(&mut merged, project);
    }
    merged
}

fn overlay(base: &mut AutosubConfig, layer: AutosubConfig) {
    macro_rules! take {
        ($($field:ident),* $(,)?) => {
            $(
                if layer.$field.is_some() {
                    base.$field = layer.$field;
                }
            )*
        };
    }

    take!(
        api_url,
        api_key,
        rpc_url,
        wallet_rpc_url,
        chain_id,
        fee_token,
        registry_id,
        operator_address,
        reward_token,
        reward_interval,
        reward_token_limit,
        explorer_url,
        indexer_url,
        indexer_api_key,
        poll_interval_secs,
        poll_timeout_secs,
        request_timeout_secs,
        toggle_mode,
    );

    // Asset lists replace rather than append so a project can narrow them.
    if !layer.assets.is_empty() {
        base.assets = layer.assets;
    }
}
