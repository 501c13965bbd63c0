//! Hex codec for chain ids.
//!
//! The deployer service encodes the typed-data domain chain id as a hex string
//! (`"0x783"`); wallets expect a number.

use crate::error::{DeployError, RemoteCall};

use super::ChainId;

pub fn encode_chain_id(chain_id: ChainId) -> String {
    format!("{chain_id:#x}")
}

pub fn decode_chain_id(raw: &str) -> Result<ChainId, DeployError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| {
            DeployError::invalid(
                RemoteCall::GenerateSignaturePayload,
                format!("domain chain id '{raw}' is not hex encoded"),
            )
        })?;

    if digits.is_empty() {
        return Err(DeployError::invalid(
            RemoteCall::GenerateSignaturePayload,
            "domain chain id is empty",
        ));
    }

    ChainId::from_str_radix(digits, 16).map_err(|e| {
        DeployError::invalid(
            RemoteCall::GenerateSignaturePayload,
            format!("domain chain id '{raw}': {e}"),
        )
    })
}
