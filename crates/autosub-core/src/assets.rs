//! Asset balance listing for a holder, with likely-scam tokens filtered out.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::chain::{ChainReader, abi};
use crate::error::Result;
use crate::types::amount::format_units;
use crate::types::{Address, NATIVE_TOKEN, U256};

/// Token names containing any of these words are treated as spam airdrops.
pub const SCAM_TOKEN_WORDS: [&str; 5] = ["claim", "visit", "airdrop", "rewards", "http"];

/// A token to list, as configured under `[[assets]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Token contract, or the native-currency sentinel.
    pub token: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

impl AssetSpec {
    pub fn native() -> Self {
        Self {
            token: NATIVE_TOKEN,
            name: Some("Ether".to_string()),
            symbol: Some("ETH".to_string()),
            decimals: Some(18),
        }
    }

    pub fn is_native(&self) -> bool {
        self.token == NATIVE_TOKEN
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetBalance {
    pub token: Address,
    pub holder: Address,
    /// `None` when the balance could not be read.
    pub value: Option<U256>,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl AssetBalance {
    pub fn display_value(&self) -> String {
        match self.value {
            Some(value) => format_units(value, self.decimals),
            None => "-".to_string(),
        }
    }
}

pub fn is_likely_scam(name: &str) -> bool {
    let lower = name.to_lowercase();
    SCAM_TOKEN_WORDS.iter().any(|word| lower.contains(word))
}

/// Drop zero balances and likely-scam tokens, largest balances first.
///
/// Assets whose balance could not be read are kept and listed last.
pub fn filter_balances(balances: Vec<AssetBalance>) -> Vec<AssetBalance> {
    let mut kept: Vec<AssetBalance> = balances
        .into_iter()
        .filter(|asset| asset.value.is_none_or(|v| !v.is_zero()))
        .filter(|asset| !is_likely_scam(&asset.name))
        .collect();
    kept.sort_by(compare_assets);
    kept
}

fn compare_assets(a: &AssetBalance, b: &AssetBalance) -> Ordering {
    match (a.value, b.value) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Read balances of `assets` held by `holder`.
///
/// Missing metadata is read from the token contract; a failed balance read
/// is logged and reported as an unknown value.
pub async fn fetch_balances(
    chain: &dyn ChainReader,
    holder: Address,
    assets: &[AssetSpec],
) -> Result<Vec<AssetBalance>> {
    let mut out = Vec::with_capacity(assets.len());
    for spec in assets {
        let value = if spec.is_native() {
            chain.native_balance(holder).await
        } else {
            chain.erc20_balance(spec.token, holder).await
        };
        let value = match value {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::warn!(token = %spec.token, %holder, error = %err, "balance read failed");
                None
            }
        };

        let (name, symbol, decimals) = metadata(chain, spec).await;
        out.push(AssetBalance {
            token: spec.token,
            holder,
            value,
            name,
            symbol,
            decimals,
        });
    }
    Ok(out)
}

async fn metadata(chain: &dyn ChainReader, spec: &AssetSpec) -> (String, String, u8) {
    let name = match &spec.name {
        Some(name) => name.clone(),
        None => read_or(chain, spec.token, abi::name_calldata(), abi::decode_name)
            .await
            .unwrap_or_default(),
    };
    let symbol = match &spec.symbol {
        Some(symbol) => symbol.clone(),
        None => read_or(chain, spec.token, abi::symbol_calldata(), abi::decode_symbol)
            .await
            .unwrap_or_else(|| "???".to_string()),
    };
    let decimals = match spec.decimals {
        Some(decimals) => decimals,
        None => read_or(chain, spec.token, abi::decimals_calldata(), abi::decode_decimals)
            .await
            .unwrap_or(18),
    };
    (name, symbol, decimals)
}

async fn read_or<T>(
    chain: &dyn ChainReader,
    token: Address,
    calldata: crate::types::Bytes,
    decode: fn(&[u8]) -> Result<T>,
) -> Option<T> {
    match chain.call(token, calldata).await.and_then(|data| decode(&data)) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(%token, error = %err, "token metadata read failed");
            None
        }
    }
}
