//! Automation policy committed to by a subscription draft.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, U256, amount::decimal};

/// Token limits and lifetime of an automation subscription.
///
/// Serialized as the deployer's `automationSubscriptionLimits` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationPolicy {
    /// Seconds the subscription stays valid; `0` means unbounded.
    pub duration: u64,
    /// Tokens the automation may receive, with a per-token cap.
    #[serde(with = "decimal_map")]
    pub token_inputs: BTreeMap<Address, U256>,
    /// Tokens the automation may spend, with a per-token limit.
    #[serde(with = "decimal_map")]
    pub token_limits: BTreeMap<Address, U256>,
}

impl AutomationPolicy {
    pub fn unbounded() -> Self {
        Self {
            duration: 0,
            token_inputs: BTreeMap::new(),
            token_limits: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, token: Address, cap: U256) -> Self {
        self.token_inputs.insert(token, cap);
        self
    }

    pub fn with_limit(mut self, token: Address, limit: U256) -> Self {
        self.token_limits.insert(token, limit);
        self
    }
}

/// Reward schedule attached to the subscription as metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSchedule {
    /// Interval between automation runs, in seconds (sent as a string).
    #[serde(with = "seconds_string")]
    pub every: u64,
    /// Beneficiary of the rewards.
    pub user_address: Address,
    pub reward_token: Address,
}

/// A token deposited into the sub-account at deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingInput {
    pub token: Address,
    #[serde(with = "decimal")]
    pub amount: U256,
}

/// Everything a draft commits to besides the fee quote.
///
/// Kept with the draft so address resolution and deployment resend exactly
/// the parameters that were signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftParams {
    pub funding: Vec<FundingInput>,
    pub policy: AutomationPolicy,
    pub schedule: RewardSchedule,
}

/// Split funding inputs into the parallel `tokens` / `amounts` arrays the
/// deployer expects.
pub fn split_funding(inputs: &[FundingInput]) -> (Vec<Address>, Vec<String>) {
    inputs
        .iter()
        .map(|input| (input.token, input.amount.to_string()))
        .unzip()
}

mod decimal_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer, de, ser::SerializeMap};

    use crate::types::amount::parse_amount;
    use crate::types::{Address, U256};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<Address, U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (token, value) in map {
            out.serialize_entry(&token.to_checksum(None), &value.to_string())?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Address, U256>, D::Error> {
        let raw = BTreeMap::<Address, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(token, value)| {
                parse_amount(&value)
                    .map(|v| (token, v))
                    .map_err(de::Error::custom)
            })
            .collect()
    }
}

mod seconds_string {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
            Raw::Number(n) => Ok(n),
        }
    }
}
