//! Decimal-string encoding for on-chain amounts.
//!
//! The deployer service exchanges amounts as base-10 strings in the smallest
//! denomination (`"1000000000000000"`).

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serializer, de};

pub fn parse_amount(raw: &str) -> Result<U256, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("amount is empty".to_string());
    }
    if let Some(hex) = raw.strip_prefix("0x") {
        return U256::from_str_radix(hex, 16).map_err(|e| format!("invalid hex amount '{raw}': {e}"));
    }
    U256::from_str_radix(raw, 10).map_err(|e| format!("invalid amount '{raw}': {e}"))
}

/// Format a raw amount with `decimals` fractional digits, trimming trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac}")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(u64),
}

/// `#[serde(with = "decimal")]` for `U256` fields.
pub mod decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match RawAmount::deserialize(deserializer)? {
            RawAmount::Text(s) => parse_amount(&s).map_err(de::Error::custom),
            RawAmount::Number(n) => Ok(U256::from(n)),
        }
    }
}

/// `#[serde(with = "decimal_opt")]` for `Option<U256>` fields; empty strings decode as `None`.
pub mod decimal_opt {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        match Option::<RawAmount>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawAmount::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(RawAmount::Text(s)) => parse_amount(&s).map(Some).map_err(de::Error::custom),
            Some(RawAmount::Number(n)) => Ok(Some(U256::from(n))),
        }
    }
}
