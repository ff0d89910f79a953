//! Token amount parsing and formatting.

use crate::error::{AppError, Result};
use ethers::types::U256;
use ethers::utils::{format_units, parse_units};

/// Parse a U256 from a decimal or 0x-prefixed hex string.
pub fn parse_u256(s: &str) -> std::result::Result<U256, String> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        U256::from_str_radix(&s[2..], 16).map_err(|e| format!("Invalid hex: {} - {}", s, e))
    } else {
        // parse() on U256 treats input as hex, so decimal must go through from_dec_str
        U256::from_dec_str(s).map_err(|e| format!("Invalid decimal: {} - {}", s, e))
    }
}

/// Parse a human token amount ("1.5") into base units.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AppError::InvalidInput("Please enter a valid amount".to_string()));
    }
    if amount.starts_with('-') {
        return Err(AppError::InvalidInput(format!("Amount must be positive: {}", amount)));
    }

    let parsed = parse_units(amount, decimals as u32)
        .map_err(|e| AppError::InvalidInput(format!("Invalid amount '{}': {}", amount, e)))?;
    Ok(parsed.into())
}

/// Format base units as a human amount, trimming trailing zeros.
pub fn format_amount(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    match format_units(value, decimals as u32) {
        Ok(s) => trim_fraction(&s),
        Err(_) => value.to_string(),
    }
}

fn trim_fraction(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Serialize U256 amounts as decimal strings in JSON (matches the backend's
/// `totalBudget`/`amount` fields and keeps large values lossless).
pub mod u256_dec {
    use ethers::types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_u256(&s).map_err(serde::de::Error::custom)
    }
}

/// Optional variant of [`u256_dec`].
pub mod opt_u256_dec {
    use ethers::types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            Some(s) => super::parse_u256(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
