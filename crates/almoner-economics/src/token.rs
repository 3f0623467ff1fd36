// crates/almoner-economics/src/token.rs
//
// Whole-token display and exact decimal parsing.
//
// Every asset the engine touches uses 18 decimals: 1 token = 10^18 units.
// All internal accounting is in integer units; decimal strings appear only
// at the configuration boundary and in log output.

use std::fmt;

use serde::{Deserialize, Serialize};

use almoner_core::error::AlmonerError;
use almoner_core::Amount;

/// Number of decimals of every tracked asset.
pub const DECIMALS: u32 = 18;

/// Smallest units per whole token. 1 token = 10^18 units.
pub const WAD: Amount = 1_000_000_000_000_000_000;

/// Express `whole` tokens in smallest units.
pub const fn tokens(whole: u64) -> Amount {
    whole as Amount * WAD
}

/// A token amount that displays as a decimal number of whole tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Units(pub Amount);

impl Units {
    /// Parse a decimal string of whole tokens, e.g. `"13.37"`, exactly.
    ///
    /// # Errors
    /// Returns `AlmonerError::Config` for malformed input, more than 18
    /// fractional digits, or a value that does not fit in `u128`.
    pub fn parse(input: &str) -> Result<Self, AlmonerError> {
        let trimmed = input.trim().replace('_', "");
        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w.to_string(), f.to_string()),
            None => (trimmed.clone(), String::new()),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AlmonerError::Config(format!("empty amount '{}'", input)));
        }
        if frac.len() > DECIMALS as usize {
            return Err(AlmonerError::Config(format!(
                "amount '{}' has more than {} fractional digits",
                input, DECIMALS
            )));
        }
        let digits_ok = whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit());
        if !digits_ok {
            return Err(AlmonerError::Config(format!("malformed amount '{}'", input)));
        }

        let overflow = || AlmonerError::Config(format!("amount '{}' is too large", input));
        let whole_units: Amount = if whole.is_empty() {
            0
        } else {
            whole.parse::<Amount>().map_err(|_| overflow())?
        };
        let frac_units: Amount = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            padded.parse::<Amount>().map_err(|_| overflow())?
        };
        whole_units
            .checked_mul(WAD)
            .and_then(|w| w.checked_add(frac_units))
            .map(Units)
            .ok_or_else(overflow)
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WAD;
        let frac = self.0 % WAD;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            // Up to 18 decimal places, trailing zeros trimmed
            let frac_str = format!("{:018}", frac);
            write!(f, "{}.{}", whole, frac_str.trim_end_matches('0'))
        }
    }
}

/// Serde adapter for amounts written as decimal strings of whole tokens.
///
/// TOML integers stop at `i64`, which cannot hold 18-decimal amounts, so
/// configuration carries amounts as strings: `minimum_stake = "13.37"`.
pub mod decimal_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Units;
    use almoner_core::Amount;

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Units(*amount).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Units::parse(&raw)
            .map(|u| u.0)
            .map_err(serde::de::Error::custom)
    }
}
