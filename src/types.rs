//! Core types shared across the soulmint trading client.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::error::PumpError;
use crate::pump::constants::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_SYMBOL_LEN};
use crate::pump::instructions::{check_https, check_len};

/// Token metadata supplied at launch. Image and socials are optional; URLs
/// must be https.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image_url: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
}

impl TokenMetadata {
    pub fn validate(&self) -> Result<(), PumpError> {
        check_len("name", &self.name, MAX_NAME_LEN)?;
        check_len("symbol", &self.symbol, MAX_SYMBOL_LEN)?;
        check_len("description", &self.description, MAX_DESCRIPTION_LEN)?;
        for (field, value) in [
            ("image_url", &self.image_url),
            ("twitter", &self.twitter),
            ("telegram", &self.telegram),
            ("website", &self.website),
        ] {
            if let Some(url) = value {
                check_https(field, url)?;
            }
        }
        Ok(())
    }
}

/// How much of a position to sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellAmount {
    All,
    /// Whole percent of the current balance, 1..=100.
    Percent(u8),
    /// Exact raw token units.
    Tokens(u64),
}

#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    pub mint: Pubkey,
    pub signature: Signature,
    pub pump_url: String,
    pub tokens_bought: u64,
}

#[derive(Debug, Clone)]
pub struct SellOutcome {
    pub signature: Signature,
    pub tokens_sold: u64,
    pub expected_sol_lamports: u64,
    pub min_sol_lamports: u64,
}

#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub vault: Pubkey,
    pub vault_lamports: u64,
    /// Absent when the vault held only dust and no transaction was sent.
    pub signature: Option<Signature>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> TokenMetadata {
        TokenMetadata {
            name: "Token".into(),
            symbol: "TOK".into(),
            description: "A token".into(),
            image_url: Some("https://example.com/i.png".into()),
            twitter: None,
            telegram: None,
            website: None,
        }
    }

    #[test]
    fn valid_metadata_passes() {
        meta().validate().unwrap();
    }

    #[test]
    fn oversized_and_insecure_fields_fail() {
        let mut m = meta();
        m.description = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(m.validate().is_err());

        let mut m = meta();
        m.website = Some("http://plain.example".into());
        assert!(matches!(
            m.validate(),
            Err(PumpError::Validation { field: "website", .. })
        ));
    }
}
