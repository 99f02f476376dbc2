//! Bonding curve state and constant-product pricing.
//!
//! All amount-affecting math is integer-only. The on-chain program quotes with
//! the same widened integer arithmetic, so any float on these paths could
//! diverge by a lamport and get a transaction rejected on its minimum-output
//! bound. The single float here, [`price_per_token`], is display-only.

use borsh::BorshDeserialize;
use solana_sdk::pubkey::Pubkey;

use crate::error::PumpError;
use crate::pump::constants::{
    BONDING_CURVE_ACCOUNT_DISCRIMINATOR, INITIAL_VIRTUAL_SOL_RESERVES,
    INITIAL_VIRTUAL_TOKEN_RESERVES,
};

/// Fixed reserve fields at the front of the BondingCurve account.
#[derive(Debug, Clone, BorshDeserialize)]
struct CurveFields {
    virtual_token_reserves: u64,
    virtual_sol_reserves: u64,
    real_token_reserves: u64,
    real_sol_reserves: u64,
    token_total_supply: u64,
    complete: bool,
}

/// Read-only snapshot of a bonding curve account.
#[derive(Debug, Clone)]
pub struct CurveState {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub token_total_supply: u64,
    pub complete: bool,
    /// Absent on curves created before the program tracked creators.
    pub creator: Option<Pubkey>,
}

impl CurveState {
    /// Decode raw account bytes: 8-byte account discriminator, five u64
    /// little-endian reserves, a completion flag, and (on newer curves) the
    /// creator pubkey.
    pub fn decode(data: &[u8]) -> Result<Self, PumpError> {
        if data.len() < 8 {
            return Err(PumpError::CurveDecode(format!(
                "account data too short: {} bytes",
                data.len()
            )));
        }
        if data[..8] != BONDING_CURVE_ACCOUNT_DISCRIMINATOR {
            return Err(PumpError::CurveDecode(
                "account discriminator mismatch".to_string(),
            ));
        }

        let mut rest = &data[8..];
        let fields = CurveFields::deserialize(&mut rest)
            .map_err(|e| PumpError::CurveDecode(e.to_string()))?;

        let creator = if rest.len() >= 32 {
            let mut key = [0u8; 32];
            key.copy_from_slice(&rest[..32]);
            Some(Pubkey::new_from_array(key))
        } else {
            None
        };

        Ok(Self {
            virtual_token_reserves: fields.virtual_token_reserves,
            virtual_sol_reserves: fields.virtual_sol_reserves,
            real_token_reserves: fields.real_token_reserves,
            real_sol_reserves: fields.real_sol_reserves,
            token_total_supply: fields.token_total_supply,
            complete: fields.complete,
            creator,
        })
    }

    /// Curve creator, falling back for legacy curves that never recorded one.
    pub fn creator_or(&self, fallback: Pubkey) -> Pubkey {
        self.creator.unwrap_or(fallback)
    }
}

/// SOL received for selling `token_amount_in` against the given reserves.
///
/// k = vsr * vtr (widened to u128); sol_out = vsr - k / (vtr + in), floored.
pub fn quote_sol_out(token_amount_in: u64, virtual_token: u64, virtual_sol: u64) -> u64 {
    if token_amount_in == 0 || virtual_token == 0 {
        return 0;
    }
    let k = virtual_sol as u128 * virtual_token as u128;
    let new_virtual_token = virtual_token as u128 + token_amount_in as u128;
    let new_virtual_sol = k / new_virtual_token;
    // new_virtual_sol <= virtual_sol, so this fits back in u64.
    (virtual_sol as u128 - new_virtual_sol) as u64
}

/// Tokens received for spending `sol_amount_in` against the given reserves.
pub fn quote_tokens_out(sol_amount_in: u64, virtual_token: u64, virtual_sol: u64) -> u64 {
    if sol_amount_in == 0 || virtual_sol == 0 {
        return 0;
    }
    let k = virtual_token as u128 * virtual_sol as u128;
    let new_virtual_sol = virtual_sol as u128 + sol_amount_in as u128;
    let new_virtual_token = k / new_virtual_sol;
    (virtual_token as u128 - new_virtual_token) as u64
}

/// Tokens received for the initial buy bundled with a launch, quoted against
/// the protocol's fixed initial reserves.
pub fn quote_initial_buy(sol_amount_in: u64) -> u64 {
    quote_tokens_out(
        sol_amount_in,
        INITIAL_VIRTUAL_TOKEN_RESERVES,
        INITIAL_VIRTUAL_SOL_RESERVES,
    )
}

/// Spot price in lamports per token unit. Display only: never feeds a signed
/// amount.
pub fn price_per_token(virtual_token: u64, virtual_sol: u64) -> f64 {
    if virtual_token == 0 {
        return 0.0;
    }
    virtual_sol as f64 / virtual_token as f64
}

/// Lower a quoted output by `slippage_bps` basis points (worst acceptable
/// output bound).
pub fn apply_slippage_down(amount: u64, slippage_bps: u16) -> u64 {
    let bps = (slippage_bps as u128).min(10_000);
    (amount as u128 * (10_000 - bps) / 10_000) as u64
}

/// Raise a spend cap by `slippage_bps` basis points.
pub fn apply_slippage_up(amount: u64, slippage_bps: u16) -> u64 {
    let raised = amount as u128 * (10_000 + slippage_bps as u128) / 10_000;
    u64::try_from(raised).unwrap_or(u64::MAX)
}
