//! Program-derived address derivation.
//!
//! All seed layouts here mirror the pump.fun IDL. Derivation is deterministic:
//! identical seeds and program id always produce the identical address and
//! bump. If a derivation here ever disagreed with the on-chain program's own,
//! the failure would only show up as a rejected transaction at dispatch.

use solana_sdk::pubkey::Pubkey;

use crate::error::PumpError;
use crate::pump::constants::*;

fn find_pda(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), PumpError> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or(PumpError::Derivation)
}

/// Bonding curve account for a mint.
pub fn derive_bonding_curve(mint: &Pubkey) -> Result<(Pubkey, u8), PumpError> {
    find_pda(&[SEED_BONDING_CURVE, mint.as_ref()], &PUMP_PROGRAM_ID)
}

/// Token account owned by a bonding curve (standard associated-token seeds).
pub fn derive_associated_bonding_curve(
    bonding_curve: &Pubkey,
    mint: &Pubkey,
) -> Result<(Pubkey, u8), PumpError> {
    derive_associated_token(bonding_curve, mint)
}

/// A wallet's associated token account for a mint.
pub fn derive_associated_token(owner: &Pubkey, mint: &Pubkey) -> Result<(Pubkey, u8), PumpError> {
    find_pda(
        &[owner.as_ref(), spl_token::ID.as_ref(), mint.as_ref()],
        &spl_associated_token_account::ID,
    )
}

/// Metaplex metadata account for a mint.
pub fn derive_metadata(mint: &Pubkey) -> Result<(Pubkey, u8), PumpError> {
    find_pda(
        &[
            SEED_METADATA,
            MPL_TOKEN_METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
        ],
        &MPL_TOKEN_METADATA_PROGRAM_ID,
    )
}

/// Vault accumulating a creator's share of trading fees.
pub fn derive_creator_vault(creator: &Pubkey) -> Result<(Pubkey, u8), PumpError> {
    find_pda(&[SEED_CREATOR_VAULT, creator.as_ref()], &PUMP_PROGRAM_ID)
}

pub fn derive_global_volume_accumulator() -> Result<(Pubkey, u8), PumpError> {
    find_pda(&[SEED_GLOBAL_VOLUME_ACCUMULATOR], &PUMP_PROGRAM_ID)
}

pub fn derive_user_volume_accumulator(user: &Pubkey) -> Result<(Pubkey, u8), PumpError> {
    find_pda(
        &[SEED_USER_VOLUME_ACCUMULATOR, user.as_ref()],
        &PUMP_PROGRAM_ID,
    )
}

/// Fee config lives under the fee program, seeded with the pump program id.
pub fn derive_fee_config() -> Result<(Pubkey, u8), PumpError> {
    find_pda(&[SEED_FEE_CONFIG, PUMP_PROGRAM_ID.as_ref()], &FEE_PROGRAM_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{Keypair, Signer};

    #[test]
    fn derivation_is_deterministic() {
        let mint = Keypair::new().pubkey();
        let a = derive_bonding_curve(&mint).unwrap();
        let b = derive_bonding_curve(&mint).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derived_addresses_are_off_curve() {
        let mint = Keypair::new().pubkey();
        let (curve, _bump) = derive_bonding_curve(&mint).unwrap();
        assert!(!curve.is_on_curve());

        let (vault, _) = derive_creator_vault(&mint).unwrap();
        assert!(!vault.is_on_curve());
    }

    #[test]
    fn associated_token_matches_spl_derivation() {
        let owner = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let (ours, _) = derive_associated_token(&owner, &mint).unwrap();
        let reference =
            spl_associated_token_account::get_associated_token_address(&owner, &mint);
        assert_eq!(ours, reference);
    }

    #[test]
    fn distinct_users_get_distinct_volume_accumulators() {
        let a = derive_user_volume_accumulator(&Keypair::new().pubkey()).unwrap();
        let b = derive_user_volume_accumulator(&Keypair::new().pubkey()).unwrap();
        assert_ne!(a.0, b.0);
    }
}
