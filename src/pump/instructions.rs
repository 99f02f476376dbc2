//! Byte-exact instruction builders for the pump.fun program.
//!
//! Every payload is an 8-byte discriminator followed by arguments in the
//! IDL's declared order: little-endian fixed-width integers, 4-byte
//! length-prefixed UTF-8 strings, and a single tag byte for the optional
//! volume-tracking flag. Account lists are fixed in count, order, and
//! signer/writable flags - any deviation is rejected on-chain, so the lists
//! below are an externally imposed contract, not a layout choice.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::system_program;

use crate::error::PumpError;
use crate::pump::constants::*;
use crate::pump::pda;

/// Wire encoding of the buy instruction's optional volume-tracking flag:
/// one tag byte, 0 = absent, 1 = present-false, 2 = present-true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackVolume {
    #[default]
    Absent,
    Explicit(bool),
}

impl TrackVolume {
    fn tag(self) -> u8 {
        match self {
            TrackVolume::Absent => 0,
            TrackVolume::Explicit(false) => 1,
            TrackVolume::Explicit(true) => 2,
        }
    }
}

pub(crate) fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), PumpError> {
    if value.len() > max {
        return Err(PumpError::Validation {
            field,
            reason: format!("{} bytes exceeds maximum of {}", value.len(), max),
        });
    }
    Ok(())
}

pub(crate) fn check_https(field: &'static str, value: &str) -> Result<(), PumpError> {
    let parsed = url::Url::parse(value).map_err(|e| PumpError::Validation {
        field,
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "https" {
        return Err(PumpError::Validation {
            field,
            reason: "must use https".to_string(),
        });
    }
    Ok(())
}

fn put_string(data: &mut Vec<u8>, value: &str) {
    data.extend_from_slice(&(value.len() as u32).to_le_bytes());
    data.extend_from_slice(value.as_bytes());
}

/// Create a new token and its bonding curve. The mint must co-sign.
///
/// Args: name, symbol, uri (length-prefixed strings), creator pubkey.
/// 14 accounts in IDL order.
pub fn build_create(
    user: &Pubkey,
    mint: &Pubkey,
    name: &str,
    symbol: &str,
    uri: &str,
) -> Result<Instruction, PumpError> {
    check_len("name", name, MAX_NAME_LEN)?;
    check_len("symbol", symbol, MAX_SYMBOL_LEN)?;
    check_len("uri", uri, MAX_URI_LEN)?;
    check_https("uri", uri)?;

    let (bonding_curve, _) = pda::derive_bonding_curve(mint)?;
    let (associated_bonding_curve, _) = pda::derive_associated_bonding_curve(&bonding_curve, mint)?;
    let (metadata, _) = pda::derive_metadata(mint)?;

    let mut data = Vec::with_capacity(8 + 4 + name.len() + 4 + symbol.len() + 4 + uri.len() + 32);
    data.extend_from_slice(&CREATE_DISCRIMINATOR);
    put_string(&mut data, name);
    put_string(&mut data, symbol);
    put_string(&mut data, uri);
    data.extend_from_slice(user.as_ref());

    let accounts = vec![
        AccountMeta::new(*mint, true),
        AccountMeta::new_readonly(PUMP_MINT_AUTHORITY, false),
        AccountMeta::new(bonding_curve, false),
        AccountMeta::new(associated_bonding_curve, false),
        AccountMeta::new_readonly(PUMP_GLOBAL, false),
        AccountMeta::new_readonly(MPL_TOKEN_METADATA_PROGRAM_ID, false),
        AccountMeta::new(metadata, false),
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(system_program::ID, false),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(spl_associated_token_account::ID, false),
        AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
        AccountMeta::new_readonly(PUMP_EVENT_AUTHORITY, false),
        AccountMeta::new_readonly(PUMP_PROGRAM_ID, false),
    ];

    Ok(Instruction {
        program_id: PUMP_PROGRAM_ID,
        accounts,
        data,
    })
}

/// Buy tokens from a bonding curve.
///
/// Args: amount (u64), max_sol_cost (u64), track_volume (tag byte).
/// 16 accounts in IDL order, including the fee program and both volume
/// accumulators.
pub fn build_buy(
    user: &Pubkey,
    mint: &Pubkey,
    creator: &Pubkey,
    token_amount: u64,
    max_sol_cost: u64,
    track_volume: TrackVolume,
) -> Result<Instruction, PumpError> {
    let (bonding_curve, _) = pda::derive_bonding_curve(mint)?;
    let (associated_bonding_curve, _) = pda::derive_associated_bonding_curve(&bonding_curve, mint)?;
    let (user_ata, _) = pda::derive_associated_token(user, mint)?;
    let (creator_vault, _) = pda::derive_creator_vault(creator)?;
    let (global_volume, _) = pda::derive_global_volume_accumulator()?;
    let (user_volume, _) = pda::derive_user_volume_accumulator(user)?;
    let (fee_config, _) = pda::derive_fee_config()?;

    let mut data = Vec::with_capacity(8 + 8 + 8 + 1);
    data.extend_from_slice(&BUY_DISCRIMINATOR);
    data.extend_from_slice(&token_amount.to_le_bytes());
    data.extend_from_slice(&max_sol_cost.to_le_bytes());
    data.push(track_volume.tag());
    if data.len() != 25 {
        return Err(PumpError::Encoding(format!(
            "buy payload must be 25 bytes, got {}",
            data.len()
        )));
    }

    let accounts = vec![
        AccountMeta::new_readonly(PUMP_GLOBAL, false),
        AccountMeta::new(PUMP_FEE_RECIPIENT, false),
        AccountMeta::new_readonly(*mint, false),
        AccountMeta::new(bonding_curve, false),
        AccountMeta::new(associated_bonding_curve, false),
        AccountMeta::new(user_ata, false),
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(system_program::ID, false),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new(creator_vault, false),
        AccountMeta::new_readonly(PUMP_EVENT_AUTHORITY, false),
        AccountMeta::new_readonly(PUMP_PROGRAM_ID, false),
        AccountMeta::new_readonly(global_volume, false),
        AccountMeta::new(user_volume, false),
        AccountMeta::new_readonly(fee_config, false),
        AccountMeta::new_readonly(FEE_PROGRAM_ID, false),
    ];

    Ok(Instruction {
        program_id: PUMP_PROGRAM_ID,
        accounts,
        data,
    })
}

/// Sell tokens back to a bonding curve.
///
/// Args: amount (u64), min_sol_output (u64). 14 accounts in IDL order.
pub fn build_sell(
    user: &Pubkey,
    mint: &Pubkey,
    creator: &Pubkey,
    token_amount: u64,
    min_sol_output: u64,
) -> Result<Instruction, PumpError> {
    let (bonding_curve, _) = pda::derive_bonding_curve(mint)?;
    let (associated_bonding_curve, _) = pda::derive_associated_bonding_curve(&bonding_curve, mint)?;
    let (user_ata, _) = pda::derive_associated_token(user, mint)?;
    let (creator_vault, _) = pda::derive_creator_vault(creator)?;
    let (fee_config, _) = pda::derive_fee_config()?;

    let mut data = Vec::with_capacity(8 + 8 + 8);
    data.extend_from_slice(&SELL_DISCRIMINATOR);
    data.extend_from_slice(&token_amount.to_le_bytes());
    data.extend_from_slice(&min_sol_output.to_le_bytes());
    if data.len() != 24 {
        return Err(PumpError::Encoding(format!(
            "sell payload must be 24 bytes, got {}",
            data.len()
        )));
    }

    let accounts = vec![
        AccountMeta::new_readonly(PUMP_GLOBAL, false),
        AccountMeta::new(PUMP_FEE_RECIPIENT, false),
        AccountMeta::new_readonly(*mint, false),
        AccountMeta::new(bonding_curve, false),
        AccountMeta::new(associated_bonding_curve, false),
        AccountMeta::new(user_ata, false),
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(system_program::ID, false),
        AccountMeta::new(creator_vault, false),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(PUMP_EVENT_AUTHORITY, false),
        AccountMeta::new_readonly(PUMP_PROGRAM_ID, false),
        AccountMeta::new_readonly(fee_config, false),
        AccountMeta::new_readonly(FEE_PROGRAM_ID, false),
    ];

    Ok(Instruction {
        program_id: PUMP_PROGRAM_ID,
        accounts,
        data,
    })
}

/// Collect accumulated creator fees out of the creator vault. No args.
pub fn build_collect_creator_fee(creator: &Pubkey) -> Result<Instruction, PumpError> {
    let (creator_vault, _) = pda::derive_creator_vault(creator)?;

    let accounts = vec![
        AccountMeta::new(*creator, true),
        AccountMeta::new(creator_vault, false),
        AccountMeta::new_readonly(system_program::ID, false),
    ];

    Ok(Instruction {
        program_id: PUMP_PROGRAM_ID,
        accounts,
        data: COLLECT_CREATOR_FEE_DISCRIMINATOR.to_vec(),
    })
}

/// Create the user's associated token account for a mint. The operation is
/// fully described by the account list.
pub fn build_create_associated_account(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    spl_associated_token_account::instruction::create_associated_token_account(
        payer,
        owner,
        mint,
        &spl_token::ID,
    )
}

/// Native SOL transfer (system program).
pub fn build_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    system_instruction::transfer(from, to, lamports)
}

/// The flat platform fee paid to the treasury ahead of a launch.
pub fn build_platform_fee(from: &Pubkey) -> Instruction {
    build_transfer(from, &PLATFORM_TREASURY, PLATFORM_FEE_LAMPORTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{Keypair, Signer};

    fn read_string(data: &[u8], offset: usize) -> (String, usize) {
        let len = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
        let s = String::from_utf8(data[offset + 4..offset + 4 + len].to_vec()).unwrap();
        (s, offset + 4 + len)
    }

    #[test]
    fn create_data_roundtrips_strings_and_creator() {
        let user = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let ix = build_create(&user, &mint, "My Token", "MYT", "https://example.com/meta.json")
            .unwrap();

        assert_eq!(&ix.data[..8], &CREATE_DISCRIMINATOR);
        let (name, off) = read_string(&ix.data, 8);
        let (symbol, off) = read_string(&ix.data, off);
        let (uri, off) = read_string(&ix.data, off);
        assert_eq!(name, "My Token");
        assert_eq!(symbol, "MYT");
        assert_eq!(uri, "https://example.com/meta.json");
        assert_eq!(&ix.data[off..off + 32], user.as_ref());
        assert_eq!(ix.data.len(), off + 32);
    }

    #[test]
    fn create_handles_boundary_string_lengths() {
        let user = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let max_name = "n".repeat(MAX_NAME_LEN);
        let ix = build_create(&user, &mint, &max_name, "", "https://x.io").unwrap();
        let (name, off) = read_string(&ix.data, 8);
        let (symbol, _) = read_string(&ix.data, off);
        assert_eq!(name, max_name);
        assert_eq!(symbol, "");
    }

    #[test]
    fn create_account_list_matches_interface() {
        let user = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let ix = build_create(&user, &mint, "T", "T", "https://x.io").unwrap();

        assert_eq!(ix.program_id, PUMP_PROGRAM_ID);
        assert_eq!(ix.accounts.len(), 14);
        // Only the mint and the user sign.
        let signers: Vec<_> = ix.accounts.iter().filter(|m| m.is_signer).collect();
        assert_eq!(signers.len(), 2);
        assert_eq!(ix.accounts[0].pubkey, mint);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[7].pubkey, user);
        assert!(ix.accounts[7].is_signer && ix.accounts[7].is_writable);
        assert_eq!(ix.accounts[13].pubkey, PUMP_PROGRAM_ID);
    }

    #[test]
    fn oversized_arguments_fail_before_encoding() {
        let user = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let long_name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            build_create(&user, &mint, &long_name, "S", "https://x.io"),
            Err(PumpError::Validation { field: "name", .. })
        ));
        assert!(matches!(
            build_create(&user, &mint, "N", &"s".repeat(MAX_SYMBOL_LEN + 1), "https://x.io"),
            Err(PumpError::Validation { field: "symbol", .. })
        ));
        assert!(matches!(
            build_create(&user, &mint, "N", "S", "http://insecure.example"),
            Err(PumpError::Validation { field: "uri", .. })
        ));
    }

    #[test]
    fn buy_data_layout_is_exact() {
        let user = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let ix = build_buy(&user, &mint, &user, u64::MAX, 0, TrackVolume::Absent).unwrap();

        assert_eq!(ix.data.len(), 25);
        assert_eq!(&ix.data[..8], &BUY_DISCRIMINATOR);
        assert_eq!(u64::from_le_bytes(ix.data[8..16].try_into().unwrap()), u64::MAX);
        assert_eq!(u64::from_le_bytes(ix.data[16..24].try_into().unwrap()), 0);
        assert_eq!(ix.data[24], 0);
    }

    #[test]
    fn track_volume_tag_byte_encoding() {
        let user = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        for (flag, tag) in [
            (TrackVolume::Absent, 0u8),
            (TrackVolume::Explicit(false), 1),
            (TrackVolume::Explicit(true), 2),
        ] {
            let ix = build_buy(&user, &mint, &user, 1, 1, flag).unwrap();
            assert_eq!(ix.data[24], tag);
        }
    }

    #[test]
    fn buy_account_list_matches_interface() {
        let user = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let creator = Keypair::new().pubkey();
        let ix = build_buy(&user, &mint, &creator, 1, 1, TrackVolume::Absent).unwrap();

        assert_eq!(ix.accounts.len(), 16);
        assert_eq!(ix.accounts[0].pubkey, PUMP_GLOBAL);
        assert_eq!(ix.accounts[1].pubkey, PUMP_FEE_RECIPIENT);
        assert!(ix.accounts[1].is_writable);
        assert_eq!(ix.accounts[2].pubkey, mint);
        assert!(!ix.accounts[2].is_writable);
        assert_eq!(ix.accounts[6].pubkey, user);
        assert!(ix.accounts[6].is_signer);
        assert_eq!(ix.accounts[9].pubkey, pda::derive_creator_vault(&creator).unwrap().0);
        assert_eq!(ix.accounts[15].pubkey, FEE_PROGRAM_ID);
        // The user is the only signer on a buy.
        assert_eq!(ix.accounts.iter().filter(|m| m.is_signer).count(), 1);
    }

    #[test]
    fn sell_data_and_accounts_match_interface() {
        let user = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let creator = Keypair::new().pubkey();
        let ix = build_sell(&user, &mint, &creator, 500_000, 123_456).unwrap();

        assert_eq!(ix.data.len(), 24);
        assert_eq!(&ix.data[..8], &SELL_DISCRIMINATOR);
        assert_eq!(u64::from_le_bytes(ix.data[8..16].try_into().unwrap()), 500_000);
        assert_eq!(u64::from_le_bytes(ix.data[16..24].try_into().unwrap()), 123_456);

        assert_eq!(ix.accounts.len(), 14);
        // Sell swaps the creator-vault and token-program positions relative
        // to buy: vault at 8, token program at 9.
        assert_eq!(ix.accounts[8].pubkey, pda::derive_creator_vault(&creator).unwrap().0);
        assert_eq!(ix.accounts[9].pubkey, spl_token::ID);
        assert_eq!(ix.accounts[12].pubkey, pda::derive_fee_config().unwrap().0);
    }

    #[test]
    fn collect_fee_is_discriminator_only() {
        let creator = Keypair::new().pubkey();
        let ix = build_collect_creator_fee(&creator).unwrap();
        assert_eq!(ix.data, COLLECT_CREATOR_FEE_DISCRIMINATOR.to_vec());
        assert_eq!(ix.accounts.len(), 3);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[2].pubkey, system_program::ID);
    }

    #[test]
    fn native_transfer_encoding() {
        let from = Keypair::new().pubkey();
        let to = Keypair::new().pubkey();
        let ix = build_transfer(&from, &to, 10_000_000);
        // System program transfer: 4-byte LE instruction index 2, u64 lamports.
        assert_eq!(ix.program_id, system_program::ID);
        assert_eq!(&ix.data[..4], &2u32.to_le_bytes());
        assert_eq!(u64::from_le_bytes(ix.data[4..12].try_into().unwrap()), 10_000_000);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
    }

    #[test]
    fn create_associated_account_targets_derived_address() {
        let payer = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let ix = build_create_associated_account(&payer, &payer, &mint);
        assert_eq!(ix.program_id, spl_associated_token_account::ID);
        assert_eq!(
            ix.accounts[1].pubkey,
            pda::derive_associated_token(&payer, &mint).unwrap().0
        );
    }
}
