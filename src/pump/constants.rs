//! Pump.fun program constants.
//!
//! Program ids, instruction discriminators, PDA seeds and argument limits are
//! facts published by the deployed program's interface. They must match the
//! on-chain program byte-for-byte: a wrong id or discriminator is not a local
//! error, it surfaces as a rejected transaction at dispatch time.

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

pub const PUMP_PROGRAM_ID: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
pub const PUMP_GLOBAL: Pubkey = pubkey!("4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf");
pub const PUMP_FEE_RECIPIENT: Pubkey = pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");
pub const PUMP_EVENT_AUTHORITY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7XxXp9F1");
pub const PUMP_MINT_AUTHORITY: Pubkey = pubkey!("TSLvdd1pWpHVjahSpsvCXUbgwsL3JAcvokwaKt1eokM");
pub const MPL_TOKEN_METADATA_PROGRAM_ID: Pubkey =
    pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
pub const FEE_PROGRAM_ID: Pubkey = pubkey!("pfeeUxB6jkeY1Hxd7CsFCAjcbHA9rWtchMGdZ6VojVZ");
pub const RENT_SYSVAR_ID: Pubkey = pubkey!("SysvarRent111111111111111111111111111111111");

/// Platform treasury receiving the flat launch fee.
pub const PLATFORM_TREASURY: Pubkey = pubkey!("5AwxRzXkUPgrG1p9MAZYTwpxNGadwDXXkav8yCRtN3QP");
/// Flat platform fee charged on token launches (0.01 SOL).
pub const PLATFORM_FEE_LAMPORTS: u64 = 10_000_000;

// Instruction discriminators from the pump.fun IDL.
pub const CREATE_DISCRIMINATOR: [u8; 8] = [24, 30, 200, 40, 5, 28, 7, 119];
pub const BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
pub const SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];
pub const COLLECT_CREATOR_FEE_DISCRIMINATOR: [u8; 8] =
    [0x1a, 0x8b, 0xd6, 0x5c, 0x2b, 0x30, 0x1c, 0x5e];

/// Account discriminator prefixing the BondingCurve account data.
pub const BONDING_CURVE_ACCOUNT_DISCRIMINATOR: [u8; 8] = [23, 183, 248, 55, 96, 216, 172, 96];

// PDA seeds (canonical, from the IDL).
pub const SEED_BONDING_CURVE: &[u8] = b"bonding-curve";
pub const SEED_METADATA: &[u8] = b"metadata";
pub const SEED_CREATOR_VAULT: &[u8] = b"creator-vault";
pub const SEED_GLOBAL_VOLUME_ACCUMULATOR: &[u8] = b"global_volume_accumulator";
pub const SEED_USER_VOLUME_ACCUMULATOR: &[u8] = b"user_volume_accumulator";
pub const SEED_FEE_CONFIG: &[u8] = b"fee_config";

/// Reserves a fresh bonding curve starts with. Used to quote the initial buy
/// that is bundled atomically with the create instruction.
pub const INITIAL_VIRTUAL_TOKEN_RESERVES: u64 = 1_073_000_000_000_000;
pub const INITIAL_VIRTUAL_SOL_RESERVES: u64 = 30_000_000_000;

// Argument limits enforced before any bytes are produced.
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_URI_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Creator vaults below this balance are not worth a collection transaction.
pub const COLLECT_DUST_FLOOR_LAMPORTS: u64 = 1_000_000;
