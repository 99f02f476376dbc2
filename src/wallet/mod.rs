//! Key custody store: save, load, integrity check, permission hardening,
//! backup, restore and recovery export for the local signing secret.

pub mod backup;
pub mod vault;

pub use vault::{wipe, LoadedWallet, WalletHealth, WalletLock, WalletVault};
