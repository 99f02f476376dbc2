//! soulmint - self-custody launch and trading client for the pump.fun
//! bonding curve program.
//!
//! The signing secret never leaves this machine: key custody, byte-exact
//! instruction encoding, transaction assembly and dispatch all happen
//! locally. The companion web service only sees completed signatures.

pub mod api;
pub mod assembler;
pub mod chain;
pub mod config;
pub mod error;
pub mod history;
pub mod pump;
pub mod trade;
pub mod types;
pub mod wallet;

// Re-export main types for convenience
pub use assembler::{AssemblerState, TransactionAssembler};
pub use chain::ChainClient;
pub use config::{Network, RuntimeConfig};
pub use error::{AssemblerError, ChainError, PumpError, WalletError};
pub use trade::TradeEngine;
pub use types::{LaunchOutcome, SellAmount, SellOutcome, TokenMetadata};
pub use wallet::{WalletHealth, WalletVault};
