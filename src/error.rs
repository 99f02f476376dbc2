//! Error types for the soulmint client.
//!
//! One enum per subsystem. Only `WalletError::Security` and
//! `PumpError::Encoding` are non-recoverable by design; everything else is
//! recoverable with corrected input or a caller-level retry.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Errors from the pump.fun interface layer (validation, encoding, PDAs).
#[derive(Debug, Error)]
pub enum PumpError {
    /// Malformed or oversized input, rejected before any bytes are produced.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Internal encoding invariant violated. Unreachable with validated input.
    #[error("instruction encoding invariant violated: {0}")]
    Encoding(String),

    /// No off-curve bump in 0..=255 for the given seeds. Fatal, not retried.
    #[error("no off-curve address found for PDA seeds")]
    Derivation,

    /// Bonding curve account bytes did not decode.
    #[error("bonding curve account data malformed: {0}")]
    CurveDecode(String),
}

/// Errors from the key custody store.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Stored checksum does not match the decoded secret. The file was
    /// tampered with or corrupted; never auto-repaired.
    #[error("wallet integrity check failed: checksum mismatch")]
    Security,

    /// Another process holds the wallet lock; fail fast, never queue.
    #[error("wallet file is locked by another process")]
    Locked,

    /// No canonical wallet file. Recoverable: run setup or import.
    #[error("no wallet found")]
    NotFound,

    /// The file exists but does not decode to a wallet record.
    #[error("wallet file corrupted: {0}")]
    Corrupted(String),

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from the transaction assembler state machine.
#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("{op} is not valid in the {state} state")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },

    /// A required signer was absent from the signer set.
    #[error("missing signature for required signer {0}")]
    MissingSignature(Pubkey),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Errors at the ledger RPC boundary and local pre-dispatch checks.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rpc request timed out")]
    Timeout,

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("account {0} not found")]
    AccountMissing(Pubkey),

    /// Raised locally before signing, from a fetched balance snapshot.
    #[error("insufficient funds: need {required} lamports, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Raised locally before signing when the quoted output falls below the
    /// worst acceptable bound.
    #[error("slippage exceeded: quoted {quoted} lamports, floor {floor}")]
    SlippageExceeded { quoted: u64, floor: u64 },

    /// The bonding curve has completed; the token trades on a DEX now.
    #[error("bonding curve complete - token has migrated")]
    CurveComplete,

    #[error(transparent)]
    Pump(#[from] PumpError),
}

impl ChainError {
    /// Transient failures are eligible for caller-level bounded retry.
    /// Application-level rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Network(_) | ChainError::Timeout)
    }
}
