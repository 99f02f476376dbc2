//! Key custody: the signing secret's on-disk lifecycle.
//!
//! The canonical wallet record is a JSON file holding the 64-byte secret, an
//! 8-hex-character SHA-256 checksum, a creation timestamp and a format
//! version. Writes go through a temp file plus atomic rename under an
//! exclusive advisory lock; loads verify permissions and the checksum before
//! the secret is used. A checksum mismatch is a security failure, never
//! repaired or guessed. A missing file is a distinct, recoverable condition.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::{info, warn};

use crate::config::RuntimeConfig;
use crate::error::WalletError;

pub(crate) const RECORD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// On-disk wallet record. A legacy record is a bare JSON byte array with no
/// checksum; it is accepted but flagged unverifiable.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WalletRecord {
    pub bytes: Vec<u8>,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub version: String,
}

/// Integrity status attached to a loaded wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletHealth {
    /// Checksum present and verified.
    Verified,
    /// Legacy record without a checksum; integrity cannot be verified.
    LegacyUnverified,
}

#[derive(Debug)]
pub struct LoadedWallet {
    pub keypair: Keypair,
    pub health: WalletHealth,
}

impl LoadedWallet {
    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

/// Owns the canonical wallet file, its lock file, the recovery export and the
/// backup area.
#[derive(Debug, Clone)]
pub struct WalletVault {
    data_dir: PathBuf,
    wallet_file: PathBuf,
    lock_file: PathBuf,
    recovery_file: PathBuf,
    backup_dir: PathBuf,
}

impl WalletVault {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            wallet_file: config.wallet_file(),
            lock_file: config.wallet_lock_file(),
            recovery_file: config.recovery_file(),
            backup_dir: config.backup_dir(),
        }
    }

    pub fn wallet_file(&self) -> &Path {
        &self.wallet_file
    }

    pub fn recovery_file(&self) -> &Path {
        &self.recovery_file
    }

    pub(crate) fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub(crate) fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn exists(&self) -> bool {
        self.wallet_file.exists()
    }

    /// Compute the record checksum: first 8 hex characters of
    /// SHA-256(secret).
    pub fn checksum_of(secret: &[u8]) -> String {
        hex::encode(Sha256::digest(secret))[..8].to_string()
    }

    /// Take the exclusive wallet lock without blocking. A contending writer
    /// gets `WalletError::Locked` immediately instead of queuing.
    pub fn lock_exclusive(&self) -> Result<WalletLock, WalletError> {
        self.ensure_data_dir()?;
        WalletLock::acquire(&self.lock_file)
    }

    /// Persist the keypair as a fresh versioned record. The canonical file is
    /// replaced wholesale via temp-file-plus-rename so a crash can never
    /// leave a partial write behind.
    pub fn save(&self, keypair: &Keypair) -> Result<(), WalletError> {
        let _lock = self.lock_exclusive()?;

        let mut secret = keypair.to_bytes();
        let record = WalletRecord {
            bytes: secret.to_vec(),
            checksum: Self::checksum_of(&secret),
            created: Utc::now().to_rfc3339(),
            version: RECORD_VERSION.to_string(),
        };
        wipe(&mut secret);

        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| WalletError::Corrupted(e.to_string()))?;

        let tmp = self.wallet_file.with_extension("tmp");
        fs::write(&tmp, &json)?;
        set_owner_only(&tmp)?;
        fs::rename(&tmp, &self.wallet_file)?;

        info!(address = %keypair.pubkey(), "wallet saved");
        Ok(())
    }

    /// Load and verify the canonical record.
    pub fn load(&self) -> Result<LoadedWallet, WalletError> {
        if !self.wallet_file.exists() {
            return Err(WalletError::NotFound);
        }

        if !self.harden_permissions(&self.wallet_file)? {
            warn!("fixed insecure wallet file permissions");
        }

        let raw = fs::read(&self.wallet_file)?;
        let (mut secret, health) = decode_record(&raw)?;

        let keypair = Keypair::from_bytes(&secret)
            .map_err(|e| WalletError::Corrupted(e.to_string()))?;
        wipe(&mut secret);

        if health == WalletHealth::LegacyUnverified {
            warn!("legacy wallet record has no checksum; integrity not verifiable");
        }

        Ok(LoadedWallet { keypair, health })
    }

    /// Integrity report without handing out the keypair.
    pub fn verify(&self) -> Result<WalletHealth, WalletError> {
        self.load().map(|w| w.health)
    }

    /// Import a base58-encoded 64-byte secret and persist it.
    pub fn import_base58(&self, encoded: &str) -> Result<Pubkey, WalletError> {
        let mut secret = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| WalletError::Corrupted(format!("invalid base58: {e}")))?;
        if secret.len() != 64 {
            wipe(&mut secret);
            return Err(WalletError::Corrupted(format!(
                "secret key must be 64 bytes, got {}",
                secret.len()
            )));
        }
        let keypair = Keypair::from_bytes(&secret)
            .map_err(|e| WalletError::Corrupted(e.to_string()))?;
        wipe(&mut secret);
        self.save(&keypair)?;
        Ok(keypair.pubkey())
    }

    /// Render the secret in human-transcribable form to the owner-only
    /// recovery file. The only path that intentionally writes the secret as
    /// printable text.
    pub fn export_recovery(&self, keypair: &Keypair) -> Result<PathBuf, WalletError> {
        self.ensure_data_dir()?;
        let mut secret = keypair.to_bytes();
        let encoded = bs58::encode(&secret).into_string();
        wipe(&mut secret);

        let body = format!(
            "Wallet Address: {}\n\nSigning Key (Base58):\n{}\n\nKEEP THIS FILE SECURE - DO NOT SHARE!\n\nGenerated: {}\n",
            keypair.pubkey(),
            encoded,
            Utc::now().to_rfc3339(),
        );
        fs::write(&self.recovery_file, body)?;
        set_owner_only(&self.recovery_file)?;
        Ok(self.recovery_file.clone())
    }

    pub(crate) fn ensure_data_dir(&self) -> Result<(), WalletError> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir)?;
        }
        set_owner_only_dir(&self.data_dir)?;
        Ok(())
    }

    /// Tighten group/other access if present. Returns false when the file had
    /// to be fixed.
    pub(crate) fn harden_permissions(&self, path: &Path) -> Result<bool, WalletError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(path)?.permissions().mode();
            if mode & 0o077 != 0 {
                set_owner_only(path)?;
                return Ok(false);
            }
        }
        #[cfg(not(unix))]
        let _ = path;
        Ok(true)
    }
}

/// Decode raw record bytes into the secret and its integrity status.
/// Shared by load and restore so both apply the same checksum rule.
pub(crate) fn decode_record(raw: &[u8]) -> Result<(Vec<u8>, WalletHealth), WalletError> {
    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| WalletError::Corrupted(e.to_string()))?;

    if value.is_array() {
        // Legacy unversioned format: bare secret bytes, nothing to verify.
        let record: Vec<u8> = serde_json::from_value(value)
            .map_err(|e| WalletError::Corrupted(e.to_string()))?;
        return Ok((record, WalletHealth::LegacyUnverified));
    }

    let record: WalletRecord =
        serde_json::from_value(value).map_err(|e| WalletError::Corrupted(e.to_string()))?;

    if record.checksum.is_empty() {
        return Ok((record.bytes, WalletHealth::LegacyUnverified));
    }
    if record.checksum != WalletVault::checksum_of(&record.bytes) {
        // Abort without exposing the possibly tampered secret any further.
        return Err(WalletError::Security);
    }
    Ok((record.bytes, WalletHealth::Verified))
}

/// RAII guard over the sibling lock file. Released on every exit path,
/// including error paths, when the guard drops.
#[derive(Debug)]
pub struct WalletLock {
    file: File,
    path: PathBuf,
}

impl WalletLock {
    fn acquire(path: &Path) -> Result<Self, WalletError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        match file.try_lock() {
            Ok(()) => Ok(Self {
                file,
                path: path.to_path_buf(),
            }),
            Err(TryLockError::WouldBlock) => Err(WalletError::Locked),
            Err(TryLockError::Error(e)) => Err(e.into()),
        }
    }
}

impl Drop for WalletLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = fs::remove_file(&self.path);
    }
}

/// Best-effort zeroing of decoded secret material.
pub fn wipe(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        // Volatile so the zeroing is not optimized away as a dead store.
        unsafe { std::ptr::write_volatile(b, 0) };
    }
    std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
}

pub(crate) fn set_owner_only(path: &Path) -> Result<(), WalletError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

pub(crate) fn set_owner_only_dir(path: &Path) -> Result<(), WalletError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)?.permissions().mode();
        if mode & 0o077 != 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
