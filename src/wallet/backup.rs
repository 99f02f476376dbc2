//! Backup, restore and uninstall for the wallet vault.
//!
//! Backups are verbatim, timestamped or labelled copies of the canonical
//! record, taken automatically before every destructive operation and never
//! auto-deleted. Restore validates the backup before touching the canonical
//! file, and backs the canonical file up first so a bad restore stays
//! recoverable.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::info;

use crate::error::WalletError;
use crate::wallet::vault::{decode_record, set_owner_only, wipe, WalletVault};

impl WalletVault {
    /// Copy the canonical file into the backup area. With no label, the name
    /// carries a timestamp.
    pub fn backup(&self, label: Option<&str>) -> Result<PathBuf, WalletError> {
        if !self.exists() {
            return Err(WalletError::NotFound);
        }
        self.ensure_data_dir()?;
        let backup_dir = self.backup_dir().to_path_buf();
        if !backup_dir.exists() {
            fs::create_dir_all(&backup_dir)?;
        }

        let name = match label {
            Some(label) => label.to_string(),
            None => format!("wallet_{}", Local::now().format("%Y%m%d_%H%M%S")),
        };
        let dest = backup_dir.join(format!("{name}.json"));
        fs::copy(self.wallet_file(), &dest)?;
        set_owner_only(&dest)?;
        info!(backup = %dest.display(), "wallet backup created");
        Ok(dest)
    }

    /// Available backups, newest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, WalletError> {
        let backup_dir = self.backup_dir();
        if !backup_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries: Vec<PathBuf> = fs::read_dir(backup_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort_by_key(|p| {
            fs::metadata(p)
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });
        entries.reverse();
        Ok(entries)
    }

    /// Replace the canonical record with a validated backup. Returns the
    /// restored wallet's public address.
    pub fn restore(&self, backup_path: &Path) -> Result<Pubkey, WalletError> {
        if !backup_path.exists() {
            return Err(WalletError::BackupNotFound(
                backup_path.display().to_string(),
            ));
        }

        // Validate before touching anything: the record must decode, pass its
        // checksum if it has one, and reconstruct a keypair.
        let raw = fs::read(backup_path)?;
        let (mut secret, _health) = decode_record(&raw)?;
        let keypair = Keypair::from_bytes(&secret)
            .map_err(|e| WalletError::Corrupted(e.to_string()))?;
        wipe(&mut secret);

        if self.exists() {
            self.backup(Some("pre_restore"))?;
        }

        let _lock = self.lock_exclusive()?;
        let tmp = self.wallet_file().with_extension("tmp");
        fs::write(&tmp, &raw)?;
        set_owner_only(&tmp)?;
        fs::rename(&tmp, self.wallet_file())?;

        info!(from = %backup_path.display(), address = %keypair.pubkey(), "wallet restored");
        Ok(keypair.pubkey())
    }

    /// Remove the wallet, recovery export, and the data dir when empty. A
    /// final backup is taken first; the backup area is left untouched.
    pub fn uninstall(&self) -> Result<Vec<PathBuf>, WalletError> {
        let mut removed = Vec::new();

        if self.exists() {
            self.backup(Some("pre_uninstall"))?;
        }

        for path in [
            self.wallet_file().to_path_buf(),
            self.recovery_file().to_path_buf(),
        ] {
            if path.exists() {
                fs::remove_file(&path)?;
                removed.push(path);
            }
        }

        let data_dir = self.data_dir().to_path_buf();
        if data_dir.exists() && fs::read_dir(&data_dir)?.next().is_none() {
            fs::remove_dir(&data_dir)?;
            removed.push(data_dir);
        }

        Ok(removed)
    }
}
