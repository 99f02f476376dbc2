//! Tests for the key custody store: round trips, tamper detection, locking,
//! backup and restore.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};

use solana_sdk::signature::{Keypair, Signer};
use soulmint::wallet::{WalletHealth, WalletVault};
use soulmint::{RuntimeConfig, WalletError};

fn temp_vault() -> (RuntimeConfig, WalletVault, PathBuf) {
    let dir = std::env::temp_dir().join(format!("soulmint-test-{}", uuid::Uuid::new_v4()));
    let mut config = RuntimeConfig::default();
    config.data_dir = dir.clone();
    let vault = WalletVault::new(&config);
    (config, vault, dir)
}

#[test]
fn save_then_load_round_trips_the_secret() {
    let (_config, vault, dir) = temp_vault();
    let keypair = Keypair::new();

    vault.save(&keypair).expect("save failed");
    let loaded = vault.load().expect("load failed");

    assert_eq!(loaded.keypair.to_bytes(), keypair.to_bytes());
    assert_eq!(loaded.health, WalletHealth::Verified);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn missing_wallet_is_not_found_not_corruption() {
    let (_config, vault, dir) = temp_vault();
    assert!(matches!(vault.load(), Err(WalletError::NotFound)));
    fs::remove_dir_all(dir).ok();
}

#[test]
fn any_single_byte_flip_fails_the_integrity_check() {
    let (config, vault, dir) = temp_vault();
    let keypair = Keypair::new();
    vault.save(&keypair).unwrap();

    let path = config.wallet_file();
    let mut record: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    // Flip one byte of the persisted secret, leaving the checksum in place.
    let bytes = record["bytes"].as_array_mut().unwrap();
    let first = bytes[0].as_u64().unwrap() as u8;
    bytes[0] = serde_json::json!(first ^ 0x01);
    fs::write(&path, serde_json::to_vec(&record).unwrap()).unwrap();

    assert!(matches!(vault.load(), Err(WalletError::Security)));
    fs::remove_dir_all(dir).ok();
}

#[test]
fn legacy_bare_array_record_loads_unverified() {
    let (config, vault, dir) = temp_vault();
    let keypair = Keypair::new();

    vault.save(&keypair).unwrap(); // creates the data dir with right modes
    let legacy = serde_json::to_vec(&keypair.to_bytes().to_vec()).unwrap();
    fs::write(config.wallet_file(), legacy).unwrap();

    let loaded = vault.load().unwrap();
    assert_eq!(loaded.health, WalletHealth::LegacyUnverified);
    assert_eq!(loaded.keypair.to_bytes(), keypair.to_bytes());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn garbage_file_is_corruption_not_security() {
    let (config, vault, dir) = temp_vault();
    vault.save(&Keypair::new()).unwrap();
    fs::write(config.wallet_file(), b"not json at all").unwrap();
    assert!(matches!(vault.load(), Err(WalletError::Corrupted(_))));
    fs::remove_dir_all(dir).ok();
}

#[cfg(unix)]
#[test]
fn loose_permissions_are_tightened_on_load() {
    use std::os::unix::fs::PermissionsExt;

    let (config, vault, dir) = temp_vault();
    vault.save(&Keypair::new()).unwrap();

    let path = config.wallet_file();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    vault.load().expect("load should survive loose permissions");
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn a_held_lock_makes_save_fail_fast() {
    let (_config, vault, dir) = temp_vault();
    let guard = vault.lock_exclusive().expect("first lock");
    assert!(matches!(
        vault.save(&Keypair::new()),
        Err(WalletError::Locked)
    ));
    drop(guard);
    vault.save(&Keypair::new()).expect("save after release");
    fs::remove_dir_all(dir).ok();
}

#[test]
fn racing_saves_never_interleave_writes() {
    let (_config, vault, dir) = temp_vault();
    let kp_a = Keypair::new();
    let kp_b = Keypair::new();
    let addrs = [kp_a.pubkey(), kp_b.pubkey()];

    let barrier = Arc::new(Barrier::new(2));
    let results: Vec<Result<(), WalletError>> = std::thread::scope(|s| {
        let handles: Vec<_> = [kp_a, kp_b]
            .into_iter()
            .map(|kp| {
                let vault = vault.clone();
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    barrier.wait();
                    vault.save(&kp)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // At least one writer wins; a loser may only fail with the lock error.
    assert!(results.iter().any(|r| r.is_ok()));
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, WalletError::Locked), "unexpected error: {e}");
        }
    }

    // Whatever happened, the surviving file is one record in its entirety,
    // never a byte-level mix.
    let loaded = vault.load().expect("final file must decode and verify");
    assert!(addrs.contains(&loaded.keypair.pubkey()));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn restore_recovers_the_exact_pre_corruption_wallet() {
    let (config, vault, dir) = temp_vault();
    let keypair = Keypair::new();
    vault.save(&keypair).unwrap();

    let backup = vault.backup(Some("before_disaster")).unwrap();

    // Corrupt the canonical file.
    let path = config.wallet_file();
    let mut record: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    let bytes = record["bytes"].as_array_mut().unwrap();
    let first = bytes[0].as_u64().unwrap() as u8;
    bytes[0] = serde_json::json!(first ^ 0xFF);
    fs::write(&path, serde_json::to_vec(&record).unwrap()).unwrap();
    assert!(matches!(vault.load(), Err(WalletError::Security)));

    let restored = vault.restore(&backup).unwrap();
    assert_eq!(restored, keypair.pubkey());

    let loaded = vault.load().unwrap();
    assert_eq!(loaded.keypair.to_bytes(), keypair.to_bytes());

    // The corrupted canonical file was itself backed up before the restore.
    let labels: Vec<String> = vault
        .list_backups()
        .unwrap()
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    assert!(labels.iter().any(|l| l.starts_with("pre_restore")));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn restore_refuses_a_tampered_backup() {
    let (_config, vault, dir) = temp_vault();
    let keypair = Keypair::new();
    vault.save(&keypair).unwrap();
    let backup = vault.backup(None).unwrap();

    let mut record: serde_json::Value =
        serde_json::from_slice(&fs::read(&backup).unwrap()).unwrap();
    let bytes = record["bytes"].as_array_mut().unwrap();
    let first = bytes[0].as_u64().unwrap() as u8;
    bytes[0] = serde_json::json!(first ^ 0x01);
    fs::write(&backup, serde_json::to_vec(&record).unwrap()).unwrap();

    assert!(matches!(vault.restore(&backup), Err(WalletError::Security)));
    // The canonical wallet is untouched.
    assert_eq!(vault.load().unwrap().keypair.to_bytes(), keypair.to_bytes());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn uninstall_backs_up_then_removes_wallet_files() {
    let (config, vault, dir) = temp_vault();
    let keypair = Keypair::new();
    vault.save(&keypair).unwrap();
    vault.export_recovery(&keypair).unwrap();

    let removed = vault.uninstall().unwrap();
    assert!(removed.contains(&config.wallet_file()));
    assert!(!config.wallet_file().exists());
    assert!(!config.recovery_file().exists());

    // The final safety backup survives the uninstall.
    let backups = vault.list_backups().unwrap();
    assert!(backups
        .iter()
        .any(|p| p.file_name().unwrap().to_string_lossy().starts_with("pre_uninstall")));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn recovery_export_is_transcribable_base58() {
    let (_config, vault, dir) = temp_vault();
    let keypair = Keypair::new();
    vault.save(&keypair).unwrap();
    let path = vault.export_recovery(&keypair).unwrap();

    let body = fs::read_to_string(path).unwrap();
    assert!(body.contains(&keypair.pubkey().to_string()));
    let encoded = bs58::encode(keypair.to_bytes()).into_string();
    assert!(body.contains(&encoded));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn import_round_trips_through_base58() {
    let (_config, vault, dir) = temp_vault();
    let keypair = Keypair::new();
    let encoded = bs58::encode(keypair.to_bytes()).into_string();

    let address = vault.import_base58(&encoded).unwrap();
    assert_eq!(address, keypair.pubkey());
    assert_eq!(vault.load().unwrap().keypair.to_bytes(), keypair.to_bytes());

    assert!(vault.import_base58("not-base58!").is_err());
    assert!(vault.import_base58(&bs58::encode([0u8; 12]).into_string()).is_err());

    fs::remove_dir_all(dir).ok();
}
