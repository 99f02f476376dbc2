//! Thin command driver for the soulmint client.
//!
//! Wires configuration, key custody, the chain client, the companion API and
//! the history ledger together and dispatches one subcommand per run.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::info;

use soulmint::api::ApiClient;
use soulmint::history::{HistoryStore, SqliteHistory, TradeAction, TradeRecord};
use soulmint::pump::curve;
use soulmint::trade::TradeEngine;
use soulmint::types::{SellAmount, TokenMetadata};
use soulmint::wallet::{WalletHealth, WalletVault};
use soulmint::{ChainClient, Network, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soulmint=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        print_usage();
        return Ok(());
    };

    let mut config = RuntimeConfig::from_env();
    if has_flag(&args, "--devnet") {
        config.set_network(Network::Devnet);
    }
    if has_flag(&args, "--skip-balance-check") {
        config.skip_balance_check = true;
    }

    let vault = WalletVault::new(&config);

    match command {
        "setup" => cmd_setup(&config, &vault, has_flag(&args, "--force")).await,
        "import" => {
            let key = flag_value(&args, "--key")
                .map(Ok)
                .unwrap_or_else(read_stdin_line)?;
            let address = vault.import_base58(&key)?;
            record_local(&config, TradeAction::Import).await;
            println!("Wallet imported: {address}");
            Ok(())
        }
        "wallet" => cmd_wallet(&config, &vault).await,
        "verify" => {
            match vault.verify()? {
                WalletHealth::Verified => println!("Wallet is valid"),
                WalletHealth::LegacyUnverified => {
                    println!("Legacy wallet record: no checksum stored")
                }
            }
            Ok(())
        }
        "launch" => cmd_launch(&config, &vault, &args).await,
        "sell" => cmd_sell(&config, &vault, &args).await,
        "collect" => {
            let wallet = vault.load()?.keypair;
            let engine = build_engine(&config).await?;
            let outcome = engine.collect_fees(&wallet).await?;
            match outcome.signature {
                Some(signature) => println!(
                    "Collected {:.6} SOL (signature {signature})",
                    outcome.vault_lamports as f64 / LAMPORTS_PER_SOL as f64
                ),
                None => println!(
                    "Nothing to collect: vault holds {:.6} SOL",
                    outcome.vault_lamports as f64 / LAMPORTS_PER_SOL as f64
                ),
            }
            Ok(())
        }
        "transfer" => {
            let to = Pubkey::from_str(&require_flag(&args, "--to")?)
                .context("invalid recipient address")?;
            let sol: f64 = require_flag(&args, "--sol")?.parse()?;
            let wallet = vault.load()?.keypair;
            let engine = build_engine(&config).await?;
            let lamports = (sol * LAMPORTS_PER_SOL as f64).round() as u64;
            let signature = engine.transfer_sol(&wallet, &to, lamports).await?;
            println!("Transferred {sol} SOL: {signature}");
            Ok(())
        }
        "backup" => {
            let path = vault.backup(flag_value(&args, "--label").as_deref())?;
            record_local(&config, TradeAction::Backup).await;
            println!("Backup created: {}", path.display());
            Ok(())
        }
        "backups" => {
            for path in vault.list_backups()? {
                println!("{}", path.display());
            }
            Ok(())
        }
        "restore" => {
            let path = require_flag(&args, "--from")?;
            let address = vault.restore(std::path::Path::new(&path))?;
            record_local(&config, TradeAction::Restore).await;
            println!("Restored wallet {address}");
            Ok(())
        }
        "history" => {
            let history = SqliteHistory::open(&config.history_db()).await?;
            for record in history.recent(50).await? {
                println!(
                    "{} {:?} {:?} {:?}",
                    record.timestamp, record.action, record.mint, record.outcome
                );
            }
            Ok(())
        }
        "trending" => {
            let api = ApiClient::new(&config)?;
            for token in api.trending(20).await? {
                println!("{} {} ({})", token.symbol, token.name, token.mint);
            }
            Ok(())
        }
        "airdrop" => {
            if config.network != Network::Devnet {
                bail!("airdrop only available on devnet");
            }
            let wallet = vault.load()?;
            let chain = ChainClient::new(&config)?;
            let signature = chain
                .request_airdrop(&wallet.address(), LAMPORTS_PER_SOL)
                .await?;
            println!("Airdrop requested: {signature}");
            Ok(())
        }
        "uninstall" => {
            if !has_flag(&args, "--yes") {
                bail!("pass --yes to confirm removal of local wallet data");
            }
            for path in vault.uninstall()? {
                println!("Removed: {}", path.display());
            }
            Ok(())
        }
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }
}

async fn cmd_setup(config: &RuntimeConfig, vault: &WalletVault, force: bool) -> Result<()> {
    if vault.exists() && !force {
        bail!(
            "wallet already exists at {} (use --force to regenerate)",
            vault.wallet_file().display()
        );
    }
    if vault.exists() {
        vault.backup(Some("pre_setup"))?;
    }

    let keypair = Keypair::new();
    vault.save(&keypair)?;
    let recovery = vault.export_recovery(&keypair)?;
    record_local(config, TradeAction::Setup).await;

    info!(address = %keypair.pubkey(), "wallet created");
    println!("Wallet address: {}", keypair.pubkey());
    println!("Recovery key written to: {}", recovery.display());
    println!("KEEP THE RECOVERY FILE SAFE - it is the only way back to this wallet.");
    Ok(())
}

async fn cmd_wallet(config: &RuntimeConfig, vault: &WalletVault) -> Result<()> {
    let wallet = vault.load()?;
    let chain = ChainClient::new(config)?;
    let lamports = chain.balance(&wallet.address()).await?;
    println!("Address: {}", wallet.address());
    println!(
        "Balance: {:.6} SOL",
        lamports as f64 / LAMPORTS_PER_SOL as f64
    );
    if wallet.health == WalletHealth::LegacyUnverified {
        println!("Note: legacy wallet record, integrity not verifiable");
    }
    Ok(())
}

async fn cmd_launch(config: &RuntimeConfig, vault: &WalletVault, args: &[String]) -> Result<()> {
    let meta = TokenMetadata {
        name: require_flag(args, "--name")?,
        symbol: require_flag(args, "--symbol")?.to_uppercase(),
        description: flag_value(args, "--description").unwrap_or_default(),
        image_url: flag_value(args, "--image"),
        twitter: flag_value(args, "--twitter"),
        telegram: flag_value(args, "--telegram"),
        website: flag_value(args, "--website"),
    };
    let initial_buy: f64 = flag_value(args, "--buy").map_or(Ok(0.0), |v| v.parse())?;
    let slippage_bps: u16 = flag_value(args, "--slippage")
        .map_or(Ok(config.default_slippage_bps), |v| v.parse())?;

    let wallet = vault.load()?.keypair;
    let engine = build_engine(config).await?;
    let outcome = engine
        .launch(&wallet, &meta, initial_buy, slippage_bps)
        .await?;

    println!("Launched {}", meta.symbol);
    println!("   Mint: {}", outcome.mint);
    println!("   Signature: {}", outcome.signature);
    println!("   {}", outcome.pump_url);
    Ok(())
}

async fn cmd_sell(config: &RuntimeConfig, vault: &WalletVault, args: &[String]) -> Result<()> {
    let mint =
        Pubkey::from_str(&require_flag(args, "--mint")?).context("invalid mint address")?;
    let amount = if let Some(pct) = flag_value(args, "--percent") {
        SellAmount::Percent(pct.parse()?)
    } else if let Some(tokens) = flag_value(args, "--tokens") {
        SellAmount::Tokens(tokens.parse()?)
    } else {
        SellAmount::All
    };
    let slippage_bps: u16 = flag_value(args, "--slippage")
        .map_or(Ok(config.default_slippage_bps), |v| v.parse())?;
    let floor = flag_value(args, "--min-sol")
        .map(|v| v.parse::<f64>())
        .transpose()?
        .map(|sol| (sol * LAMPORTS_PER_SOL as f64).round() as u64);

    let wallet = vault.load()?.keypair;
    let engine = build_engine(config).await?;

    // Display-only price preview; amounts were quoted in integers.
    let state = ChainClient::new(config)?.fetch_curve_state(&mint).await?;
    println!(
        "Current price: {:.12} SOL/token",
        curve::price_per_token(state.virtual_token_reserves, state.virtual_sol_reserves)
    );

    let outcome = engine
        .sell(&wallet, &mint, amount, slippage_bps, floor)
        .await?;
    println!("Sold {} token units", outcome.tokens_sold);
    println!(
        "   Expected: ~{:.6} SOL (minimum {:.6})",
        outcome.expected_sol_lamports as f64 / LAMPORTS_PER_SOL as f64,
        outcome.min_sol_lamports as f64 / LAMPORTS_PER_SOL as f64
    );
    println!("   Signature: {}", outcome.signature);
    Ok(())
}

async fn build_engine(config: &RuntimeConfig) -> Result<TradeEngine> {
    let chain = ChainClient::new(config)?;
    let api = ApiClient::new(config)?;
    let history: Arc<dyn HistoryStore> =
        Arc::new(SqliteHistory::open(&config.history_db()).await?);
    Ok(TradeEngine::new(config.clone(), chain, api, history))
}

/// Wallet-maintenance actions still leave a history row; failures here never
/// block the action itself.
async fn record_local(config: &RuntimeConfig, action: TradeAction) {
    if let Ok(history) = SqliteHistory::open(&config.history_db()).await {
        let record = TradeRecord::now(action, &config.correlation_id);
        let _ = history.insert(&record).await;
    }
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn require_flag(args: &[String], name: &str) -> Result<String> {
    flag_value(args, name).with_context(|| format!("missing required flag {name}"))
}

fn read_stdin_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_usage() {
    println!("soulmint {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: soulmint <command> [flags]");
    println!();
    println!("  setup                       Generate a new wallet");
    println!("  import --key <base58>       Import an existing secret key");
    println!("  wallet                      Show address and balance");
    println!("  verify                      Check wallet integrity");
    println!("  launch --name N --symbol S  Launch a token (--buy SOL for initial buy)");
    println!("  sell --mint M               Sell tokens (--percent P | --tokens N)");
    println!("  collect                     Collect creator fees");
    println!("  transfer --to A --sol X     Send SOL");
    println!("  backup [--label L]          Back up the wallet");
    println!("  backups                     List backups");
    println!("  restore --from <path>       Restore a backup");
    println!("  history                     Show recent actions");
    println!("  trending                    Show trending tokens");
    println!("  airdrop --devnet            Request devnet airdrop");
    println!("  uninstall --yes             Remove local wallet data");
}
