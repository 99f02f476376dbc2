//! High-level trade flows: launch (create + initial buy), sell, fee
//! collection and plain SOL transfers.
//!
//! Each flow quotes against a single point-in-time reserve snapshot, runs its
//! local pre-checks before anything is signed, assembles one atomic
//! transaction, and records the attempt in the history ledger.

use std::sync::Arc;

use anyhow::{Context, Result};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::assembler::TransactionAssembler;
use crate::chain::ChainClient;
use crate::config::RuntimeConfig;
use crate::error::ChainError;
use crate::history::{HistoryStore, TradeAction, TradeOutcome, TradeRecord};
use crate::pump::constants::{COLLECT_DUST_FLOOR_LAMPORTS, PLATFORM_FEE_LAMPORTS};
use crate::pump::{curve, instructions, pda, TrackVolume};
use crate::types::{CollectOutcome, LaunchOutcome, SellAmount, SellOutcome, TokenMetadata};

/// Rough per-transaction fee headroom kept out of the spendable balance.
const TX_FEE_HEADROOM_LAMPORTS: u64 = 10_000_000;

pub struct TradeEngine {
    config: RuntimeConfig,
    chain: ChainClient,
    api: ApiClient,
    history: Arc<dyn HistoryStore>,
}

impl TradeEngine {
    pub fn new(
        config: RuntimeConfig,
        chain: ChainClient,
        api: ApiClient,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            config,
            chain,
            api,
            history,
        }
    }

    /// Launch a token: platform fee, create, and optionally an
    /// associated-account creation plus initial buy, all in one atomic
    /// transaction. The mint is a fresh ephemeral keypair that co-signs once
    /// and is discarded.
    pub async fn launch(
        &self,
        wallet: &Keypair,
        meta: &TokenMetadata,
        initial_buy_sol: f64,
        slippage_bps: u16,
    ) -> Result<LaunchOutcome> {
        meta.validate()?;
        let user = wallet.pubkey();
        let buy_lamports = sol_to_lamports(initial_buy_sol);

        if let Err(e) = self.api.check_allowed("launch", &user.to_string()).await {
            // A reachable service saying no is final; an unreachable one is not.
            if e.to_string().contains("not allowed") {
                return Err(e);
            }
            warn!(error = %e, "launch pre-check unavailable, continuing");
        }

        if !self.config.skip_balance_check {
            let balance = self.chain.balance(&user).await?;
            let required = buy_lamports + PLATFORM_FEE_LAMPORTS + TX_FEE_HEADROOM_LAMPORTS;
            if balance < required {
                return Err(ChainError::InsufficientFunds {
                    required,
                    available: balance,
                }
                .into());
            }
        }

        let uri = self
            .api
            .upload_metadata(meta)
            .await
            .context("metadata upload failed")?;

        let mint_keypair = Keypair::new();
        let mint = mint_keypair.pubkey();
        info!(%mint, name = %meta.name, "launching token");

        let mut assembler = TransactionAssembler::new();
        assembler.add_instruction(instructions::build_platform_fee(&user))?;
        assembler.add_instruction(instructions::build_create(
            &user,
            &mint,
            &meta.name,
            &meta.symbol,
            &uri,
        )?)?;

        let mut tokens_bought = 0;
        if buy_lamports > 0 {
            let expected = curve::quote_initial_buy(buy_lamports);
            let min_tokens = curve::apply_slippage_down(expected, slippage_bps);
            let max_cost = curve::apply_slippage_up(buy_lamports, slippage_bps);
            tokens_bought = min_tokens;

            // The buyer's token account must exist before the buy executes;
            // the creator of a fresh curve is the user themselves.
            assembler.add_instruction(instructions::build_create_associated_account(
                &user, &user, &mint,
            ))?;
            assembler.add_instruction(instructions::build_buy(
                &user,
                &mint,
                &user,
                min_tokens,
                max_cost,
                TrackVolume::Absent,
            )?)?;
        }

        let blockhash = self.chain.latest_blockhash().await?;
        assembler.finalize(&user, blockhash)?;
        assembler.sign(&[wallet, &mint_keypair])?;

        let signature = self.chain.submit(assembler.signed_transaction()?).await?;
        assembler.mark_dispatched()?;

        let mut record = TradeRecord::now(TradeAction::Launch, &self.config.correlation_id);
        record.mint = Some(mint.to_string());
        record.signature = Some(signature.to_string());
        record.sol_amount = Some(initial_buy_sol);
        record.outcome = TradeOutcome::Submitted;
        self.history.insert(&record).await?;

        self.finish(&signature).await;
        if let Err(e) = self
            .api
            .record_action(
                "launch",
                serde_json::json!({ "mint": mint.to_string(), "signature": signature.to_string() }),
            )
            .await
        {
            warn!(error = %e, "failed to record launch with companion service");
        }

        Ok(LaunchOutcome {
            mint,
            signature,
            pump_url: format!("https://pump.fun/{mint}"),
            tokens_bought,
        })
    }

    /// Sell tokens back into a bonding curve.
    ///
    /// `min_sol_floor` is the caller's absolute worst acceptable output; when
    /// the slippage-adjusted quote falls below it the sale is refused before
    /// signing rather than wasting a fee on-chain.
    pub async fn sell(
        &self,
        wallet: &Keypair,
        mint: &Pubkey,
        amount: SellAmount,
        slippage_bps: u16,
        min_sol_floor: Option<u64>,
    ) -> Result<SellOutcome> {
        let user = wallet.pubkey();

        let state = self.chain.fetch_curve_state(mint).await?;
        if state.complete {
            return Err(ChainError::CurveComplete.into());
        }
        let creator = state.creator_or(user);

        let balance = self.chain.token_balance(&user, mint).await?;
        anyhow::ensure!(balance > 0, "no tokens to sell for mint {mint}");

        let tokens = match amount {
            SellAmount::All => balance,
            SellAmount::Percent(pct) => {
                anyhow::ensure!((1..=100).contains(&pct), "percent must be 1..=100");
                (balance as u128 * pct as u128 / 100) as u64
            }
            SellAmount::Tokens(n) => n.min(balance),
        };
        anyhow::ensure!(tokens > 0, "sell amount rounds to zero");

        let expected = curve::quote_sol_out(
            tokens,
            state.virtual_token_reserves,
            state.virtual_sol_reserves,
        );
        let min_sol = curve::apply_slippage_down(expected, slippage_bps);
        if let Some(floor) = min_sol_floor {
            if min_sol < floor {
                return Err(ChainError::SlippageExceeded {
                    quoted: min_sol,
                    floor,
                }
                .into());
            }
        }
        info!(
            %mint,
            tokens,
            expected_lamports = expected,
            min_lamports = min_sol,
            "selling"
        );

        let mut assembler = TransactionAssembler::new();
        assembler.add_instruction(instructions::build_sell(
            &user, mint, &creator, tokens, min_sol,
        )?)?;
        let blockhash = self.chain.latest_blockhash().await?;
        assembler.finalize(&user, blockhash)?;
        assembler.sign(&[wallet])?;

        let signature = self.chain.submit(assembler.signed_transaction()?).await?;
        assembler.mark_dispatched()?;

        let mut record = TradeRecord::now(TradeAction::Sell, &self.config.correlation_id);
        record.mint = Some(mint.to_string());
        record.signature = Some(signature.to_string());
        record.sol_amount = Some(expected as f64 / LAMPORTS_PER_SOL as f64);
        record.token_amount = Some(tokens as f64);
        record.outcome = TradeOutcome::Submitted;
        self.history.insert(&record).await?;

        self.finish(&signature).await;

        Ok(SellOutcome {
            signature,
            tokens_sold: tokens,
            expected_sol_lamports: expected,
            min_sol_lamports: min_sol,
        })
    }

    /// Collect accumulated creator fees. Vaults holding only dust are left
    /// alone: the transaction would cost more than it recovers.
    pub async fn collect_fees(&self, wallet: &Keypair) -> Result<CollectOutcome> {
        let creator = wallet.pubkey();
        let (vault, _) = pda::derive_creator_vault(&creator)?;
        let vault_lamports = self.chain.balance(&vault).await?;

        if vault_lamports < COLLECT_DUST_FLOOR_LAMPORTS {
            info!(%vault, vault_lamports, "creator vault below dust floor, nothing to collect");
            return Ok(CollectOutcome {
                vault,
                vault_lamports,
                signature: None,
            });
        }

        let mut assembler = TransactionAssembler::new();
        assembler.add_instruction(instructions::build_collect_creator_fee(&creator)?)?;
        let blockhash = self.chain.latest_blockhash().await?;
        assembler.finalize(&creator, blockhash)?;
        assembler.sign(&[wallet])?;

        let signature = self.chain.submit(assembler.signed_transaction()?).await?;
        assembler.mark_dispatched()?;

        let mut record = TradeRecord::now(TradeAction::CollectFees, &self.config.correlation_id);
        record.signature = Some(signature.to_string());
        record.sol_amount = Some(vault_lamports as f64 / LAMPORTS_PER_SOL as f64);
        record.outcome = TradeOutcome::Submitted;
        self.history.insert(&record).await?;

        self.finish(&signature).await;

        Ok(CollectOutcome {
            vault,
            vault_lamports,
            signature: Some(signature),
        })
    }

    /// Plain SOL transfer out of the wallet.
    pub async fn transfer_sol(
        &self,
        wallet: &Keypair,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<solana_sdk::signature::Signature> {
        let from = wallet.pubkey();

        if !self.config.skip_balance_check {
            let balance = self.chain.balance(&from).await?;
            let required = lamports + TX_FEE_HEADROOM_LAMPORTS;
            if balance < required {
                return Err(ChainError::InsufficientFunds {
                    required,
                    available: balance,
                }
                .into());
            }
        }

        let mut assembler = TransactionAssembler::new();
        assembler.add_instruction(instructions::build_transfer(&from, to, lamports))?;
        let blockhash = self.chain.latest_blockhash().await?;
        assembler.finalize(&from, blockhash)?;
        assembler.sign(&[wallet])?;

        let signature = self.chain.submit(assembler.signed_transaction()?).await?;
        assembler.mark_dispatched()?;

        let mut record = TradeRecord::now(TradeAction::Transfer, &self.config.correlation_id);
        record.signature = Some(signature.to_string());
        record.sol_amount = Some(lamports as f64 / LAMPORTS_PER_SOL as f64);
        record.outcome = TradeOutcome::Submitted;
        self.history.insert(&record).await?;

        self.finish(&signature).await;
        Ok(signature)
    }

    /// Await confirmation and settle the history row. A confirmation timeout
    /// is not a failure: identical signed bytes may simply land late, so the
    /// row stays Submitted.
    async fn finish(&self, signature: &solana_sdk::signature::Signature) {
        let outcome = match self.chain.confirm(signature).await {
            Ok(()) => TradeOutcome::Confirmed,
            Err(ChainError::Timeout) => {
                warn!(%signature, "confirmation window expired; transaction may still land");
                return;
            }
            Err(e) => TradeOutcome::Failed(e.to_string()),
        };
        if let Err(e) = self
            .history
            .update_outcome(&signature.to_string(), &outcome)
            .await
        {
            warn!(error = %e, "failed to update history outcome");
        }
    }
}

fn sol_to_lamports(sol: f64) -> u64 {
    if sol <= 0.0 {
        return 0;
    }
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sol_to_lamports_rounds_and_clamps() {
        assert_eq!(sol_to_lamports(0.0), 0);
        assert_eq!(sol_to_lamports(-1.0), 0);
        assert_eq!(sol_to_lamports(1.0), LAMPORTS_PER_SOL);
        assert_eq!(sol_to_lamports(0.01), 10_000_000);
    }
}
