//! Ledger RPC boundary.
//!
//! Holds a non-empty, failover-ordered set of RPC endpoints behind a shared
//! rate limiter. Reads (blockhash, balances, account state) get a bounded
//! retry with backoff and jitter; a submit is sent exactly once per call.
//! Because a signed transaction's bytes are deterministic, the caller may
//! safely re-submit identical bytes after a timeout - the ledger deduplicates
//! on the signature.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonempty::NonEmpty;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::TransactionConfirmationStatus;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::config::RuntimeConfig;
use crate::error::ChainError;
use crate::pump::curve::CurveState;
use crate::pump::pda;

pub struct ChainClient {
    clients: NonEmpty<Arc<RpcClient>>,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    retry_attempts: usize,
    confirm_timeout: Duration,
}

impl ChainClient {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let endpoints = NonEmpty::from_vec(config.rpc_endpoints.clone())
            .ok_or_else(|| anyhow::anyhow!("rpc_endpoints cannot be empty"))?;

        let timeout = Duration::from_secs(config.rpc_timeout_secs);
        let clients = endpoints.map(|endpoint| Arc::new(RpcClient::new_with_timeout(endpoint, timeout)));

        let quota = Quota::per_second(
            NonZeroU32::new(config.rpc_rate_limit_rps).unwrap_or(NonZeroU32::new(10).unwrap()),
        );

        Ok(Self {
            clients,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            retry_attempts: config.rpc_retry_attempts,
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
        })
    }

    /// Run `op` against each endpoint in order until one answers. Application
    /// errors are returned immediately; only transport failures rotate.
    async fn each_endpoint<T, F, Fut>(&self, op: F) -> Result<T, ChainError>
    where
        F: Fn(Arc<RpcClient>) -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        let mut last: Option<ChainError> = None;
        for client in self.clients.iter() {
            self.rate_limiter.until_ready().await;
            match op(Arc::clone(client)).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let err = classify(e);
                    if err.is_transient() && self.clients.len() > 1 {
                        warn!(error = %err, "rpc endpoint failed, rotating to next");
                        last = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        last.map_or_else(
            || Err(ChainError::Network("no rpc endpoint reachable".to_string())),
            Err,
        )
    }

    /// Bounded retry with backoff and jitter, for reads only.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, ChainError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ChainError>>,
    {
        let strategy = ExponentialBackoff::from_millis(250)
            .map(jitter)
            .take(self.retry_attempts);
        RetryIf::spawn(strategy, op, |e: &ChainError| e.is_transient()).await
    }

    pub async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        self.with_retry(move || {
            self.each_endpoint(|c| async move { c.get_latest_blockhash().await })
        })
        .await
    }

    /// Lamport balance of an account; zero when the account does not exist.
    pub async fn balance(&self, address: &Pubkey) -> Result<u64, ChainError> {
        let address = *address;
        self.with_retry(move || {
            self.each_endpoint(move |c| async move { c.get_balance(&address).await })
        })
        .await
    }

    /// Raw token balance of the user's associated token account. A missing
    /// account means no position: zero, not an error.
    pub async fn token_balance(&self, user: &Pubkey, mint: &Pubkey) -> Result<u64, ChainError> {
        let (ata, _) = pda::derive_associated_token(user, mint)?;
        let result = self
            .with_retry(move || {
                self.each_endpoint(move |c| async move { c.get_token_account_balance(&ata).await })
            })
            .await;
        match result {
            Ok(amount) => Ok(amount.amount.parse::<u64>().unwrap_or(0)),
            Err(ChainError::Rpc { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Current bonding curve snapshot for a mint. Each call reflects one
    /// point in time; quotes must not be reused across calls.
    pub async fn fetch_curve_state(&self, mint: &Pubkey) -> Result<CurveState, ChainError> {
        let (curve_address, _) = pda::derive_bonding_curve(mint)?;
        let response = self
            .with_retry(move || {
                self.each_endpoint(move |c| async move {
                    c.get_account_with_commitment(&curve_address, CommitmentConfig::confirmed())
                        .await
                })
            })
            .await?;
        match response.value {
            Some(account) => Ok(CurveState::decode(&account.data)?),
            None => Err(ChainError::AccountMissing(curve_address)),
        }
    }

    /// Dispatch a fully signed transaction. Sent once; no hidden retry.
    pub async fn submit(&self, tx: &Transaction) -> Result<Signature, ChainError> {
        self.rate_limiter.until_ready().await;
        let signature = self
            .clients
            .first()
            .send_transaction(tx)
            .await
            .map_err(classify)?;
        debug!(%signature, "transaction submitted");
        Ok(signature)
    }

    /// Poll until the signature reaches confirmed/finalized commitment, the
    /// transaction fails on-chain, or the confirmation window expires.
    pub async fn confirm(&self, signature: &Signature) -> Result<(), ChainError> {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            self.rate_limiter.until_ready().await;
            let response = self
                .clients
                .first()
                .get_signature_statuses(&[*signature])
                .await
                .map_err(classify)?;

            if let Some(Some(status)) = response.value.first() {
                if let Some(err) = &status.err {
                    return Err(ChainError::Rpc {
                        code: -1,
                        message: format!("transaction failed on-chain: {err}"),
                    });
                }
                if matches!(
                    status.confirmation_status,
                    Some(TransactionConfirmationStatus::Confirmed)
                        | Some(TransactionConfirmationStatus::Finalized)
                ) {
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(ChainError::Timeout);
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Devnet faucet request.
    pub async fn request_airdrop(
        &self,
        address: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, ChainError> {
        let address = *address;
        self.with_retry(move || {
            self.each_endpoint(move |c| async move { c.request_airdrop(&address, lamports).await })
        })
        .await
    }
}

fn classify(e: ClientError) -> ChainError {
    match e.kind {
        ClientErrorKind::Reqwest(err) if err.is_timeout() => ChainError::Timeout,
        ClientErrorKind::Reqwest(err) => ChainError::Network(err.to_string()),
        ClientErrorKind::Io(err) => ChainError::Network(err.to_string()),
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
            ChainError::Rpc { code, message }
        }
        ClientErrorKind::RpcError(err) => ChainError::Rpc {
            code: -1,
            message: err.to_string(),
        },
        ClientErrorKind::TransactionError(err) => ChainError::Rpc {
            code: -1,
            message: err.to_string(),
        },
        other => ChainError::Network(other.to_string()),
    }
}
