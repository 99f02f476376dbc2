//! Trade history ledger.
//!
//! Every wallet-affecting action gets a persistent row: what was attempted,
//! which transaction carried it, and how it ended. The storage contract is a
//! trait so the sqlite backend stays swappable.

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use sqlite::SqliteHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Setup,
    Import,
    Launch,
    Buy,
    Sell,
    CollectFees,
    Transfer,
    Backup,
    Restore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TradeOutcome {
    /// No transaction involved (wallet maintenance actions).
    LocalOnly,
    /// Sent to the ledger, confirmation still pending.
    Submitted,
    Confirmed,
    Failed(String),
}

/// One row of operational memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Database id, set by the backend.
    pub id: Option<i64>,
    pub action: TradeAction,
    pub mint: Option<String>,
    pub signature: Option<String>,
    /// SOL moved by the action, for display only.
    pub sol_amount: Option<f64>,
    /// Raw token units moved by the action, for display only.
    pub token_amount: Option<f64>,
    pub correlation_id: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub outcome: TradeOutcome,
}

impl TradeRecord {
    pub fn now(action: TradeAction, correlation_id: &str) -> Self {
        Self {
            id: None,
            action,
            mint: None,
            signature: None,
            sol_amount: None,
            token_amount: None,
            correlation_id: correlation_id.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            outcome: TradeOutcome::LocalOnly,
        }
    }
}

/// Formal contract for the persistent trade history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert a new record, returning its id.
    async fn insert(&self, record: &TradeRecord) -> Result<i64>;

    /// Update the outcome of the record carrying this signature.
    async fn update_outcome(&self, signature: &str, outcome: &TradeOutcome) -> Result<()>;

    /// Most recent records, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<TradeRecord>>;

    async fn count(&self) -> Result<i64>;
}
