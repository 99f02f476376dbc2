//! SQLite implementation of the trade history store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::history::{HistoryStore, TradeAction, TradeOutcome, TradeRecord};

#[derive(FromRow)]
struct TradeRow {
    id: i64,
    action: String,
    mint: Option<String>,
    signature: Option<String>,
    sol_amount: Option<f64>,
    token_amount: Option<f64>,
    correlation_id: String,
    timestamp: i64,
    outcome: String,
}

pub struct SqliteHistory {
    pool: Pool<Sqlite>,
}

impl SqliteHistory {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
            .await
            .context("failed to open history database")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT NOT NULL,
                mint TEXT,
                signature TEXT,
                sol_amount REAL,
                token_amount REAL,
                correlation_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                outcome TEXT NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create trades table")?;

        info!(db = %db_path.display(), "history ledger opened");
        Ok(Self { pool })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn insert(&self, record: &TradeRecord) -> Result<i64> {
        debug!(action = ?record.action, "inserting history record");
        let id = sqlx::query(
            r#"
            INSERT INTO trades (action, mint, signature, sol_amount, token_amount, correlation_id, timestamp, outcome)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(serde_json::to_string(&record.action)?)
        .bind(&record.mint)
        .bind(&record.signature)
        .bind(record.sol_amount)
        .bind(record.token_amount)
        .bind(&record.correlation_id)
        .bind(record.timestamp)
        .bind(serde_json::to_string(&record.outcome)?)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    async fn update_outcome(&self, signature: &str, outcome: &TradeOutcome) -> Result<()> {
        sqlx::query("UPDATE trades SET outcome = ? WHERE signature = ?")
            .bind(serde_json::to_string(outcome)?)
            .bind(signature)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> =
            sqlx::query_as("SELECT * FROM trades ORDER BY timestamp DESC, id DESC LIMIT ?")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .context("failed to fetch history")?;

        rows.into_iter()
            .map(|row| {
                let action: TradeAction = serde_json::from_str(&row.action)?;
                let outcome: TradeOutcome = serde_json::from_str(&row.outcome)?;
                Ok(TradeRecord {
                    id: Some(row.id),
                    action,
                    mint: row.mint,
                    signature: row.signature,
                    sol_amount: row.sol_amount,
                    token_amount: row.token_amount,
                    correlation_id: row.correlation_id,
                    timestamp: row.timestamp,
                    outcome,
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
