//! Companion web service client and pump.fun metadata upload.
//!
//! The companion service only ever answers two questions the core cares
//! about: "is this action currently allowed?" before a trade and "record this
//! completed action" after one. Neither affects transaction-construction
//! correctness. Transport failures and 5xx responses get a bounded retry;
//! 4xx responses never do.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::multipart;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

use crate::config::RuntimeConfig;
use crate::types::TokenMetadata;

const PUMP_IPFS_URL: &str = "https://pump.fun/api/ipfs";

/// Standard response envelope from the companion service. A response without
/// an explicit `success` field counts as successful, matching the service's
/// older endpoints.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(flatten)]
    rest: Value,
}

impl ApiEnvelope {
    fn ok(&self) -> bool {
        self.success.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrendingToken {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_sol: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaderboardEntry {
    pub address: String,
    #[serde(default)]
    pub launches: u64,
    #[serde(default)]
    pub score: f64,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    correlation_id: String,
    retry_attempts: usize,
}

impl ApiClient {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("soulmint/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            correlation_id: config.correlation_id.clone(),
            retry_attempts: config.rpc_retry_attempts,
        })
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<ApiEnvelope> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let strategy = ExponentialBackoff::from_millis(500)
            .map(jitter)
            .take(self.retry_attempts);

        let http = &self.http;
        let correlation_id = self.correlation_id.as_str();
        let url_ref = url.as_str();
        let body_ref = &body;
        let response = RetryIf::spawn(
            strategy,
            move || async move {
                debug!(url = url_ref, "api request");
                let resp = http
                    .post(url_ref)
                    .header("x-correlation-id", correlation_id)
                    .json(body_ref)
                    .send()
                    .await
                    .map_err(RequestFailure::Transport)?;
                let status = resp.status();
                if status.is_server_error() {
                    return Err(RequestFailure::Server(status.as_u16()));
                }
                Ok(resp)
            },
            RequestFailure::is_retryable,
        )
        .await
        .map_err(|e| anyhow!("api request failed: {e}"))?;

        // Client errors are final: corrected input, not a retry, fixes them.
        if response.status().is_client_error() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("api rejected request ({status}): {detail}"));
        }

        let envelope: ApiEnvelope = response
            .json()
            .await
            .context("invalid response from companion service")?;
        Ok(envelope)
    }

    /// Pre-check: may this wallet perform `action` right now? An explicit
    /// denial carries the service's reason and hint.
    pub async fn check_allowed(&self, action: &str, wallet: &str) -> Result<()> {
        let envelope = self
            .post_json(
                "precheck",
                serde_json::json!({ "action": action, "wallet": wallet }),
            )
            .await?;
        if !envelope.ok() {
            let reason = envelope.error.unwrap_or_else(|| "not allowed".to_string());
            return match envelope.hint {
                Some(hint) => Err(anyhow!("{action} not allowed: {reason} ({hint})")),
                None => Err(anyhow!("{action} not allowed: {reason}")),
            };
        }
        Ok(())
    }

    /// Post-check: record a completed action. Best-effort; the caller only
    /// logs a failure here, it never unwinds a dispatched transaction.
    pub async fn record_action(&self, action: &str, payload: Value) -> Result<()> {
        let envelope = self
            .post_json(
                "actions",
                serde_json::json!({ "action": action, "data": payload }),
            )
            .await?;
        if !envelope.ok() {
            warn!(action, error = ?envelope.error, "companion service rejected action record");
        }
        Ok(())
    }

    pub async fn trending(&self, limit: usize) -> Result<Vec<TrendingToken>> {
        let envelope = self
            .post_json("trending", serde_json::json!({ "limit": limit }))
            .await?;
        let tokens = envelope
            .rest
            .get("tokens")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(tokens).context("malformed trending response")
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let envelope = self.post_json("leaderboard", serde_json::json!({})).await?;
        let entries = envelope
            .rest
            .get("entries")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(entries).context("malformed leaderboard response")
    }

    /// Upload token metadata (and image, when given) to pump.fun's IPFS
    /// gateway. Returns the hosted metadata URI consumed by the create
    /// instruction.
    pub async fn upload_metadata(&self, meta: &TokenMetadata) -> Result<String> {
        let mut form = multipart::Form::new()
            .text("name", meta.name.clone())
            .text("symbol", meta.symbol.clone())
            .text("description", meta.description.clone())
            .text("showName", "true");

        for (key, value) in [
            ("twitter", &meta.twitter),
            ("telegram", &meta.telegram),
            ("website", &meta.website),
        ] {
            if let Some(value) = value {
                form = form.text(key, value.clone());
            }
        }

        if let Some(image_url) = &meta.image_url {
            let image = self
                .http
                .get(image_url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .context("failed to fetch token image")?
                .bytes()
                .await
                .context("failed to read token image")?;
            let part = multipart::Part::bytes(image.to_vec())
                .file_name("image.png")
                .mime_str("image/png")?;
            form = form.part("file", part);
        }

        let response = self
            .http
            .post(PUMP_IPFS_URL)
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("metadata upload failed")?;

        let body: Value = response.json().await.context("invalid ipfs response")?;
        body.get("metadataUri")
            .and_then(Value::as_str)
            .or_else(|| {
                body.get("metadata")
                    .and_then(|m| m.get("uri"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
            .ok_or_else(|| anyhow!("ipfs response carried no metadata uri"))
    }
}

#[derive(Debug, thiserror::Error)]
enum RequestFailure {
    #[error("transport: {0}")]
    Transport(reqwest::Error),
    #[error("server error {0}")]
    Server(u16),
}

impl RequestFailure {
    fn is_retryable(e: &RequestFailure) -> bool {
        match e {
            RequestFailure::Transport(err) => err.is_timeout() || err.is_connect(),
            RequestFailure::Server(_) => true,
        }
    }
}
