use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::TransferError;
use crate::metrics::MetricRecord;

const UPDATE_METHOD: &str = "Transfer.Update";

/// Delivers a cycle's batch to the metrics backend.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn send(&self, batch: Vec<MetricRecord>) -> Result<TransferResponse, TransferError>;
}

/// What the transfer service reports back for one `Transfer.Update`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "Total", default)]
    pub total: i64,
    #[serde(rename = "Invalid", default)]
    pub invalid: i64,
    #[serde(rename = "Latency", default)]
    pub latency: i64,
}

// ─── Wire types ──────────────────────────────────────────────────
// Go net/rpc/jsonrpc framing: one JSON object per line each way.

#[derive(Serialize)]
struct RpcRequest<'a> {
    method: &'static str,
    params: [&'a [MetricRecord]; 1],
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse {
    id: u64,
    #[serde(default)]
    result: Option<TransferResponse>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

// ─── JSON-RPC client ─────────────────────────────────────────────

/// Talks to an Open-Falcon transfer over plain TCP, one connection per
/// batch. The whole call (connect, write, read) is bounded by `timeout`.
pub struct RpcTransfer {
    addr: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RpcTransfer {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, batch: &[MetricRecord]) -> Result<TransferResponse, TransferError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_vec(&RpcRequest {
            method: UPDATE_METHOD,
            params: [batch],
            id,
        })?;
        line.push(b'\n');

        let mut stream = TcpStream::connect(&self.addr).await?;
        stream.write_all(&line).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut reply = String::new();
        if reader.read_line(&mut reply).await? == 0 {
            return Err(TransferError::Closed);
        }

        let resp: RpcResponse = serde_json::from_str(&reply)?;
        if resp.id != id {
            return Err(TransferError::IdMismatch {
                expected: id,
                got: resp.id,
            });
        }
        match resp.error {
            None | Some(serde_json::Value::Null) => Ok(resp.result.unwrap_or_default()),
            Some(serde_json::Value::String(msg)) => Err(TransferError::Rpc(msg)),
            Some(other) => Err(TransferError::Rpc(other.to_string())),
        }
    }
}

#[async_trait]
impl Transfer for RpcTransfer {
    async fn send(&self, batch: Vec<MetricRecord>) -> Result<TransferResponse, TransferError> {
        tokio::time::timeout(self.timeout, self.call(&batch))
            .await
            .map_err(|_| TransferError::Timeout(self.timeout.as_secs()))?
    }
}
