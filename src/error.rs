use std::io;
use std::path::PathBuf;
use thiserror::Error;

// ─── Configuration ───────────────────────────────────────────────

/// Anything that stops `cfg.json` from becoming a usable `Config`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ─── Node polling ────────────────────────────────────────────────

/// Per-node failures. None of these abort a cycle; the node is skipped.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("malformed node address {0:?} (expected host:port)")]
    Address(String),

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: redis::RedisError,
    },

    #[error("{op} on {addr} timed out after {secs}s")]
    Timeout {
        addr: String,
        op: &'static str,
        secs: u64,
    },

    #[error("auth on {addr} rejected: {reply}")]
    Auth { addr: String, reply: String },

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

// ─── Transfer ────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("transfer io error: {0}")]
    Io(#[from] io::Error),

    #[error("transfer codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("transfer call timed out after {0}s")]
    Timeout(u64),

    #[error("transfer closed the connection without replying")]
    Closed,

    #[error("transfer replied with id {got}, expected {expected}")]
    IdMismatch { expected: u64, got: u64 },

    #[error("transfer rejected batch: {0}")]
    Rpc(String),
}

// ─── Hostname ────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum HostnameError {
    #[error("operating system did not report a hostname")]
    Unavailable,
}
