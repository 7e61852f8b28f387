pub mod collector;
pub mod mapper;
pub mod parser;
pub mod percentiles;

use std::collections::HashMap;

use serde::Serialize;

pub use collector::{CycleSummary, StatusCollector, StatusSnapshot};
pub use mapper::{MetricSpec, RecordContext};

/// Flat `field → raw value` view of one node's INFO reply.
/// Built fresh for every poll and dropped once records are built.
pub type RawStats = HashMap<String, String>;

/// Whether a field is reported as-is or as a rate by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricKind {
    #[serde(rename = "GAUGE")]
    Gauge,
    #[serde(rename = "COUNTER")]
    Counter,
}

impl MetricKind {
    /// Naming suffix appended to the metric name. Counters get `_cps`
    /// because the backend turns them into per-second rates.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Gauge => "",
            Self::Counter => "_cps",
        }
    }
}

/// One observation shipped to the transfer backend.
///
/// Field names follow the backend's `MetricValue` JSON schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricRecord {
    /// Hostname of the collecting agent, not of the Redis node.
    pub endpoint: String,
    /// e.g. "redis.used_memory" or "redis.expired_keys_cps"
    pub metric: String,
    /// Raw INFO value, copied verbatim.
    pub value: String,
    /// Sampling interval in seconds.
    pub step: u64,
    #[serde(rename = "counterType")]
    pub kind: MetricKind,
    /// "port=6379" optionally followed by ",<extra tags>"
    pub tags: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}
