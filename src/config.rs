use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::error::ConfigError;
use crate::metrics::{MetricKind, MetricSpec};
use crate::scheduler::CollectionPlan;

/// Top-level layout of `cfg.json`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Log at debug level unless `--log-level` says otherwise.
    #[serde(default)]
    pub debug: bool,

    /// Endpoint name sent with every record. Empty means the OS hostname.
    #[serde(default)]
    pub hostname: String,

    /// Extra tags appended after `port=<port>`, e.g. "cluster=main,dc=eu".
    #[serde(default, rename = "attachtags")]
    pub attach_tags: String,

    /// Replaces the built-in field set when non-empty.
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricFlag>,

    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

/// The Redis nodes to poll.
#[derive(Debug, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub enable: bool,

    /// `host:port` entries.
    #[serde(default)]
    pub addrs: Vec<String>,

    /// Shared by every node. Empty disables `AUTH`.
    #[serde(default, alias = "passwd")]
    pub password: String,

    /// Per-node connect/command timeout in seconds. Default: 3.
    #[serde(default = "default_node_timeout")]
    pub timeout: u64,
}

/// Where batches go, and how often.
#[derive(Debug, Deserialize)]
pub struct TransferConfig {
    #[serde(default)]
    pub enable: bool,

    /// `host:port` of the transfer JSON-RPC listener.
    #[serde(default)]
    pub addr: String,

    /// Collection interval in seconds, also used as the record step. Default: 60.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Bound on one `Transfer.Update` call in seconds. Default: 5.
    #[serde(default = "default_transfer_timeout")]
    pub timeout: u64,
}

/// Status HTTP surface.
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(default = "default_listen")]
    pub listen: String,
}

/// A metric override entry: `1`/`true` for a gauge, anything else for a
/// counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MetricFlag {
    Bool(bool),
    Int(i64),
}

impl MetricFlag {
    pub fn kind(self) -> MetricKind {
        match self {
            Self::Bool(true) | Self::Int(1) => MetricKind::Gauge,
            _ => MetricKind::Counter,
        }
    }
}

/// Why the collection loop is not started.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotStarted {
    #[error("transfer is not enabled")]
    TransferDisabled,
    #[error("transfer addr is empty")]
    NoTransferAddr,
    #[error("daemon collection is not enabled")]
    DaemonDisabled,
    #[error("no daemon addrs configured")]
    NoAddrs,
}

// ─── Defaults ────────────────────────────────────────────────────

fn default_node_timeout() -> u64 {
    3
}
fn default_interval() -> u64 {
    60
}
fn default_transfer_timeout() -> u64 {
    5
}
fn default_listen() -> String {
    "0.0.0.0:1988".into()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            enable: false,
            addrs: Vec::new(),
            password: String::new(),
            timeout: default_node_timeout(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            enable: false,
            addr: String::new(),
            interval: default_interval(),
            timeout: default_transfer_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enable: false,
            listen: default_listen(),
        }
    }
}

// ─── Loading & derived views ─────────────────────────────────────

impl Config {
    /// Reads, parses and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Config = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transfer.interval == 0 {
            return Err(ConfigError::Invalid("transfer.interval must be > 0".into()));
        }
        if self.transfer.timeout == 0 {
            return Err(ConfigError::Invalid("transfer.timeout must be > 0".into()));
        }
        if self.daemon.timeout == 0 {
            return Err(ConfigError::Invalid("daemon.timeout must be > 0".into()));
        }
        if self.http.enable && self.http.listen.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "http.listen {:?} is not a socket address",
                self.http.listen
            )));
        }
        Ok(())
    }

    /// The configured override, or the built-in field set.
    pub fn metric_spec(&self) -> MetricSpec {
        if self.metrics.is_empty() {
            return MetricSpec::builtin();
        }
        MetricSpec::new(
            self.metrics
                .iter()
                .map(|(name, flag)| (name.clone(), flag.kind()))
                .collect(),
        )
    }

    pub fn hostname_override(&self) -> Option<&str> {
        Some(self.hostname.as_str()).filter(|h| !h.trim().is_empty())
    }

    /// Everything the scheduler needs, or the reason it must not run.
    pub fn collection_plan(&self) -> Result<CollectionPlan, NotStarted> {
        if !self.transfer.enable {
            return Err(NotStarted::TransferDisabled);
        }
        if self.transfer.addr.trim().is_empty() {
            return Err(NotStarted::NoTransferAddr);
        }
        if !self.daemon.enable {
            return Err(NotStarted::DaemonDisabled);
        }
        if self.daemon.addrs.is_empty() {
            return Err(NotStarted::NoAddrs);
        }

        Ok(CollectionPlan {
            addrs: self.daemon.addrs.clone(),
            password: Some(self.daemon.password.clone()).filter(|p| !p.is_empty()),
            timeout: Duration::from_secs(self.daemon.timeout),
            interval: Duration::from_secs(self.transfer.interval),
            attach_tags: self.attach_tags.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"{
        "debug": true,
        "hostname": "",
        "attachtags": "cluster=main",
        "metrics": { "used_memory": 1, "expired_keys": 0, "connected_clients": true },
        "daemon": { "enable": true, "addrs": ["127.0.0.1:6379", "127.0.0.1:6380"],
                    "password": "s3cret", "timeout": 2 },
        "transfer": { "enable": true, "addr": "127.0.0.1:8433", "interval": 30 },
        "http": { "enable": true, "listen": "127.0.0.1:1988" }
    }"#;

    fn parse(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_full_config() {
        let cfg = parse(FULL);
        cfg.validate().unwrap();
        assert!(cfg.debug);
        assert_eq!(cfg.attach_tags, "cluster=main");
        assert_eq!(cfg.daemon.addrs.len(), 2);
        assert_eq!(cfg.transfer.timeout, 5);
        assert_eq!(cfg.hostname_override(), None);

        let plan = cfg.collection_plan().unwrap();
        assert_eq!(plan.password.as_deref(), Some("s3cret"));
        assert_eq!(plan.timeout, Duration::from_secs(2));
        assert_eq!(plan.interval, Duration::from_secs(30));
    }

    #[test]
    fn metric_override_accepts_ints_and_bools() {
        let spec = parse(FULL).metric_spec();
        let fields: Vec<_> = spec.iter().collect();
        assert_eq!(
            fields,
            [
                ("connected_clients", MetricKind::Gauge),
                ("expired_keys", MetricKind::Counter),
                ("used_memory", MetricKind::Gauge),
            ]
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse("{}");
        cfg.validate().unwrap();
        assert_eq!(cfg.daemon.timeout, 3);
        assert_eq!(cfg.transfer.interval, 60);
        assert_eq!(cfg.http.listen, "0.0.0.0:1988");
        assert_eq!(cfg.metric_spec(), MetricSpec::builtin());
    }

    #[test]
    fn collection_plan_reports_why_it_cannot_start() {
        let mut cfg = parse(FULL);
        cfg.daemon.addrs.clear();
        assert_eq!(cfg.collection_plan().unwrap_err(), NotStarted::NoAddrs);

        cfg.daemon.enable = false;
        assert_eq!(cfg.collection_plan().unwrap_err(), NotStarted::DaemonDisabled);

        cfg.transfer.addr = " ".into();
        assert_eq!(cfg.collection_plan().unwrap_err(), NotStarted::NoTransferAddr);

        cfg.transfer.enable = false;
        assert_eq!(cfg.collection_plan().unwrap_err(), NotStarted::TransferDisabled);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = parse(r#"{ "transfer": { "interval": 0 } }"#);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_listen_is_rejected_only_when_http_enabled() {
        let off = parse(r#"{ "http": { "listen": "nowhere" } }"#);
        off.validate().unwrap();
        let on = parse(r#"{ "http": { "enable": true, "listen": "nowhere" } }"#);
        assert!(on.validate().is_err());
    }

    #[test]
    fn load_reads_file_and_reports_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.transfer.addr, "127.0.0.1:8433");

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        broken.write_all(b"{ not json").unwrap();
        assert!(matches!(
            Config::load(broken.path()),
            Err(ConfigError::Parse { .. })
        ));

        assert!(matches!(
            Config::load(Path::new("/definitely/not/here/cfg.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
