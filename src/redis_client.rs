use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ConnectionInfo, FromRedisValue, RedisConnectionInfo};

use crate::error::PollError;

// ─── Node address ────────────────────────────────────────────────

/// A Redis instance to poll, parsed from a `host:port` config entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    /// Accepts `host:port` and `[v6-addr]:port`.
    pub fn parse(addr: &str) -> Result<Self, PollError> {
        let malformed = || PollError::Address(addr.to_owned());

        let (host, port) = addr.trim().rsplit_once(':').ok_or_else(malformed)?;
        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(malformed)?,
            None if host.contains(':') => return Err(malformed()),
            None => host,
        };
        if host.is_empty() {
            return Err(malformed());
        }
        let port = port.parse::<u16>().map_err(|_| malformed())?;

        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ─── Connection seams ────────────────────────────────────────────

/// The three commands the poller needs from an open node connection.
#[async_trait]
pub trait NodeConnection: Send {
    /// Sends `AUTH` and returns the server's status reply (`"OK"` on success).
    async fn auth(&mut self, password: &str) -> Result<String, PollError>;

    /// Returns the raw text of `INFO <section>`.
    async fn info(&mut self, section: &str) -> Result<String, PollError>;

    async fn quit(&mut self) -> Result<(), PollError>;
}

/// Opens connections to nodes. Implementations must bound the connect by
/// `timeout`.
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: NodeConnection;

    async fn connect(&self, addr: &NodeAddress, timeout: Duration)
        -> Result<Self::Conn, PollError>;
}

// ─── redis-rs implementation ─────────────────────────────────────

/// Opens one fresh multiplexed connection per poll. Nothing is pooled;
/// every cycle reconnects so a restarted node is picked up immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

pub struct RedisConnection {
    conn: MultiplexedConnection,
    addr: String,
    timeout: Duration,
}

#[async_trait]
impl Connector for RedisConnector {
    type Conn = RedisConnection;

    async fn connect(
        &self,
        addr: &NodeAddress,
        timeout: Duration,
    ) -> Result<RedisConnection, PollError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(addr.host.clone(), addr.port),
            redis: RedisConnectionInfo::default(),
        };
        let client = redis::Client::open(info).map_err(|source| PollError::Connect {
            addr: addr.to_string(),
            source,
        })?;

        let conn = match tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(source)) => {
                return Err(PollError::Connect {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(PollError::Timeout {
                    addr: addr.to_string(),
                    op: "connect",
                    secs: timeout.as_secs(),
                })
            }
        };

        Ok(RedisConnection {
            conn,
            addr: addr.to_string(),
            timeout,
        })
    }
}

impl RedisConnection {
    /// Runs `cmd`, giving up after the connection's timeout.
    async fn query<T>(&mut self, op: &'static str, cmd: redis::Cmd) -> Result<T, PollError>
    where
        T: FromRedisValue + Send,
    {
        match tokio::time::timeout(self.timeout, cmd.query_async::<_, T>(&mut self.conn)).await {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(PollError::Timeout {
                addr: self.addr.clone(),
                op,
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl NodeConnection for RedisConnection {
    async fn auth(&mut self, password: &str) -> Result<String, PollError> {
        let mut cmd = redis::cmd("AUTH");
        cmd.arg(password);
        match self.query::<String>("AUTH", cmd).await {
            // WRONGPASS and friends come back as server errors
            Err(PollError::Redis(e)) => Ok(e.to_string()),
            other => other,
        }
    }

    async fn info(&mut self, section: &str) -> Result<String, PollError> {
        let mut cmd = redis::cmd("INFO");
        cmd.arg(section);
        self.query("INFO", cmd).await
    }

    async fn quit(&mut self) -> Result<(), PollError> {
        self.query("QUIT", redis::cmd("QUIT")).await
    }
}
