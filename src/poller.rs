use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PollError;
use crate::metrics::parser::{collect_stats, INFO_SECTIONS};
use crate::metrics::RawStats;
use crate::redis_client::{Connector, NodeAddress, NodeConnection};

/// Collects the INFO stats of a single node.
///
/// Connect, optional `AUTH`, one `INFO` per section, then a best-effort
/// `QUIT`. Any failure before the INFO queries fails the whole node; a
/// failing INFO section only drops that section.
pub async fn poll_node<C>(
    connector: &C,
    addr: &str,
    password: Option<&str>,
    timeout: Duration,
) -> Result<(NodeAddress, RawStats), PollError>
where
    C: Connector + ?Sized,
{
    let node = NodeAddress::parse(addr)?;
    let mut conn = connector.connect(&node, timeout).await?;

    if let Some(password) = password.filter(|p| !p.is_empty()) {
        let reply = conn.auth(password).await?;
        if reply != "OK" {
            return Err(PollError::Auth {
                addr: node.to_string(),
                reply,
            });
        }
    }

    let stats = collect_stats(&mut conn, &INFO_SECTIONS).await;

    if let Err(e) = conn.quit().await {
        debug!(addr = %node, error = %e, "QUIT failed, dropping connection");
    }

    if stats.is_empty() {
        warn!(addr = %node, "node returned no INFO fields");
    }

    Ok((node, stats))
}
