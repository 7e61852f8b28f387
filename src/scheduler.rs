use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::HostnameError;
use crate::metrics::mapper::{build_records, node_tags};
use crate::metrics::{CycleSummary, MetricRecord, MetricSpec, RecordContext, StatusCollector};
use crate::poller::poll_node;
use crate::redis_client::Connector;
use crate::transfer::Transfer;

/// The validated subset of the config that drives collection.
#[derive(Debug, Clone)]
pub struct CollectionPlan {
    /// `host:port` entries, polled in this order.
    pub addrs: Vec<String>,
    pub password: Option<String>,
    /// Bound on connect and on each command, per node.
    pub timeout: Duration,
    /// Tick period; also the `step` of every record.
    pub interval: Duration,
    pub attach_tags: String,
}

/// Periodic collection loop.
///
/// Each tick resolves the hostname, polls every node concurrently, maps
/// their stats into records and submits the merged batch exactly once.
/// Nothing carries over from one tick to the next.
pub struct Scheduler<C, T, H> {
    plan: CollectionPlan,
    spec: MetricSpec,
    connector: C,
    transfer: T,
    hostname: H,
    status: Arc<StatusCollector>,
}

impl<C, T, H> Scheduler<C, T, H>
where
    C: Connector,
    T: Transfer,
    H: Fn() -> Result<String, HostnameError> + Send + Sync,
{
    pub fn new(
        plan: CollectionPlan,
        spec: MetricSpec,
        connector: C,
        transfer: T,
        hostname: H,
        status: Arc<StatusCollector>,
    ) -> Self {
        Self {
            plan,
            spec,
            connector,
            transfer,
            hostname,
            status,
        }
    }

    /// Runs until `cancel` fires. The first cycle happens one interval
    /// after start. Cancelling mid-cycle abandons that cycle's batch.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            nodes = self.plan.addrs.len(),
            interval_secs = self.plan.interval.as_secs(),
            fields = self.spec.len(),
            "collection loop started",
        );
        debug!(
            fields = ?self.spec.iter().collect::<Vec<_>>(),
            "metric specification",
        );
        if self.spec.is_empty() {
            warn!("no metric fields configured, every batch will be empty");
        }

        let mut ticker = tokio::time::interval(self.plan.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // interval() fires immediately; consume that one.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown requested mid-cycle, batch dropped");
                    break;
                }
                _ = self.tick() => {}
            }
        }

        info!("collection loop stopped");
    }

    /// One full cycle. Returns the number of records dispatched, or `None`
    /// when the cycle was skipped before polling.
    pub async fn tick(&self) -> Option<usize> {
        let hostname = match (self.hostname)() {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "cannot resolve hostname, skipping cycle");
                self.status.record_skip();
                return None;
            }
        };

        let timestamp = chrono::Utc::now().timestamp();
        let (batch, failed_nodes) = self.collect(&hostname, timestamp).await;
        let records = batch.len();

        let transfer_ok = match self.transfer.send(batch).await {
            Ok(resp) => {
                debug!(
                    records,
                    total = resp.total,
                    invalid = resp.invalid,
                    latency = resp.latency,
                    message = %resp.message,
                    "batch delivered",
                );
                true
            }
            Err(e) => {
                warn!(records, error = %e, "batch delivery failed");
                false
            }
        };

        info!(
            records,
            failed = failed_nodes.len(),
            "cycle complete",
        );
        self.status.record_cycle(CycleSummary {
            timestamp,
            hostname,
            records,
            failed_nodes,
            transfer_ok,
        });

        Some(records)
    }

    /// Polls every node and merges their records. Also returns the
    /// addresses that contributed nothing.
    async fn collect(&self, hostname: &str, timestamp: i64) -> (Vec<MetricRecord>, Vec<String>) {
        let polls = self
            .plan
            .addrs
            .iter()
            .map(|addr| self.collect_node(addr, hostname, timestamp));
        let results = join_all(polls).await;

        let mut batch = Vec::new();
        let mut failed = Vec::new();
        for (addr, result) in self.plan.addrs.iter().zip(results) {
            match result {
                Some(records) => batch.extend(records),
                None => failed.push(addr.clone()),
            }
        }
        (batch, failed)
    }

    async fn collect_node(
        &self,
        addr: &str,
        hostname: &str,
        timestamp: i64,
    ) -> Option<Vec<MetricRecord>> {
        let started = Instant::now();
        let polled = poll_node(
            &self.connector,
            addr,
            self.plan.password.as_deref(),
            self.plan.timeout,
        )
        .await;
        self.status.record_poll(started.elapsed(), polled.is_ok());

        let (node, mut stats) = match polled {
            Ok(polled) => polled,
            Err(e) => {
                warn!(addr, error = %e, "node skipped this cycle");
                return None;
            }
        };

        let tags = node_tags(node.port, &self.plan.attach_tags);
        let ctx = RecordContext {
            endpoint: hostname,
            tags: &tags,
            timestamp,
            step: self.plan.interval.as_secs(),
        };
        let records = build_records(&mut stats, &self.spec, &ctx);
        debug!(addr, records = records.len(), "node polled");
        Some(records)
    }
}
