use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::LatencyQuantiles;

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 10 min, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 600_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe record of what the collection loop has been doing.
/// The scheduler writes, the status endpoint calls `snapshot()`.
pub struct StatusCollector {
    inner: Mutex<Inner>,
}

/// Outcome of the most recent completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    /// Seconds since the Unix epoch, as stamped on the records.
    pub timestamp: i64,
    pub hostname: String,
    pub records: usize,
    /// Addresses that contributed nothing this cycle.
    pub failed_nodes: Vec<String>,
    pub transfer_ok: bool,
}

/// Read-only view served at `/api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub uptime_secs: f64,
    pub cycles_total: u64,
    pub cycles_skipped: u64,
    pub nodes_polled: u64,
    pub nodes_failed: u64,
    pub records_dispatched: u64,
    pub transfer_failures: u64,
    pub poll_latency_us: LatencyQuantiles,
    pub last_cycle: Option<CycleSummary>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    poll_hist: Histogram<u64>,

    cycles_total: u64,
    cycles_skipped: u64,
    nodes_polled: u64,
    nodes_failed: u64,
    records_dispatched: u64,
    transfer_failures: u64,

    last_cycle: Option<CycleSummary>,
    start_time: Instant,
}

// ─── StatusCollector impl ────────────────────────────────────────

impl StatusCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// One node poll finished, successfully or not.
    pub fn record_poll(&self, latency: Duration, ok: bool) {
        let mut inner = self.inner.lock();
        inner.nodes_polled += 1;
        if !ok {
            inner.nodes_failed += 1;
        }
        let us = (latency.as_micros() as u64).max(HIST_LOW);
        let _ = inner.poll_hist.record(us.min(HIST_HIGH));
    }

    /// A tick was abandoned before polling (e.g. no hostname).
    pub fn record_skip(&self) {
        let mut inner = self.inner.lock();
        inner.cycles_total += 1;
        inner.cycles_skipped += 1;
    }

    /// A tick ran to completion and its batch was handed to transfer.
    pub fn record_cycle(&self, summary: CycleSummary) {
        let mut inner = self.inner.lock();
        inner.cycles_total += 1;
        if summary.transfer_ok {
            inner.records_dispatched += summary.records as u64;
        } else {
            inner.transfer_failures += 1;
        }
        inner.last_cycle = Some(summary);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for StatusCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            poll_hist: Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
                .expect("histogram creation"),
            cycles_total: 0,
            cycles_skipped: 0,
            nodes_polled: 0,
            nodes_failed: 0,
            records_dispatched: 0,
            transfer_failures: 0,
            last_cycle: None,
            start_time: Instant::now(),
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs_f64(),
            cycles_total: self.cycles_total,
            cycles_skipped: self.cycles_skipped,
            nodes_polled: self.nodes_polled,
            nodes_failed: self.nodes_failed,
            records_dispatched: self.records_dispatched,
            transfer_failures: self.transfer_failures,
            poll_latency_us: LatencyQuantiles::from(&self.poll_hist),
            last_cycle: self.last_cycle.clone(),
        }
    }
}
