use std::collections::BTreeMap;

use super::{MetricKind, MetricRecord, RawStats};

/// Prefix shared by every metric this agent emits.
pub const METRIC_PREFIX: &str = "redis.";

pub const HIT_RATIO_FIELD: &str = "keyspace_hit_ratio";
const HITS_FIELD: &str = "keyspace_hits";
const MISSES_FIELD: &str = "keyspace_misses";

/// Fields reported when the config does not override them.
const BUILTIN_FIELDS: [(&str, MetricKind); 13] = [
    ("connected_clients", MetricKind::Gauge),
    ("blocked_clients", MetricKind::Gauge),
    ("used_memory", MetricKind::Gauge),
    ("used_memory_rss", MetricKind::Gauge),
    ("used_memory_peak", MetricKind::Gauge),
    ("mem_fragmentation_ratio", MetricKind::Gauge),
    ("total_commands_processed", MetricKind::Counter),
    ("rejected_connections", MetricKind::Counter),
    ("expired_keys", MetricKind::Counter),
    ("evicted_keys", MetricKind::Counter),
    ("keyspace_hits", MetricKind::Counter),
    ("keyspace_misses", MetricKind::Counter),
    (HIT_RATIO_FIELD, MetricKind::Gauge),
];

// ─── Metric specification ────────────────────────────────────────

/// Which INFO fields to report, and how.
///
/// Fixed for the lifetime of the scheduler; built once at startup either
/// from the config override or from the built-in set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    fields: BTreeMap<String, MetricKind>,
}

impl MetricSpec {
    pub fn new(fields: BTreeMap<String, MetricKind>) -> Self {
        Self { fields }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_FIELDS
                .iter()
                .map(|&(name, kind)| (name.to_owned(), kind))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MetricKind)> {
        self.fields.iter().map(|(name, &kind)| (name.as_str(), kind))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for MetricSpec {
    fn default() -> Self {
        Self::builtin()
    }
}

// ─── Derived ratio ───────────────────────────────────────────────

/// hits / (hits + misses), rendered as a decimal string.
/// Returns `"0"` when there has been no lookup at all, and `None` when
/// either counter is not a number.
pub fn keyspace_hit_ratio(hits: &str, misses: &str) -> Option<String> {
    let hits: f64 = hits.trim().parse().ok()?;
    let misses: f64 = misses.trim().parse().ok()?;

    let total = hits + misses;
    if total <= 0.0 {
        return Some("0".to_owned());
    }
    Some((hits / total).to_string())
}

/// Adds `keyspace_hit_ratio` to `stats` when both inputs are present.
pub fn insert_hit_ratio(stats: &mut RawStats) {
    let ratio = match (stats.get(HITS_FIELD), stats.get(MISSES_FIELD)) {
        (Some(hits), Some(misses)) => keyspace_hit_ratio(hits, misses),
        _ => None,
    };
    if let Some(ratio) = ratio {
        stats.insert(HIT_RATIO_FIELD.to_owned(), ratio);
    }
}

// ─── Record building ─────────────────────────────────────────────

/// Tag string for one node: `port=<port>`, then the configured extras.
pub fn node_tags(port: u16, extra: &str) -> String {
    let extra = extra.trim_matches(',');
    if extra.is_empty() {
        format!("port={port}")
    } else {
        format!("port={port},{extra}")
    }
}

/// Everything a record needs besides the field itself.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub endpoint: &'a str,
    pub tags: &'a str,
    pub timestamp: i64,
    pub step: u64,
}

/// Turns one node's stats into records, one per configured field that the
/// node actually reported. Inserts the derived hit ratio first.
pub fn build_records(
    stats: &mut RawStats,
    spec: &MetricSpec,
    ctx: &RecordContext<'_>,
) -> Vec<MetricRecord> {
    insert_hit_ratio(stats);

    spec.iter()
        .filter_map(|(field, kind)| {
            let value = stats.get(field)?;
            Some(MetricRecord {
                endpoint: ctx.endpoint.to_owned(),
                metric: format!("{METRIC_PREFIX}{field}{}", kind.suffix()),
                value: value.clone(),
                step: ctx.step,
                kind,
                tags: ctx.tags.to_owned(),
                timestamp: ctx.timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RecordContext<'static> {
        RecordContext {
            endpoint: "agent-01",
            tags: "port=6379",
            timestamp: 1_700_000_000,
            step: 60,
        }
    }

    fn stats(pairs: &[(&str, &str)]) -> RawStats {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn hit_ratio_of_eighty_twenty() {
        assert_eq!(keyspace_hit_ratio("80", "20").as_deref(), Some("0.8"));
    }

    #[test]
    fn hit_ratio_without_lookups_is_zero() {
        assert_eq!(keyspace_hit_ratio("0", "0").as_deref(), Some("0"));
    }

    #[test]
    fn hit_ratio_rejects_non_numeric_input() {
        assert_eq!(keyspace_hit_ratio("n/a", "3"), None);
    }

    #[test]
    fn hit_ratio_is_not_derived_from_missing_counters() {
        let mut s = stats(&[("keyspace_hits", "10")]);
        insert_hit_ratio(&mut s);
        assert!(!s.contains_key(HIT_RATIO_FIELD));
    }

    #[test]
    fn gauge_and_counter_naming() {
        let mut fields = BTreeMap::new();
        fields.insert("used_memory".to_string(), MetricKind::Gauge);
        fields.insert("total_commands_processed".to_string(), MetricKind::Counter);
        let spec = MetricSpec::new(fields);

        let mut s = stats(&[
            ("used_memory", "1048576"),
            ("total_commands_processed", "42"),
            ("uptime_in_seconds", "99"),
        ]);
        let records = build_records(&mut s, &spec, &ctx());

        assert_eq!(records.len(), 2);
        let gauge = records.iter().find(|r| r.metric == "redis.used_memory").unwrap();
        assert_eq!(gauge.kind, MetricKind::Gauge);
        assert_eq!(gauge.value, "1048576");
        assert_eq!(gauge.endpoint, "agent-01");
        assert_eq!(gauge.tags, "port=6379");
        assert_eq!(gauge.step, 60);
        assert_eq!(gauge.timestamp, 1_700_000_000);

        let counter = records
            .iter()
            .find(|r| r.metric == "redis.total_commands_processed_cps")
            .unwrap();
        assert_eq!(counter.kind, MetricKind::Counter);
        assert_eq!(counter.value, "42");
    }

    #[test]
    fn absent_field_produces_no_record() {
        let mut s = stats(&[("used_memory", "1")]);
        let records = build_records(&mut s, &MetricSpec::builtin(), &ctx());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric, "redis.used_memory");
    }

    #[test]
    fn builtin_spec_reports_hit_ratio_as_gauge() {
        let mut s = stats(&[("keyspace_hits", "80"), ("keyspace_misses", "20")]);
        let records = build_records(&mut s, &MetricSpec::builtin(), &ctx());

        let names: Vec<_> = records.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(
            names,
            [
                "redis.keyspace_hit_ratio",
                "redis.keyspace_hits_cps",
                "redis.keyspace_misses_cps",
            ]
        );
        assert_eq!(records[0].value, "0.8");
        assert_eq!(records[0].kind, MetricKind::Gauge);
    }

    #[test]
    fn builtin_spec_has_thirteen_fields() {
        let spec = MetricSpec::builtin();
        assert_eq!(spec.len(), 13);
        let counters = spec.iter().filter(|(_, k)| *k == MetricKind::Counter).count();
        assert_eq!(counters, 6);
    }

    #[test]
    fn tags_join_port_and_extras() {
        assert_eq!(node_tags(6379, ""), "port=6379");
        assert_eq!(node_tags(6380, "cluster=main,dc=eu"), "port=6380,cluster=main,dc=eu");
        assert_eq!(node_tags(6380, ",role=cache"), "port=6380,role=cache");
    }
}
