use tracing::warn;

use super::RawStats;
use crate::redis_client::NodeConnection;

/// INFO sections requested from every node, in request order.
pub const INFO_SECTIONS: [&str; 6] =
    ["Server", "Clients", "Memory", "Stats", "Replication", "CPU"];

// ─── Pure parsing ────────────────────────────────────────────────

/// Folds one section reply into `stats`.
///
/// The first line is always treated as the `# Section` header and dropped.
/// Lines without a `:` are ignored. Everything after the first `:` is the
/// value, so values that themselves contain `:` survive intact.
/// Keys already present are overwritten.
pub fn parse_section(text: &str, stats: &mut RawStats) {
    for line in text.lines().skip(1) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        stats.insert(key.to_owned(), value.to_owned());
    }
}

/// Parses a list of section replies into one flat map (last write wins).
pub fn parse_sections<'a, I>(sections: I) -> RawStats
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stats = RawStats::new();
    for text in sections {
        parse_section(text, &mut stats);
    }
    stats
}

// ─── Fetch + parse ───────────────────────────────────────────────

/// Issues one `INFO <section>` per entry in `sections` and merges the
/// replies. A failed section is logged and skipped; whatever was collected
/// from the other sections is still returned.
pub async fn collect_stats<C>(conn: &mut C, sections: &[&str]) -> RawStats
where
    C: NodeConnection + ?Sized,
{
    let mut replies = Vec::with_capacity(sections.len());
    for &section in sections {
        match conn.info(section).await {
            Ok(text) => replies.push(text),
            Err(e) => {
                warn!(section, error = %e, "INFO section failed, skipping");
            }
        }
    }
    parse_sections(replies.iter().map(String::as_str))
}
