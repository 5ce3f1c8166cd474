//! Guest poll report parser
//!
//! Each line of the poll report may carry a quoted attribute string tagged
//! with a `POLL=` marker, holding space-separated `KEY=VALUE` tokens. The
//! parser extracts per-guest memory reservation figures and accumulates
//! the packed memory pool: memory reserved by guests but not currently
//! used, which the host can offer as overcommit capacity.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static POLL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s+POLL="([^"]*)""#).expect("poll line pattern compiles"));

/// Memory reservation figures for one guest, in KiB.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GuestMemoryRecord {
    /// Declared reservation ceiling. A guest with no declared ceiling
    /// carries its used figure here, so it never contributes a negative
    /// reclaimable amount.
    pub max_memory: f64,
    /// Memory currently in use.
    pub used_memory: f64,
}

impl GuestMemoryRecord {
    /// Memory reserved but not in use.
    pub fn reclaimable(&self) -> f64 {
        self.max_memory - self.used_memory
    }
}

/// Aggregated view of one guest poll report.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GuestPollSummary {
    /// One record per guest found in the report.
    pub records: Vec<GuestMemoryRecord>,
    /// Sum of reclaimable memory across all guests, in KiB.
    pub packed_memory: f64,
}

/// Parse a guest poll report.
///
/// Lines without a `POLL="..."` attribute string are ignored. Within the
/// attribute string, a missing or unparsable memory value counts as 0 and
/// a token without a `=` separator is skipped; neither aborts the parse.
pub fn parse(report: &str) -> GuestPollSummary {
    let mut summary = GuestPollSummary::default();

    for line in report.lines() {
        let Some(captures) = POLL_LINE.captures(line) else {
            continue;
        };

        let mut record = GuestMemoryRecord::default();
        for token in captures[1].split_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                tracing::debug!(token, "skipping malformed poll token");
                continue;
            };
            match key {
                "MAXMEMORY" => record.max_memory = value.parse().unwrap_or(0.0),
                "USEDMEMORY" => record.used_memory = value.parse().unwrap_or(0.0),
                _ => {}
            }
        }

        // No declared ceiling means nothing reclaimable for this guest.
        if record.max_memory == 0.0 {
            record.max_memory = record.used_memory;
        }

        summary.packed_memory += record.reclaimable();
        summary.records.push(record);
    }

    tracing::debug!(
        guest_count = summary.records.len(),
        packed_memory = summary.packed_memory,
        "guest poll report parsed"
    );

    summary
}
