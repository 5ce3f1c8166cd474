//! OS snapshot parsers: CPU load, memory summary, network counters
//!
//! Three independent text formats feed the OS side of the metric set:
//! the batch-mode load snapshot (aggregate CPU line), the `free -k`
//! memory summary (buffer/cache-adjusted row), and the per-interface
//! network counters file.

use crate::config::ProbeConfig;
use serde::{Deserialize, Serialize};

/// OS-level utilization sample for one probe run.
///
/// Percentage and memory fields stay unset when their report row is
/// absent; defaulting to zero happens only at composition. Network
/// counters are running sums and start at zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OsSample {
    /// Idle percentage from the aggregate CPU line, in [0, 100].
    pub cpu_idle_pct: Option<f64>,
    /// Installed memory in KiB as the OS reports it. Takes precedence
    /// over the hypervisor figure at composition.
    pub total_memory: Option<f64>,
    /// Used memory in KiB after reclaiming buffers/cache.
    pub used_memory: Option<f64>,
    /// Free memory in KiB after reclaiming buffers/cache.
    pub free_memory: Option<f64>,
    /// Receive bytes summed across allowlisted interfaces.
    pub net_rx: u64,
    /// Transmit bytes summed across allowlisted interfaces.
    pub net_tx: u64,
}

/// Memory rows from the `free -k` summary.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MemorySummary {
    pub total: Option<f64>,
    pub used: Option<f64>,
    pub free: Option<f64>,
}

/// Byte totals across allowlisted interfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Drop everything through the last snapshot header line.
///
/// The snapshot tool's first reporting block is a warm-up artifact and
/// must not be parsed. Each block opens with a line starting with `top`,
/// so only the text after the last such line is kept. A snapshot with a
/// single block (or none) passes through unchanged apart from its header.
pub fn strip_warmup_block(snapshot: &str) -> &str {
    let mut tail_start = 0;
    let mut offset = 0;

    for line in snapshot.split_inclusive('\n') {
        if line.starts_with("top") {
            tail_start = offset + line.len();
        }
        offset += line.len();
    }

    &snapshot[tail_start..]
}

/// Idle percentage from the aggregate CPU line of a load snapshot.
///
/// The line reads `%Cpu(s): 1.7 us, 0.6 sy, ..., 97.0 id, ...`; field
/// order is not assumed, the entry tagged `id` wins. Returns `None` when
/// no CPU line or no idle field is present.
pub fn parse_cpu_idle(snapshot: &str) -> Option<f64> {
    for line in strip_warmup_block(snapshot).lines() {
        if !(line.starts_with("%Cpu") || line.starts_with("Cpu")) {
            continue;
        }
        let Some((_, fields)) = line.split_once(':') else {
            continue;
        };

        for field in fields.split(',') {
            // Both `97.0 id` and the older `97.0%id` spelling occur.
            let mut parts = field.trim().splitn(2, ['%', ' ']);
            let value = parts.next();
            let tag = parts.next().map(str::trim);
            if tag == Some("id") {
                return value.and_then(|v| v.parse().ok());
            }
        }
    }

    None
}

/// Memory figures from the `free -k` summary.
///
/// Total installed memory comes from the `Mem:` row. Used and free come
/// from the buffer/cache-adjusted row, the operationally meaningful
/// figures once reclaimable buffers and cache are accounted for.
pub fn parse_memory_summary(summary: &str) -> MemorySummary {
    let mut memory = MemorySummary::default();

    for line in summary.lines() {
        if line.starts_with("Mem:") {
            memory.total = line
                .split_whitespace()
                .nth(1)
                .and_then(|token| token.parse().ok());
        } else if line.contains("buffers/cache") {
            // "-/+ buffers/cache:  <used>  <free>"
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() >= 2 {
                memory.used = fields[fields.len() - 2].parse().ok();
                memory.free = fields[fields.len() - 1].parse().ok();
            }
        }
    }

    memory
}

/// Sum receive/transmit byte counters across allowlisted interfaces.
///
/// Rows read `name: rx_bytes rx_packets ... tx_bytes ...`; receive bytes
/// are counter field 1 and transmit bytes field 9 of the row. Rows whose
/// interface name misses the allowlist, and malformed rows, are skipped.
pub fn parse_net_counters(counters: &str, config: &ProbeConfig) -> NetCounters {
    let mut totals = NetCounters::default();

    for line in counters.lines() {
        let Some((name, fields)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if !config.matches_network_interface(name) {
            tracing::debug!(interface = name, "interface not in allowlist, skipping");
            continue;
        }

        let fields: Vec<&str> = fields.split_whitespace().collect();
        totals.rx_bytes += fields
            .first()
            .and_then(|f| f.parse::<u64>().ok())
            .unwrap_or_default();
        totals.tx_bytes += fields
            .get(8)
            .and_then(|f| f.parse::<u64>().ok())
            .unwrap_or_default();
    }

    totals
}
