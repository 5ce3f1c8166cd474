//! Metric composition and rendering
//!
//! Merges the three independently sampled sources into the canonical
//! metric set and renders the fixed-order `NAME=value` block. The
//! advertised total memory may exceed physically installed memory; that
//! is the overcommit contract.

use crate::config::{ProbeConfig, HYPERVISOR_NAME};
use crate::utils::guest_poll_parser::GuestPollSummary;
use crate::utils::node_info_parser::HostCapacity;
use crate::utils::os_stats_parser::OsSample;

/// The canonical metric set emitted once per probe run.
#[derive(Clone, Debug, Default)]
pub struct MetricReport {
    pub total_cpu: Option<u64>,
    pub cpu_speed: Option<String>,
    pub total_memory: f64,
    pub packed_memory: f64,
    pub used_memory: Option<f64>,
    pub free_memory: Option<f64>,
    pub free_cpu: Option<f64>,
    pub used_cpu: Option<f64>,
    pub net_rx: u64,
    pub net_tx: u64,
    /// Raw guest poll report, appended verbatim after the metric block.
    pub poll_report: String,
}

/// Merge the three samples into the final metric set.
pub fn compose(
    guests: &GuestPollSummary,
    capacity: &HostCapacity,
    os: &OsSample,
    poll_report: String,
    config: &ProbeConfig,
) -> MetricReport {
    let packed_memory = guests.packed_memory;

    // The OS-reported total wins over the hypervisor figure when present.
    let installed_memory = os
        .total_memory
        .or(capacity.total_memory)
        .unwrap_or_default();
    let total_memory = installed_memory + config.overcommit_factor * packed_memory;

    // CPU units come from the hypervisor, the idle fraction from the OS.
    let total_cpu_units = capacity.total_cpu.unwrap_or_default() as f64;
    let free_cpu = os.cpu_idle_pct.map(|idle| idle * total_cpu_units / 100.0);
    let used_cpu = free_cpu.map(|free| total_cpu_units - free);

    MetricReport {
        total_cpu: capacity.total_cpu,
        cpu_speed: capacity.cpu_speed.clone(),
        total_memory,
        packed_memory,
        used_memory: os.used_memory,
        free_memory: os.free_memory,
        free_cpu,
        used_cpu,
        net_rx: os.net_rx,
        net_tx: os.net_tx,
        poll_report,
    }
}

impl MetricReport {
    /// Render the fixed-order metric block followed by the verbatim poll
    /// report. An absent value renders as `0`; no field is ever omitted
    /// or left empty.
    pub fn render(&self) -> String {
        let mut out = String::new();

        push_metric(&mut out, "HYPERVISOR", Some(HYPERVISOR_NAME.to_string()));
        push_metric(&mut out, "TOTALCPU", self.total_cpu.map(|v| v.to_string()));
        push_metric(&mut out, "CPUSPEED", self.cpu_speed.clone());
        push_metric(&mut out, "TOTALMEMORY", format_number(self.total_memory));
        push_metric(&mut out, "PACKEDMEMORY", format_number(self.packed_memory));
        push_metric(&mut out, "USEDMEMORY", self.used_memory.and_then(format_number));
        push_metric(&mut out, "FREEMEMORY", self.free_memory.and_then(format_number));
        push_metric(&mut out, "FREECPU", self.free_cpu.and_then(format_number));
        push_metric(&mut out, "USEDCPU", self.used_cpu.and_then(format_number));
        push_metric(&mut out, "NETRX", Some(self.net_rx.to_string()));
        push_metric(&mut out, "NETTX", Some(self.net_tx.to_string()));

        // The poll report rides along for downstream logging, outside the
        // metric contract.
        out.push_str(&self.poll_report);
        if !self.poll_report.is_empty() && !self.poll_report.ends_with('\n') {
            out.push('\n');
        }

        out
    }
}

fn push_metric(out: &mut String, name: &str, value: Option<String>) {
    let value = match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "0".to_string(),
    };
    out.push_str(name);
    out.push('=');
    out.push_str(&value);
    out.push('\n');
}

fn format_number(value: f64) -> Option<String> {
    value.is_finite().then(|| value.to_string())
}
