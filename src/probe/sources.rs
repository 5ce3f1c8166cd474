//! Probe source capabilities
//!
//! Each external report sits behind a small trait so the pipeline can be
//! exercised against literal fixture text instead of live system tools.
//! The command-backed implementations below are the production wiring;
//! tests substitute their own.

use crate::config::{self, ProbeConfig};
use crate::error::{ProbeError, Result};
use crate::utils::command::run_command;

/// Per-guest memory reservation report.
pub trait GuestPollSource {
    /// Retrieve the raw poll report text.
    fn poll_report(&self) -> Result<String>;
}

/// Hypervisor node capacity report.
pub trait HypervisorSource {
    /// Retrieve the raw node-info report text.
    fn node_info(&self) -> Result<String>;
}

/// OS-level load, memory, and network counter reports.
pub trait OsSampler {
    /// Single-shot load snapshot covering the aggregate CPU line.
    fn cpu_snapshot(&self) -> Result<String>;

    /// Memory summary including the buffer/cache-adjusted row.
    fn memory_summary(&self) -> Result<String>;

    /// Per-interface network byte counters.
    fn net_counters(&self) -> Result<String>;
}

/// Guest poll report from the hypervisor poll helper.
pub struct PollCommand {
    program: String,
}

impl PollCommand {
    pub fn new(program: impl Into<String>) -> Self {
        PollCommand {
            program: program.into(),
        }
    }
}

impl GuestPollSource for PollCommand {
    fn poll_report(&self) -> Result<String> {
        run_command("guest poll", &self.program, &config::POLL_ARGS)
    }
}

/// Node capacity via `virsh nodeinfo`.
pub struct VirshNodeInfo {
    connect_uri: String,
}

impl VirshNodeInfo {
    pub fn new(connect_uri: impl Into<String>) -> Self {
        VirshNodeInfo {
            connect_uri: connect_uri.into(),
        }
    }
}

impl HypervisorSource for VirshNodeInfo {
    fn node_info(&self) -> Result<String> {
        run_command("virsh nodeinfo", "virsh", &["-c", &self.connect_uri, "nodeinfo"])
    }
}

/// Live OS counters from `top`, `free`, and the kernel counters file.
pub struct SystemSampler;

impl OsSampler for SystemSampler {
    fn cpu_snapshot(&self) -> Result<String> {
        // Two iterations in batch mode; the parser discards the warm-up block.
        run_command("cpu snapshot", "top", &["-bin2"])
    }

    fn memory_summary(&self) -> Result<String> {
        run_command("memory summary", "free", &["-k"])
    }

    fn net_counters(&self) -> Result<String> {
        std::fs::read_to_string(config::NET_COUNTERS_PATH).map_err(|error| {
            ProbeError::Retrieval {
                source: "net counters",
                error,
            }
        })
    }
}

/// Build the command-backed production sources for a run.
pub fn system_sources(
    config: &ProbeConfig,
) -> (
    Box<dyn GuestPollSource>,
    Box<dyn HypervisorSource>,
    Box<dyn OsSampler>,
) {
    (
        Box::new(PollCommand::new(config.poll_command.clone())),
        Box::new(VirshNodeInfo::new(config.connect_uri.clone())),
        Box::new(SystemSampler),
    )
}
