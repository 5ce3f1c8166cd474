//! Probe configuration

use anyhow::Result;
use regex::Regex;

// Hypervisor identifier reported in the metric set
pub const HYPERVISOR_NAME: &str = "kvm";

// Arguments passed to the guest poll helper
pub const POLL_ARGS: [&str; 2] = ["--kvm", "-t"];

// Counters file for per-interface network statistics
pub const NET_COUNTERS_PATH: &str = "/proc/net/dev";

/// Default multiplier applied to packed memory when advertising capacity.
pub const DEFAULT_OVERCOMMIT_FACTOR: f64 = 1.0;

/// Default interface allowlist: ethernet, bonded, and PCI-enumerated names.
/// Loopback and bridge interfaces never match.
pub const DEFAULT_NET_INTERFACES: &str = "^(eth|bond|em|p[0-9]+p[0-9]+)";

/// Configuration for one probe run
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Fraction of packed guest memory offered as overcommit capacity
    pub overcommit_factor: f64,

    /// Guest poll helper executable, invoked with [`POLL_ARGS`]
    pub poll_command: String,

    /// Hypervisor connection URI for the node capacity query
    pub connect_uri: String,

    /// Pattern an interface name must match to count toward net totals
    interface_allowlist: Regex,
}

impl ProbeConfig {
    /// Validate and build the probe configuration.
    ///
    /// The overcommit factor must be finite and non-negative; the
    /// interface pattern must compile.
    pub fn new(
        overcommit_factor: f64,
        interface_pattern: &str,
        poll_command: impl Into<String>,
        connect_uri: impl Into<String>,
    ) -> Result<Self> {
        if !overcommit_factor.is_finite() || overcommit_factor < 0.0 {
            return Err(anyhow::anyhow!(
                "overcommit factor must be finite and >= 0, got {}",
                overcommit_factor
            ));
        }

        let interface_allowlist = Regex::new(interface_pattern).map_err(|e| {
            anyhow::anyhow!("invalid interface pattern {:?}: {}", interface_pattern, e)
        })?;

        Ok(ProbeConfig {
            overcommit_factor,
            poll_command: poll_command.into(),
            connect_uri: connect_uri.into(),
            interface_allowlist,
        })
    }

    /// Check if an interface name matches the configured allowlist
    pub fn matches_network_interface(&self, interface: &str) -> bool {
        self.interface_allowlist.is_match(interface)
    }
}
