//! Probe context and dependency wiring
//!
//! One context drives one probe run: it owns the configuration and the
//! three source capabilities, samples them strictly in sequence, and
//! returns the composed metric report. All accumulation lives in the
//! run's local state; nothing persists across invocations.

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::probe::composer::{self, MetricReport};
use crate::probe::sources::{self, GuestPollSource, HypervisorSource, OsSampler};
use crate::utils::{guest_poll_parser, node_info_parser, os_stats_parser};
use crate::utils::os_stats_parser::OsSample;

/// Container for one probe invocation.
pub struct ProbeContext {
    config: ProbeConfig,
    guest_poll: Box<dyn GuestPollSource>,
    hypervisor: Box<dyn HypervisorSource>,
    os: Box<dyn OsSampler>,
}

impl ProbeContext {
    /// Command-backed context for a live run.
    pub fn new(config: ProbeConfig) -> Self {
        let (guest_poll, hypervisor, os) = sources::system_sources(&config);
        ProbeContext {
            config,
            guest_poll,
            hypervisor,
            os,
        }
    }

    /// Context with substituted sources. Tests use this to feed fixture
    /// report text through the full pipeline.
    pub fn with_sources(
        config: ProbeConfig,
        guest_poll: Box<dyn GuestPollSource>,
        hypervisor: Box<dyn HypervisorSource>,
        os: Box<dyn OsSampler>,
    ) -> Self {
        ProbeContext {
            config,
            guest_poll,
            hypervisor,
            os,
        }
    }

    /// Drive one probe cycle: sample the three sources in sequence, then
    /// compose the metric set. The first source failure aborts the run;
    /// no partial report is produced.
    pub fn run(&self) -> Result<MetricReport> {
        let poll_report = self.guest_poll.poll_report()?;
        let guests = guest_poll_parser::parse(&poll_report);

        let node_info = self.hypervisor.node_info()?;
        let capacity = node_info_parser::parse(&node_info);

        let os = self.sample_os()?;

        tracing::debug!(
            guest_count = guests.records.len(),
            packed_memory = guests.packed_memory,
            total_cpu = ?capacity.total_cpu,
            "probe cycle sampled"
        );

        Ok(composer::compose(
            &guests,
            &capacity,
            &os,
            poll_report,
            &self.config,
        ))
    }

    fn sample_os(&self) -> Result<OsSample> {
        let cpu_idle_pct = os_stats_parser::parse_cpu_idle(&self.os.cpu_snapshot()?);
        let memory = os_stats_parser::parse_memory_summary(&self.os.memory_summary()?);
        let net = os_stats_parser::parse_net_counters(&self.os.net_counters()?, &self.config);

        Ok(OsSample {
            cpu_idle_pct,
            total_memory: memory.total,
            used_memory: memory.used,
            free_memory: memory.free,
            net_rx: net.rx_bytes,
            net_tx: net.tx_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_NET_INTERFACES, DEFAULT_OVERCOMMIT_FACTOR};
    use crate::error::ProbeError;

    const POLL_REPORT: &str = concat!(
        "VM 12 successfully polled\n",
        "  POLL=\"STATE=a USEDMEMORY=2048 MAXMEMORY=4096\"\n",
        "VM 13 successfully polled\n",
        "  POLL=\"STATE=a USEDMEMORY=1024\"\n",
    );

    const NODE_INFO: &str = concat!(
        "CPU model:           x86_64\n",
        "CPU(s):              8\n",
        "CPU frequency:       2393 MHz\n",
        "Memory size:         16777216 KiB\n",
    );

    const CPU_SNAPSHOT: &str = concat!(
        "top - 14:31:07 up 10 days\n",
        "%Cpu(s): 42.0 us,  8.0 sy,  0.0 ni, 50.0 id\n",
        "\n",
        "top - 14:31:08 up 10 days\n",
        "%Cpu(s):  1.5 us,  1.5 sy,  0.0 ni, 97.0 id\n",
    );

    const MEMORY_SUMMARY: &str = concat!(
        "             total       used       free\n",
        "Mem:       8000000    6000000    2000000\n",
        "-/+ buffers/cache:    5000000    3000000\n",
    );

    const NET_COUNTERS: &str = concat!(
        "    lo: 999 9 0 0 0 0 0 0 999 9 0 0 0 0 0 0\n",
        "  eth0: 5000 50 0 0 0 0 0 0 7000 70 0 0 0 0 0 0\n",
    );

    struct FixturePoll(&'static str);
    struct FixtureNodeInfo(&'static str);
    struct FixtureOs {
        cpu: Result<&'static str>,
        memory: &'static str,
        net: &'static str,
    }

    impl GuestPollSource for FixturePoll {
        fn poll_report(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    impl HypervisorSource for FixtureNodeInfo {
        fn node_info(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    impl OsSampler for FixtureOs {
        fn cpu_snapshot(&self) -> Result<String> {
            match &self.cpu {
                Ok(text) => Ok(text.to_string()),
                Err(_) => Err(upstream_failure()),
            }
        }

        fn memory_summary(&self) -> Result<String> {
            Ok(self.memory.to_string())
        }

        fn net_counters(&self) -> Result<String> {
            Ok(self.net.to_string())
        }
    }

    struct FailingPoll;
    struct FailingNodeInfo;

    impl GuestPollSource for FailingPoll {
        fn poll_report(&self) -> Result<String> {
            Err(upstream_failure())
        }
    }

    impl HypervisorSource for FailingNodeInfo {
        fn node_info(&self) -> Result<String> {
            Err(upstream_failure())
        }
    }

    fn upstream_failure() -> ProbeError {
        ProbeError::UpstreamCommandFailure {
            command: "fixture",
            status: 1,
        }
    }

    fn config() -> ProbeConfig {
        ProbeConfig::new(
            DEFAULT_OVERCOMMIT_FACTOR,
            DEFAULT_NET_INTERFACES,
            "poll",
            "qemu:///system",
        )
        .unwrap()
    }

    fn fixture_os() -> Box<FixtureOs> {
        Box::new(FixtureOs {
            cpu: Ok(CPU_SNAPSHOT),
            memory: MEMORY_SUMMARY,
            net: NET_COUNTERS,
        })
    }

    #[test]
    fn test_full_pipeline() {
        let context = ProbeContext::with_sources(
            config(),
            Box::new(FixturePoll(POLL_REPORT)),
            Box::new(FixtureNodeInfo(NODE_INFO)),
            fixture_os(),
        );

        let report = context.run().unwrap();
        let rendered = report.render();

        let expected_metrics = concat!(
            "HYPERVISOR=kvm\n",
            "TOTALCPU=800\n",
            "CPUSPEED=2393\n",
            "TOTALMEMORY=8002048\n",
            "PACKEDMEMORY=2048\n",
            "USEDMEMORY=5000000\n",
            "FREEMEMORY=3000000\n",
            "FREECPU=776\n",
            "USEDCPU=24\n",
            "NETRX=5000\n",
            "NETTX=7000\n",
        );
        assert!(rendered.starts_with(expected_metrics));
        assert!(rendered.ends_with(POLL_REPORT));
    }

    #[test]
    fn test_guest_poll_failure_aborts_run() {
        let context = ProbeContext::with_sources(
            config(),
            Box::new(FailingPoll),
            Box::new(FixtureNodeInfo(NODE_INFO)),
            fixture_os(),
        );
        assert!(context.run().is_err());
    }

    #[test]
    fn test_hypervisor_failure_aborts_run() {
        let context = ProbeContext::with_sources(
            config(),
            Box::new(FixturePoll(POLL_REPORT)),
            Box::new(FailingNodeInfo),
            fixture_os(),
        );
        assert!(context.run().is_err());
    }

    #[test]
    fn test_os_failure_aborts_run() {
        let context = ProbeContext::with_sources(
            config(),
            Box::new(FixturePoll(POLL_REPORT)),
            Box::new(FixtureNodeInfo(NODE_INFO)),
            Box::new(FixtureOs {
                cpu: Err(upstream_failure()),
                memory: MEMORY_SUMMARY,
                net: NET_COUNTERS,
            }),
        );
        assert!(context.run().is_err());
    }
}
