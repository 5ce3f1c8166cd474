//! Hypervisor node capacity parser
//!
//! Reads the labeled `virsh nodeinfo` report. Fields not present in the
//! report stay unset; defaulting to zero happens only at composition.

use serde::{Deserialize, Serialize};

/// Physical node capacity as reported by the hypervisor management layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostCapacity {
    /// CPU capacity in hundredths of a core, consistent with the
    /// per-core percentage granularity used throughout the metric set.
    pub total_cpu: Option<u64>,
    /// CPU frequency token as reported.
    pub cpu_speed: Option<String>,
    /// Installed memory in KiB.
    pub total_memory: Option<f64>,
}

/// Parse a hypervisor node-info report.
pub fn parse(report: &str) -> HostCapacity {
    let mut capacity = HostCapacity::default();

    for line in report.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        if label.starts_with("CPU(s)") {
            capacity.total_cpu = value.parse::<u64>().ok().map(|count| count * 100);
        } else if label.starts_with("CPU frequency") {
            capacity.cpu_speed = value.split_whitespace().next().map(str::to_string);
        } else if label.starts_with("Memory size") {
            capacity.total_memory = value
                .split_whitespace()
                .next()
                .and_then(|token| token.parse().ok());
        }
    }

    capacity
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODEINFO: &str = concat!(
        "CPU model:           x86_64\n",
        "CPU(s):              8\n",
        "CPU frequency:       2393 MHz\n",
        "CPU socket(s):       1\n",
        "Core(s) per socket:  4\n",
        "Thread(s) per core:  2\n",
        "NUMA cell(s):        1\n",
        "Memory size:         16777216 KiB\n",
    );

    #[test]
    fn test_full_report() {
        let capacity = parse(NODEINFO);
        assert_eq!(capacity.total_cpu, Some(800));
        assert_eq!(capacity.cpu_speed.as_deref(), Some("2393"));
        assert_eq!(capacity.total_memory, Some(16777216.0));
    }

    #[test]
    fn test_frequency_keeps_first_token_only() {
        let capacity = parse("CPU frequency:       1996 MHz\n");
        assert_eq!(capacity.cpu_speed.as_deref(), Some("1996"));
    }

    #[test]
    fn test_missing_fields_stay_unset() {
        let capacity = parse("CPU model:           x86_64\n");
        assert_eq!(capacity.total_cpu, None);
        assert_eq!(capacity.cpu_speed, None);
        assert_eq!(capacity.total_memory, None);
    }

    #[test]
    fn test_unparsable_cpu_count_stays_unset() {
        let capacity = parse("CPU(s):              many\n");
        assert_eq!(capacity.total_cpu, None);
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(parse(""), HostCapacity::default());
    }
}
