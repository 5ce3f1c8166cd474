mod config;
mod context;
mod error;
mod probe;
mod utils;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ProbeConfig;
use crate::context::ProbeContext;

const APP_NAME: &str = "node-pulse";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_POLL_COMMAND: &str = "poll";
const DEFAULT_CONNECT_URI: &str = "qemu:///system";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser, Debug)]
#[command(
    name = APP_NAME,
    version = VERSION,
    about = "Per-node capacity probe for overcommit-aware VM placement",
    long_about = "NodePulse: samples hypervisor capacity, guest memory reservations, and OS-level counters, and prints the canonical capacity/utilization metric set for the resource manager"
)]
struct Args {
    /// Fraction of packed guest memory advertised as extra capacity
    #[arg(
        long,
        env = "NODE_PULSE_OVERCOMMIT",
        default_value_t = config::DEFAULT_OVERCOMMIT_FACTOR,
        help = "Fraction of packed guest memory advertised as extra capacity"
    )]
    overcommit_factor: f64,

    /// Interface-name allowlist for network byte counters
    #[arg(
        long,
        env = "NODE_PULSE_NET_INTERFACES",
        default_value = config::DEFAULT_NET_INTERFACES,
        help = "Pattern an interface name must match to count toward NETRX/NETTX"
    )]
    net_interfaces: String,

    /// Guest poll helper executable
    #[arg(
        long,
        env = "NODE_PULSE_POLL_COMMAND",
        default_value = DEFAULT_POLL_COMMAND,
        help = "Guest poll helper executable producing the per-guest report"
    )]
    poll_command: String,

    /// Hypervisor connection URI
    #[arg(
        long,
        env = "NODE_PULSE_CONNECT_URI",
        default_value = DEFAULT_CONNECT_URI,
        help = "Hypervisor connection URI for the node capacity query"
    )]
    connect_uri: String,

    /// Log level
    #[arg(
        long,
        env = "RUST_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level (trace/debug/info/warn/error)"
    )]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    // Logging goes to stderr; stdout carries only the metric block.
    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let config = match ProbeConfig::new(
        args.overcommit_factor,
        &args.net_interfaces,
        args.poll_command,
        args.connect_uri,
    ) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    info!(
        app = APP_NAME,
        version = VERSION,
        overcommit_factor = config.overcommit_factor,
        "starting probe run"
    );

    // Any upstream source failure surfaces only through the exit code;
    // the scheduler treats it as "no data this cycle".
    let context = ProbeContext::new(config);
    match context.run() {
        Ok(report) => print!("{}", report.render()),
        Err(e) => {
            tracing::error!(error = %e, "probe run aborted, no metrics emitted");
            std::process::exit(1);
        }
    }
}

/// Initialize the logging system
fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = match log_level {
        "trace" => EnvFilter::new("trace"),
        "debug" => EnvFilter::new("debug"),
        "info" => EnvFilter::new("info"),
        "warn" => EnvFilter::new("warn"),
        "error" => EnvFilter::new("error"),
        _ => EnvFilter::new("warn"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    Ok(())
}
