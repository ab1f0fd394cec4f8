//! Supervisor main entry point
//!
//! Hexagonal layout: the adapters on the outside, the store and control
//! loops inside, the port traits in between.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SysfsGpio (LED, S1-S3)   SysfsThermalZone   JsonConfigFile    │
//! │  LogEventSink             MonotonicClock     ControlServer     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  AttributeStore · HealthMonitor · ControlService       │    │
//! │  │  Sampler · Policy · LED scheduler · Buttons            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime (edge-executor, async-io-mini timers, Shutdown)       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};

use supervisor::adapters::config_file::JsonConfigFile;
use supervisor::adapters::hardware::SysfsHardware;
use supervisor::adapters::log_sink::LogEventSink;
use supervisor::adapters::time::MonotonicClock;
use supervisor::app::ports::ConfigPort;
use supervisor::app::service::ControlService;
use supervisor::health::HealthMonitor;
use supervisor::rpc::{ControlServer, client};
use supervisor::scheduler::{Runtime, Shutdown};
use supervisor::store::AttributeStore;

// ── CLI ───────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "supervisor")]
#[command(about = "Temperature-driven LED blink supervisor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the supervisor until SIGINT/SIGTERM
    Run {
        /// JSON config file (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Send one command to a running supervisor
    Ctl {
        /// increase, decrease, reset, toggle, status, get, frequency, mode
        command: String,

        /// Argument, e.g. `5` for frequency or `temperature` for get
        value: Option<String>,

        /// Control endpoint address
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        addr: String,

        /// Reply timeout in milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Run { config } => run(config),
        Commands::Ctl {
            command,
            value,
            addr,
            timeout_ms,
        } => ctl(&command, value.as_deref(), &addr, timeout_ms),
    }
}

fn run(config_path: Option<PathBuf>) -> Result<()> {
    info!("Supervisor v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Config ─────────────────────────────────────────────
    let config = JsonConfigFile::new(config_path.as_ref())
        .load()
        .context("loading configuration")?;

    // ── 2. Shutdown on SIGINT / SIGTERM ───────────────────────
    let shutdown = Arc::new(Shutdown::new());
    let handler = shutdown.clone();
    ctrlc::set_handler(move || handler.trigger()).context("installing signal handler")?;

    // ── 3. Hardware ───────────────────────────────────────────
    let hardware = SysfsHardware::open_sysfs(&config).context("opening hardware")?;

    // ── 4. Core ───────────────────────────────────────────────
    let store = Arc::new(AttributeStore::new());
    let health = Arc::new(HealthMonitor::new(config.degraded_threshold));
    let control = ControlService::new(store, health);

    // ── 5. Control endpoint (optional) ────────────────────────
    let server = match &config.control_listen_addr {
        Some(addr) => match ControlServer::bind(addr) {
            Ok(server) => Some(server),
            Err(e) => {
                warn!("Control endpoint on {} unavailable: {}", addr, e);
                None
            }
        },
        None => None,
    };

    // ── 6. Run until shutdown ─────────────────────────────────
    let mut runtime = Runtime::new(
        config,
        control,
        hardware,
        MonotonicClock::new(),
        LogEventSink::new(),
    );
    if let Some(server) = server {
        runtime = runtime.with_server(server);
    }
    let report = runtime.run(&shutdown);
    info!(
        "Supervisor exiting: {} samples, {} LED transitions, {} button presses",
        report.samples, report.led_transitions, report.button_presses
    );
    Ok(())
}

fn ctl(command: &str, value: Option<&str>, addr: &str, timeout_ms: u64) -> Result<()> {
    let request = client::request_line(command, value);
    let reply = client::send(addr, &request, Duration::from_millis(timeout_ms))
        .with_context(|| format!("sending {request:?} to {addr}"))?;
    println!("{reply}");
    if reply.starts_with("err") {
        bail!("supervisor refused {request:?}");
    }
    Ok(())
}
