//! Sprinkler: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  JsonConfigFile   LogEventSink   SystemClock   SimulatedPins │
//! │  (ConfigPort)     (EventSink)    (Clock)       (PinDriver)   │
//! │  json_api console                                            │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        Controller (lines · pin registry · scheduler)   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Runtime (one lock) · scheduler thread · signal shutdown     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sprinkler::adapters::config_file::JsonConfigFile;
use sprinkler::adapters::json_api;
use sprinkler::adapters::log_sink::LogEventSink;
use sprinkler::adapters::time::SystemClock;
use sprinkler::app::ports::{Clock, ConfigPort, PinDriver};
use sprinkler::app::service::Controller;
use sprinkler::drivers::sim::SimulatedPins;
use sprinkler::runtime::Runtime;

type HostRuntime<D> = Runtime<D, SystemClock, LogEventSink>;

#[derive(Debug, Parser)]
#[command(
    name = "sprinkler",
    version,
    about = "Multi-line irrigation controller with a nightly run schedule."
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "/etc/sprinkler.json")]
    config: PathBuf,

    /// Log debug detail, including idempotent no-op transitions.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Disable logging.
    #[arg(short, long)]
    quiet: bool,

    /// Read JSON requests line by line from stdin and answer on stdout.
    #[arg(long)]
    console: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    if let Err(e) = real_main(&cli) {
        error!("{:#}", e);
        if cli.quiet {
            eprintln!("sprinkler: {e:#}");
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "off"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn real_main(cli: &Cli) -> Result<()> {
    info!("Sprinkler v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config = JsonConfigFile::new(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    // ── 2. Controller over simulated pins ─────────────────────
    let clock = SystemClock::new();
    let mut sink = LogEventSink::new();
    warn!("No board backend linked; driving simulated pins");
    let controller = Controller::from_config(&config, SimulatedPins::new(), clock.now(), &mut sink)
        .context("invalid configuration")?;

    let runtime = Runtime::new(
        controller,
        sink,
        clock,
        Duration::from_millis(config.poll_interval_ms),
    );

    // ── 3. Shutdown on Ctrl-C / SIGTERM ───────────────────────
    let on_signal = runtime.clone();
    ctrlc::set_handler(move || {
        warn!("Signal received, shutting down");
        if let Err(e) = on_signal.stop() {
            error!("Shutdown incomplete: {}", e);
        }
    })
    .context("installing signal handler")?;

    // ── 4. Scheduler thread ───────────────────────────────────
    let scheduler = runtime
        .spawn_scheduler()
        .context("starting scheduler thread")?;

    // ── 5. Operator console ───────────────────────────────────
    if cli.console {
        let console = runtime.clone();
        std::thread::Builder::new()
            .name("console".into())
            .spawn(move || {
                if let Err(e) = run_console(&console) {
                    error!("Console: {:#}", e);
                }
                if let Err(e) = console.stop() {
                    error!("Shutdown incomplete: {}", e);
                }
            })
            .context("starting console thread")?;
    }

    info!("System ready");
    if scheduler.join().is_err() {
        if let Err(e) = runtime.stop() {
            error!("Shutdown incomplete: {}", e);
        }
        return Err(anyhow!("scheduler thread panicked"));
    }

    let open = runtime.with_controller(|c| {
        c.lines()
            .iter()
            .filter(|l| l.is_on())
            .map(|l| l.index())
            .collect::<Vec<_>>()
    });
    if !open.is_empty() {
        return Err(anyhow!("lines left open at exit: {:?}", open));
    }
    info!("All lines off, exiting");
    Ok(())
}

/// One JSON request per stdin line, one JSON response per stdout line.
/// Returns at end of input.
fn run_console<D: PinDriver>(runtime: &HostRuntime<D>) -> Result<()> {
    info!("Console: reading requests from stdin");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = json_api::handle(runtime, line.as_bytes());
        writeln!(stdout, "{response}").context("writing stdout")?;
        stdout.flush().context("writing stdout")?;
    }
    info!("Console: end of input");
    Ok(())
}
