//! midicmd - send MIDI messages typed on stdin.

mod memlock;
mod ports;
mod session;

use std::io;

use anyhow::Context;
use clap::Parser;
use midicmd_core::{Dispatcher, EventQueue, ExitReason, RunState, process_cycle};
use midicmd_io::{ClientConfig, MidiBackend, MidirBackend};
use tracing_subscriber::EnvFilter;

use crate::session::SessionOptions;

static RUN_STATE: RunState = RunState::new();

/// Cycles to wait for queued events to go out before closing the client.
const DRAIN_CYCLES: u32 = 16;

#[derive(Parser)]
#[command(name = "midicmd")]
#[command(author, version, about = "Send MIDI messages typed on stdin", long_about = None)]
struct Cli {
    /// MIDI ports to connect to at startup and on `reconnect`
    ports: Vec<String>,

    /// Client name announced to the MIDI system
    #[arg(short, long, default_value = "midicmd")]
    name: String,

    /// Cycle clock rate in Hz
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Frames per cycle
    #[arg(long, default_value = "256")]
    buffer_size: u32,

    /// Messages one cycle can carry
    #[arg(long, default_value = "128")]
    max_events: usize,

    /// Do not print the prompt
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let config = ClientConfig {
        client_name: cli.name.clone(),
        sample_rate: cli.sample_rate,
        buffer_size: cli.buffer_size,
        max_events: cli.max_events,
        ..ClientConfig::default()
    };

    let mut backend = MidirBackend::open(config).context("cannot start MIDI client")?;
    if backend.client_name() != cli.name {
        tracing::warn!(requested = %cli.name, actual = %backend.client_name(), "client renamed");
    }
    tracing::info!(client = %backend.client_name(), "MIDI client ready");
    memlock::lock_all();

    let queue: &'static mut EventQueue = Box::leak(Box::new(EventQueue::new()));
    let (producer, mut consumer) = queue.split();

    backend
        .activate(
            Box::new(move |buffer| process_cycle(&mut consumer, buffer)),
            Box::new(|| {
                RUN_STATE.request_exit(ExitReason::SchedulerShutdown);
            }),
        )
        .context("cannot activate client")?;

    ports::connect_all(&mut backend, &cli.ports);

    ctrlc::set_handler(|| {
        RUN_STATE.request_exit(ExitReason::Signal);
    })
    .context("cannot install signal handler")?;

    let lines = session::spawn_reader(io::BufReader::new(io::stdin()))?;
    let mut dispatcher = Dispatcher::new(producer, &RUN_STATE);
    let options = SessionOptions {
        quiet: cli.quiet,
        ..SessionOptions::default()
    };

    RUN_STATE.start();
    let reason = session::run(
        &mut dispatcher,
        &mut backend,
        &cli.ports,
        &lines,
        &mut io::stdout(),
        &options,
    )?;

    if matches!(reason, ExitReason::Command | ExitReason::EndOfInput)
        && !session::wait_for_drain(&dispatcher, backend.config().cycle_period(), DRAIN_CYCLES)
    {
        tracing::warn!(pending = dispatcher.producer().len(), "closing with events still queued");
    }
    backend.deactivate();
    let stats = backend.stats();
    match reason {
        ExitReason::Signal | ExitReason::SchedulerShutdown => {
            tracing::warn!(%reason, "shutting down");
        }
        ExitReason::Command | ExitReason::EndOfInput => tracing::info!(%reason, "shutting down"),
    }
    tracing::info!(
        queued = dispatcher.queued(),
        queue_dropped = dispatcher.dropped(),
        delivered = stats.delivered,
        cycle_dropped = stats.dropped,
        skipped_cycles = stats.skipped_cycles,
        late_cycles = stats.late_cycles,
        "session summary"
    );
    drop(backend);
    eprintln!("bye.");
    Ok(())
}
