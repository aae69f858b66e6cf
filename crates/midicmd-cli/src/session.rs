//! The interactive control loop.
//!
//! Lines arrive on a channel fed by a stdin reader thread. The loop waits at
//! most [`SessionOptions::poll`] for each line so that an exit requested from
//! elsewhere (signal, scheduler shutdown) is noticed without input.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use midicmd_core::{Action, Dispatcher, ExitReason};
use midicmd_io::MidiBackend;

use crate::ports::connect_all;

/// Control loop settings.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Do not print the `> ` prompt.
    pub quiet: bool,
    /// Longest wait for a line before the run state is checked again.
    pub poll: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            poll: Duration::from_secs(1),
        }
    }
}

/// Spawns a thread that forwards lines from `input` until end of input.
///
/// Bytes that are not UTF-8 are replaced, so such a line still reaches the
/// parser (and is rejected there). The channel disconnects at end of input or
/// on a read error.
pub fn spawn_reader<R>(mut input: R) -> io::Result<Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("midicmd-stdin".into())
        .spawn(move || {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match input.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!("cannot read input: {err}");
                        break;
                    }
                }
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Runs the control loop until an exit is requested or input ends.
///
/// `ports` are the remote ports given at startup; `reconnect` connects to
/// them again. Returns why the loop ended.
pub fn run<B, W, const N: usize>(
    dispatcher: &mut Dispatcher<'_, N>,
    backend: &mut B,
    ports: &[String],
    lines: &Receiver<String>,
    out: &mut W,
    options: &SessionOptions,
) -> io::Result<ExitReason>
where
    B: MidiBackend + ?Sized,
    W: Write,
{
    let state = dispatcher.state();
    prompt(out, options)?;

    while !state.should_exit() {
        let line = match lines.recv_timeout(options.poll) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                state.request_exit(ExitReason::EndOfInput);
                break;
            }
        };

        match dispatcher.handle_line(&line) {
            Action::Continue => {}
            Action::Reply(text) => writeln!(out, "{text}")?,
            Action::Reconnect => {
                let connected = connect_all(backend, ports);
                tracing::debug!(connected, requested = ports.len(), "reconnected");
            }
            Action::Exit => break,
        }
        if !state.should_exit() {
            prompt(out, options)?;
        }
    }

    if !options.quiet {
        writeln!(out)?;
    }
    out.flush()?;
    Ok(state.exit_reason().unwrap_or(ExitReason::EndOfInput))
}

/// Waits up to `cycles` cycle periods for the scheduler to take every queued
/// event. Returns `true` if the queue emptied in time.
pub fn wait_for_drain<const N: usize>(
    dispatcher: &Dispatcher<'_, N>,
    period: Duration,
    cycles: u32,
) -> bool {
    for _ in 0..cycles {
        if dispatcher.producer().is_empty() {
            return true;
        }
        thread::sleep(period);
    }
    dispatcher.producer().is_empty()
}

fn prompt<W: Write>(out: &mut W, options: &SessionOptions) -> io::Result<()> {
    if !options.quiet {
        write!(out, "> ")?;
        out.flush()?;
    }
    Ok(())
}
