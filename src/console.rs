//! `monitor` subcommand: receive worker plus a line-oriented console.
//!
//! The console stands in for the button panel and plot of a GUI front end.
//! It triggers commands on the caller's thread and renders snapshots of the
//! shared window on request.

use anyhow::{Context, Result, anyhow};
use std::fmt::Write as _;
use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;

use crate::buffer::TelemetrySample;
use crate::cli::MonitorOpts;
use crate::rx::{Backoff, ReceiveLoop};
use crate::state::{Identification, SharedState};
use crate::transport::{POLL_INTERVAL, Transport, UdpTransport, resolve_remote};
use crate::tx::CommandSender;

/// Latest samples listed by `show`.
const SHOW_LATEST: usize = 5;

const HELP: &str = "commands: id | start | stop | show | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Identify,
    Start,
    Stop,
    Show,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "id" | "identify" => Some(Self::Identify),
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "show" | "" => Some(Self::Show),
            "help" | "?" => Some(Self::Help),
            "quit" | "exit" | "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Fixed facts about the session shown above the data.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub remote: SocketAddr,
    pub duration_seconds: u32,
    pub rate_milliseconds: u32,
}

pub fn run(opts: MonitorOpts) -> Result<()> {
    let remote = resolve_remote(&opts.remote.remote_address, opts.remote.remote_port)?;
    let transport = UdpTransport::open(&opts.bind, remote)?;
    let state = Arc::new(SharedState::new(opts.capacity as usize));

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .context("installing Ctrl-C handler")?;

    let worker = {
        let transport = transport.try_clone()?;
        let state = Arc::clone(&state);
        let running = Arc::clone(&running);
        let backoff = Backoff::new(opts.backoff_unit());
        let stats_interval = opts.stats_interval();
        thread::Builder::new()
            .name("rx".to_string())
            .spawn(move || {
                ReceiveLoop::new(transport, state)
                    .with_backoff(backoff)
                    .with_stats_interval(stats_interval)
                    .run(&running);
            })
            .context("spawning receive worker")?
    };

    let info = SessionInfo {
        remote,
        duration_seconds: opts.duration_seconds,
        rate_milliseconds: opts.rate_milliseconds,
    };
    let sender = CommandSender::new(transport);
    println!("{}", HELP);
    drive(&sender, &state, &info, &running, spawn_stdin_reader()?);

    running.store(false, Ordering::Relaxed);
    worker
        .join()
        .map_err(|_| anyhow!("receive worker panicked"))?;
    Ok(())
}

/// Execute console input until `quit` or until `running` is cleared.
fn drive<T: Transport>(
    sender: &CommandSender<T>,
    state: &SharedState,
    info: &SessionInfo,
    running: &AtomicBool,
    lines: Receiver<String>,
) {
    let mut input = Some(lines);
    while running.load(Ordering::Relaxed) {
        let Some(rx) = &input else {
            thread::sleep(POLL_INTERVAL);
            continue;
        };
        let line = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("stdin closed; still receiving, Ctrl-C to stop");
                input = None;
                continue;
            }
        };
        match ConsoleCommand::parse(&line) {
            Some(ConsoleCommand::Identify) => sender.send_identify(),
            Some(ConsoleCommand::Start) => {
                sender.send_start(info.duration_seconds, info.rate_milliseconds)
            }
            Some(ConsoleCommand::Stop) => sender.send_stop(),
            Some(ConsoleCommand::Show) => print!(
                "{}",
                render(info, state.identity().as_ref(), &state.samples(), state.capacity())
            ),
            Some(ConsoleCommand::Help) => println!("{}", HELP),
            Some(ConsoleCommand::Quit) => break,
            None => println!("unknown command {:?}; {}", line.trim(), HELP),
        }
    }
}

fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("spawning stdin reader")?;
    Ok(rx)
}

/// Text block describing the session and the buffered window.
pub fn render(
    info: &SessionInfo,
    identity: Option<&Identification>,
    samples: &[TelemetrySample],
    capacity: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recording values from sensor.");
    match identity {
        Some(id) => {
            let _ = writeln!(out, "Model: {} - Serial: {}", id.model, id.serial);
        }
        None => {
            let _ = writeln!(out, "Model and serial number N/A. Send ID; command");
        }
    }
    let _ = writeln!(out, "Address and port of the sensor: {}", info.remote);
    let _ = writeln!(out, "Test duration: {} seconds", info.duration_seconds);
    let _ = writeln!(out, "Test data rate: {} milliseconds", info.rate_milliseconds);
    let _ = writeln!(out, "Window: {}/{} samples", samples.len(), capacity);

    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return out;
    };
    let mv = min_max(samples.iter().map(|s| s.millivolts));
    let ma = min_max(samples.iter().map(|s| s.milliamps));
    let _ = writeln!(
        out,
        "  time {}..{} ms  mV {}..{}  mA {}..{}",
        first.timestamp_ms, last.timestamp_ms, mv.0, mv.1, ma.0, ma.1
    );
    for s in &samples[samples.len().saturating_sub(SHOW_LATEST)..] {
        let _ = writeln!(
            out,
            "  t={:>8} ms  {:>8} mV  {:>8} mA",
            s.timestamp_ms, s.millivolts, s.milliamps
        );
    }
    out
}

// Callers only pass non-empty iterators.
fn min_max(values: impl Iterator<Item = i64>) -> (i64, i64) {
    values.fold((i64::MAX, i64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::ScriptedTransport;

    fn info() -> SessionInfo {
        SessionInfo {
            remote: "192.168.0.105:8080".parse().unwrap(),
            duration_seconds: 100,
            rate_milliseconds: 250,
        }
    }

    fn sample(t: u64, mv: i64, ma: i64) -> TelemetrySample {
        TelemetrySample {
            timestamp_ms: t,
            millivolts: mv,
            milliamps: ma,
        }
    }

    #[test]
    fn parse_console_commands() {
        assert_eq!(ConsoleCommand::parse("ID\n"), Some(ConsoleCommand::Identify));
        assert_eq!(ConsoleCommand::parse(" start "), Some(ConsoleCommand::Start));
        assert_eq!(ConsoleCommand::parse(""), Some(ConsoleCommand::Show));
        assert_eq!(ConsoleCommand::parse("q"), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("launch"), None);
    }

    #[test]
    fn render_before_identification() {
        let text = render(&info(), None, &[], 100);
        assert!(text.contains("Model and serial number N/A. Send ID; command"));
        assert!(text.contains("Address and port of the sensor: 192.168.0.105:8080"));
        assert!(text.contains("Test duration: 100 seconds"));
        assert!(text.contains("Test data rate: 250 milliseconds"));
        assert!(text.ends_with("Window: 0/100 samples\n"));
    }

    #[test]
    fn render_window_summary() {
        let id = Identification {
            model: "15".into(),
            serial: "4643".into(),
        };
        let samples: Vec<_> = (1..=7).map(|t| sample(t, t as i64 * 10, -(t as i64))).collect();
        let text = render(&info(), Some(&id), &samples, 100);
        assert!(text.contains("Model: 15 - Serial: 4643"));
        assert!(text.contains("Window: 7/100 samples"));
        assert!(text.contains("time 1..7 ms  mV 10..70  mA -7..-1"));
        // Only the latest five are listed.
        assert!(!text.contains("t=       2 ms"));
        assert!(text.contains("t=       3 ms"));
        assert!(text.contains("t=       7 ms"));
    }

    #[test]
    fn drive_sends_commands_until_quit() {
        let running = Arc::new(AtomicBool::new(true));
        let sender = CommandSender::new(ScriptedTransport::new(Vec::new(), Arc::clone(&running)));
        let state = SharedState::new(10);
        let (tx, rx) = mpsc::channel();
        for line in ["id", "start", "bogus", "stop", "quit", "id"] {
            tx.send(line.to_string()).unwrap();
        }

        drive(&sender, &state, &info(), &running, rx);

        let sent = sender_sent(&sender);
        assert_eq!(
            sent,
            vec![
                "ID;".to_string(),
                "TEST;CMD=START;DURATION=100;RATE=250;".to_string(),
                "TEST;CMD=STOP;".to_string(),
            ]
        );
        assert!(running.load(Ordering::Relaxed));
    }

    #[test]
    fn drive_stops_when_flag_cleared() {
        let running = Arc::new(AtomicBool::new(false));
        let sender = CommandSender::new(ScriptedTransport::new(Vec::new(), Arc::clone(&running)));
        let state = SharedState::new(10);
        let (tx, rx) = mpsc::channel();
        tx.send("id".to_string()).unwrap();
        drive(&sender, &state, &info(), &running, rx);
        assert!(sender_sent(&sender).is_empty());
    }

    fn sender_sent(sender: &CommandSender<ScriptedTransport>) -> Vec<String> {
        sender
            .transport()
            .sent
            .borrow()
            .iter()
            .map(|b| String::from_utf8(b.clone()).unwrap())
            .collect()
    }
}
