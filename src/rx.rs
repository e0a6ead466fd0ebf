use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::dispatch::{Disposition, IdentitySink, TelemetrySink, dispatch};
use crate::proto::command::Message;
use crate::proto::parser::{decode_datagram, latin1};
use crate::stats::Stats;
use crate::transport::{MAX_DATAGRAM, POLL_INTERVAL, Transport, is_timeout};

/// Consecutive failures at which the short pause starts.
pub const SHORT_PAUSE_FROM: u32 = 3;
/// Consecutive failures beyond which the long pause also applies.
pub const LONG_PAUSE_ABOVE: u32 = 10;
pub const SHORT_PAUSE_UNITS: u32 = 3;
pub const LONG_PAUSE_UNITS: u32 = 10;

/// Two fixed tiers, checked independently: past ten failures both pauses run.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub unit: Duration,
}

impl Backoff {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    /// Pauses owed after `failures` consecutive receive errors, in order.
    pub fn pauses(self, failures: u32) -> Vec<Duration> {
        let mut out = Vec::with_capacity(2);
        if failures > LONG_PAUSE_ABOVE {
            out.push(self.unit * LONG_PAUSE_UNITS);
        }
        if failures >= SHORT_PAUSE_FROM {
            out.push(self.unit * SHORT_PAUSE_UNITS);
        }
        out
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailureCounter(u32);

impl FailureCounter {
    pub fn bump(&mut self) -> u32 {
        self.0 = self.0.saturating_add(1);
        self.0
    }
    pub fn reset(&mut self) {
        self.0 = 0;
    }
    #[cfg(test)]
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Outcome of one receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Received(Disposition),
    /// Read timeout: nothing arrived, counter untouched.
    Idle,
    Failed { failures: u32, pauses: Vec<Duration> },
}

/// Waits out one backoff pause; must return early once `running` is cleared.
pub type PauseFn = Box<dyn FnMut(Duration, &AtomicBool)>;

pub struct ReceiveLoop<T, S: ?Sized> {
    transport: T,
    sink: Arc<S>,
    backoff: Backoff,
    pause: PauseFn,
    failures: FailureCounter,
    stats: Stats,
    stats_interval: Duration,
    /// One byte past `MAX_DATAGRAM`, so an oversized datagram is visible as such.
    buf: Vec<u8>,
}

impl<T, S> ReceiveLoop<T, S>
where
    T: Transport,
    S: TelemetrySink + IdentitySink + ?Sized,
{
    pub fn new(transport: T, sink: Arc<S>) -> Self {
        Self {
            transport,
            sink,
            backoff: Backoff::default(),
            pause: Box::new(pause),
            failures: FailureCounter::default(),
            stats: Stats::new(),
            stats_interval: Duration::from_secs(10),
            buf: vec![0u8; MAX_DATAGRAM + 1],
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace the stop-aware sleep used for backoff pauses.
    pub fn with_pause(mut self, pause: impl FnMut(Duration, &AtomicBool) + 'static) -> Self {
        self.pause = Box::new(pause);
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// One blocking receive, decoded and dispatched. Does not sleep.
    pub fn step(&mut self) -> Step {
        match self.transport.recv(&mut self.buf) {
            Ok((n, from)) => {
                self.failures.reset();
                self.stats.add_datagram(n);
                let msg = if n > MAX_DATAGRAM {
                    log::warn!(
                        "[rx] datagram from {} longer than {} bytes, not decoded",
                        from,
                        MAX_DATAGRAM
                    );
                    Message::Unrecognized {
                        raw: latin1(&self.buf[..n]),
                    }
                } else {
                    decode_datagram(&self.buf[..n])
                };
                log::debug!("[rx] {} from {} ({} bytes)", msg.kind(), from, n);
                let disposition = dispatch(msg, &*self.sink);
                self.stats.record(disposition);
                Step::Received(disposition)
            }
            Err(e) if is_timeout(&e) => Step::Idle,
            Err(e) => {
                self.stats.inc_recv_error();
                let failures = self.failures.bump();
                log::error!("[rx] recv error ({} in a row): {}", failures, e);
                if failures > LONG_PAUSE_ABOVE {
                    log::warn!(
                        "[rx] more than {} consecutive receive failures, something looks wrong",
                        LONG_PAUSE_ABOVE
                    );
                }
                Step::Failed {
                    failures,
                    pauses: self.backoff.pauses(failures),
                }
            }
        }
    }

    /// Receive until `running` is cleared. Transport errors never end the loop.
    pub fn run(&mut self, running: &AtomicBool) {
        log::info!("[rx] receive loop started");
        while running.load(Ordering::Relaxed) {
            if let Step::Failed { pauses, .. } = self.step() {
                for p in pauses {
                    (self.pause)(p, running);
                }
            }
            self.stats.maybe_log(self.stats_interval);
        }
        self.stats.log();
        log::info!("[rx] receive loop stopped");
    }
}

/// Sleep for `d`, waking early once `running` is cleared.
fn pause(d: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + d;
    while running.load(Ordering::Relaxed) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        std::thread::sleep(left.min(POLL_INTERVAL));
    }
}
