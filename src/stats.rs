use std::time::{Duration, Instant};

use crate::dispatch::Disposition;

#[derive(Debug, Clone)]
pub struct Stats {
    pub datagrams: u64,
    pub bytes: u64,
    pub samples: u64,
    pub identities: u64,
    pub status: u64,
    pub device_errors: u64,
    pub unrecognized: u64,
    pub recv_errors: u64,
    t0: Instant,
    last: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            datagrams: 0,
            bytes: 0,
            samples: 0,
            identities: 0,
            status: 0,
            device_errors: 0,
            unrecognized: 0,
            recv_errors: 0,
            t0: Instant::now(),
            last: Instant::now(),
        }
    }
    pub fn add_datagram(&mut self, n: usize) {
        self.datagrams += 1;
        self.bytes += n as u64;
    }
    pub fn inc_recv_error(&mut self) {
        self.recv_errors += 1;
    }
    pub fn record(&mut self, d: Disposition) {
        match d {
            Disposition::Sample => self.samples += 1,
            Disposition::Identity => self.identities += 1,
            Disposition::Status => self.status += 1,
            Disposition::DeviceError => self.device_errors += 1,
            Disposition::Unrecognized => self.unrecognized += 1,
        }
    }

    /// Log a summary if `interval` has passed since the last one.
    pub fn maybe_log(&mut self, interval: Duration) {
        if self.last.elapsed() >= interval {
            self.log();
            self.last = Instant::now();
        }
    }

    pub fn log(&self) {
        let dur = self.t0.elapsed().as_secs_f64().max(1e-3);
        log::info!(
            "[rx] datagrams={} samples={} ids={} status={} dev_err={} unrecognized={} recv_err={} bytes={} over {:.1}s ({:.1} msg/s)",
            self.datagrams,
            self.samples,
            self.identities,
            self.status,
            self.device_errors,
            self.unrecognized,
            self.recv_errors,
            self.bytes,
            dur,
            self.datagrams as f64 / dur,
        );
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
