//! State shared between the receive worker and the console.
//!
//! The worker only writes through the sink traits and the console only reads
//! snapshots. Each lock is held for a single push, swap or clone.

use std::sync::{Mutex, MutexGuard};

use crate::buffer::{TelemetryBuffer, TelemetrySample};
use crate::dispatch::{IdentitySink, TelemetrySink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub model: String,
    pub serial: String,
}

#[derive(Debug)]
pub struct SharedState {
    buffer: Mutex<TelemetryBuffer>,
    identity: Mutex<Option<Identification>>,
}

impl SharedState {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(TelemetryBuffer::with_capacity(capacity)),
            identity: Mutex::new(None),
        }
    }

    /// Buffered window in arrival order.
    pub fn samples(&self) -> Vec<TelemetrySample> {
        lock(&self.buffer).samples()
    }

    /// `None` until the device has answered an identify request.
    pub fn identity(&self) -> Option<Identification> {
        lock(&self.identity).clone()
    }

    pub fn capacity(&self) -> usize {
        lock(&self.buffer).capacity()
    }
}

// Poisoning is ignored: no critical section can be left half-done.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl TelemetrySink for SharedState {
    fn on_sample(&self, millivolts: i64, milliamps: i64, timestamp_ms: u64) {
        lock(&self.buffer).push(TelemetrySample {
            timestamp_ms,
            millivolts,
            milliamps,
        });
    }
}

impl IdentitySink for SharedState {
    fn on_identity(&self, model: &str, serial: &str) {
        *lock(&self.identity) = Some(Identification {
            model: model.to_string(),
            serial: serial.to_string(),
        });
    }
}
