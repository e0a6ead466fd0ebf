use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySample {
    pub timestamp_ms: u64,
    pub millivolts: i64,
    pub milliamps: i64,
}

/// Fixed-capacity sliding window; once full, each push evicts the oldest sample.
#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    samples: VecDeque<TelemetrySample>,
    capacity: usize,
}

impl TelemetryBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: TelemetrySample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Snapshot in arrival order.
    pub fn samples(&self) -> Vec<TelemetrySample> {
        self.samples.iter().copied().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: u64) -> TelemetrySample {
        TelemetrySample {
            timestamp_ms: t,
            millivolts: t as i64 * 10,
            milliamps: -(t as i64),
        }
    }

    #[test]
    fn keeps_everything_below_capacity() {
        let mut buf = TelemetryBuffer::with_capacity(4);
        for t in 1..=3 {
            buf.push(sample(t));
        }
        assert_eq!(buf.samples(), vec![sample(1), sample(2), sample(3)]);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut buf = TelemetryBuffer::with_capacity(3);
        for t in 1..=4 {
            buf.push(sample(t));
        }
        assert_eq!(buf.samples(), vec![sample(2), sample(3), sample(4)]);
    }

    #[test]
    fn default_window_is_one_hundred() {
        let mut buf = TelemetryBuffer::default();
        assert!(buf.samples().is_empty());
        for t in 0..=100 {
            buf.push(sample(t));
        }
        let samples = buf.samples();
        assert_eq!(buf.capacity(), DEFAULT_CAPACITY);
        assert_eq!(samples.len(), 100);
        assert_eq!(samples.first(), Some(&sample(1)));
        assert_eq!(samples.last(), Some(&sample(100)));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = TelemetryBuffer::with_capacity(0);
        buf.push(sample(1));
        buf.push(sample(2));
        assert_eq!(buf.samples(), vec![sample(2)]);
    }
}
