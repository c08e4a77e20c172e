use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Nominal device sample rate, used for timestamps and spectral bins.
pub const SAMPLE_RATE_HZ: f32 = 125.0;
/// Sliding-window capacity shared by display, persistence and analysis.
pub const TRACE_CAPACITY: usize = 750;

/// Owned copy of the buffer's parallel (timestamps, values) sequences.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceSnapshot {
    pub timestamps: Vec<f32>,
    pub values: Vec<f32>,
}

impl TraceSnapshot {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rolling buffer holding the most recent channel-0 voltages.
///
/// The two parallel sequences always have equal length; over-capacity
/// truncation trims both in the same operation, so a snapshot can never
/// observe mismatched lengths.
pub struct TraceBuffer {
    timestamps: Vec<f32>,
    values: Vec<f32>,
    session_samples: u64,
    measuring: Arc<AtomicBool>,
}

impl TraceBuffer {
    pub fn new(measuring: Arc<AtomicBool>) -> Self {
        Self {
            timestamps: Vec::with_capacity(TRACE_CAPACITY),
            values: Vec::with_capacity(TRACE_CAPACITY),
            session_samples: 0,
            measuring,
        }
    }

    /// Appends decoded samples in order, stamping them per the measurement
    /// state: a synthetic 125 Hz clock continuing from the session total
    /// while measuring, or an all-zero placeholder axis while idle.
    pub fn append(&mut self, samples: &[f32]) {
        let measuring = self.measuring.load(Ordering::Relaxed);
        for &value in samples {
            let timestamp = if measuring {
                let t = self.session_samples as f32 / SAMPLE_RATE_HZ;
                self.session_samples += 1;
                t
            } else {
                0.0
            };
            self.timestamps.push(timestamp);
            self.values.push(value);
        }
        if self.values.len() > TRACE_CAPACITY {
            let excess = self.values.len() - TRACE_CAPACITY;
            self.timestamps.drain(..excess);
            self.values.drain(..excess);
        }
    }

    /// Clears the window and the session clock for a fresh measurement run.
    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.values.clear();
        self.session_samples = 0;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Owned copy for readers: chart sink, persistence sink, analyzer.
    pub fn snapshot(&self) -> TraceSnapshot {
        TraceSnapshot {
            timestamps: self.timestamps.clone(),
            values: self.values.clone(),
        }
    }
}
