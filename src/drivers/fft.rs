use rustfft::{num_complex::Complex32, FftPlanner};

use crate::drivers::buffer::SAMPLE_RATE_HZ;

/// The spectrum is recomputed only once the window holds more samples than this.
pub const SPECTRUM_MIN_SAMPLES: usize = 500;

/// Magnitude spectrum over the non-negative frequency bins.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    pub frequencies_hz: Vec<f32>,
    pub magnitudes: Vec<f32>,
}

impl Spectrum {
    /// Bin with the largest magnitude, if any.
    pub fn peak(&self) -> Option<(f32, f32)> {
        self.magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &magnitude)| (self.frequencies_hz[i], magnitude))
    }
}

/// Computes full-window DFT magnitude spectra.
pub struct SpectrumBuilder {
    planner: FftPlanner<f32>,
}

impl SpectrumBuilder {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Transforms the whole value sequence (no windowing or tapering) and
    /// keeps the first half of the symmetric spectrum: bin `k` maps to
    /// `k * 125 / n` Hz, magnitudes are raw `|X[k]|`. Recomputation is
    /// wholesale and leaves the input untouched, so repeated calls on the
    /// same window are bit-identical.
    pub fn compute(&mut self, values: &[f32]) -> Spectrum {
        let n = values.len();
        if n == 0 {
            return Spectrum {
                frequencies_hz: Vec::new(),
                magnitudes: Vec::new(),
            };
        }
        let fft = self.planner.plan_fft_forward(n);
        let mut bins: Vec<Complex32> = values.iter().map(|&v| Complex32::new(v, 0.0)).collect();
        fft.process(&mut bins);

        let half = n / 2;
        let step = SAMPLE_RATE_HZ / n as f32;
        Spectrum {
            frequencies_hz: (0..half).map(|k| k as f32 * step).collect(),
            magnitudes: bins.iter().take(half).map(|c| c.norm()).collect(),
        }
    }

    /// Spectrum over the current window, or `None` below the recompute threshold.
    pub fn compute_if_ready(&mut self, values: &[f32]) -> Option<Spectrum> {
        (values.len() > SPECTRUM_MIN_SAMPLES).then(|| self.compute(values))
    }
}

impl Default for SpectrumBuilder {
    fn default() -> Self {
        Self::new()
    }
}
