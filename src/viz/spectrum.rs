//! Spectral analysis of a track signal.

use std::path::Path;

use hound::WavReader;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{Error, Result};

/// Mean magnitude of each spectrum third, all in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergies {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

/// Load a track's full PCM signal, normalized to unit peak amplitude.
/// An all-zero signal passes through as zeros rather than dividing by
/// zero; an empty track is a degenerate signal.
pub fn load_signal(path: &Path) -> Result<Vec<f32>> {
    let mut reader = WavReader::open(path)?;
    let mut signal = Vec::with_capacity(reader.len() as usize);
    for sample in reader.samples::<i16>() {
        signal.push(sample? as f32);
    }
    if signal.is_empty() {
        return Err(Error::Numeric("empty signal"));
    }
    normalize_peak(&mut signal);
    Ok(signal)
}

/// Scale the signal to unit peak. All-zero input is left untouched.
pub fn normalize_peak(signal: &mut [f32]) {
    let peak = signal.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        for s in signal.iter_mut() {
            *s /= peak;
        }
    }
}

/// The analysis window for a frame: the cursor advances by `chunk`
/// samples per frame and wraps modulo the signal length, clamped to the
/// signal tail. This tracks audible playback position only
/// approximately; the two cursors drift over long runs.
pub fn analysis_window(signal: &[f32], frame: u64, chunk: usize) -> &[f32] {
    if signal.is_empty() || chunk == 0 {
        return &[];
    }
    let start = ((frame as u128 * chunk as u128) % signal.len() as u128) as usize;
    let end = (start + chunk).min(signal.len());
    &signal[start..end]
}

pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Magnitude spectrum of the window (non-negative frequencies only),
    /// normalized by its maximum, then split into equal thirds by bin
    /// index. A zero-energy or too-short window yields zero bands rather
    /// than dividing by zero.
    pub fn band_energies(&mut self, window: &[f32]) -> BandEnergies {
        if window.is_empty() {
            return BandEnergies::default();
        }
        let mut buffer: Vec<Complex<f32>> =
            window.iter().map(|&s| Complex::new(s, 0.0)).collect();
        let fft = self.planner.plan_fft_forward(buffer.len());
        fft.process(&mut buffer);

        let half = buffer.len() / 2;
        let mut magnitudes: Vec<f32> = buffer.iter().take(half).map(|c| c.norm()).collect();
        if magnitudes.len() < 3 {
            return BandEnergies::default();
        }
        let max = magnitudes.iter().fold(0.0f32, |m, &v| m.max(v));
        if max <= 0.0 {
            return BandEnergies::default();
        }
        for m in magnitudes.iter_mut() {
            *m /= max;
        }

        let third = magnitudes.len() / 3;
        BandEnergies {
            low: mean(&magnitudes[..third]),
            mid: mean(&magnitudes[third..2 * third]),
            high: mean(&magnitudes[2 * third..]),
        }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
