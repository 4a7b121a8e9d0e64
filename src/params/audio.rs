//! Audio stream format and capture settings.

use std::time::Duration;

/// PCM stream format shared by capture, playback, and storage.
#[derive(Debug, Clone)]
pub struct AudioFormat {
    /// Sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Channel count (the pipeline is mono end to end)
    pub channels: u16,

    /// Frames per device read/write block
    pub block_frames: usize,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44_100,
            channels: 1,
            block_frames: 1024,
        }
    }
}

impl AudioFormat {
    /// Wall-clock duration of one block (~23 ms at the defaults).
    /// Cooperative stop latency is bounded by this.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_frames as f64 / self.sample_rate_hz.max(1) as f64)
    }
}

/// Capture-side settings.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Input gain applied to every captured block before buffering.
    /// Values above 1 amplify faint microphones; samples hard-clip at
    /// the signed 16-bit range.
    pub gain: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { gain: 5.0 }
    }
}
