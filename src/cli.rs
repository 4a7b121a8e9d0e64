//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::params::{AudioFormat, CaptureConfig, StoreConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Kaleidoloop")]
#[command(about = "Loop-layering audio recorder with a kaleidoscope visualizer", long_about = None)]
pub struct Args {
    /// Input gain applied while recording
    #[arg(long, value_name = "FACTOR", default_value = "5.0")]
    pub gain: f32,

    /// Sample rate for capture, playback, and saved tracks (Hz)
    #[arg(long, value_name = "HZ", default_value = "44100")]
    pub sample_rate: u32,

    /// Frames per device block
    #[arg(long, value_name = "FRAMES", default_value = "1024")]
    pub block: usize,

    /// Directory where track files are written
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub tracks_dir: PathBuf,

    /// Keep track files left behind by previous runs instead of
    /// deleting them at startup
    #[arg(long)]
    pub keep_stale: bool,
}

impl Args {
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate_hz: self.sample_rate,
            channels: 1,
            block_frames: self.block,
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig { gain: self.gain }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            directory: self.tracks_dir.clone(),
            ..StoreConfig::default()
        }
    }
}
