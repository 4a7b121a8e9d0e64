//! Track persistence: numbered WAV files plus the in-memory track list.
//!
//! The store is the single source of truth for which tracks exist. Disk
//! reconciliation happens once at startup via [`TrackStore::recover`],
//! never during normal operation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hound::{SampleFormat, WavSpec, WavWriter};
use log::{info, warn};

use crate::error::Result;
use crate::params::{AudioFormat, StoreConfig};

/// One saved recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// 1-based monotonic index; never reused until an explicit clear.
    pub index: u32,
    pub path: PathBuf,
}

#[derive(Default)]
struct StoreState {
    tracks: Vec<Track>,
    /// Last assigned index; strictly increases across saves and only an
    /// explicit clear resets it to 0.
    counter: u32,
}

pub struct TrackStore {
    config: StoreConfig,
    format: AudioFormat,
    state: Mutex<StoreState>,
}

impl TrackStore {
    pub fn new(config: StoreConfig, format: AudioFormat) -> Self {
        Self {
            config,
            format,
            state: Mutex::new(StoreState::default()),
        }
    }

    fn wav_spec(&self) -> WavSpec {
        WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// Persist captured blocks as the next numbered track, concatenated
    /// in capture order. The counter and list advance only after the
    /// file is fully written, so a failed write leaves no partial entry.
    pub fn save(&self, blocks: &[Vec<i16>]) -> Result<Track> {
        let mut state = self.state.lock().unwrap();
        let index = state.counter + 1;
        let path = self.config.track_path(index);
        write_wav(&path, self.wav_spec(), blocks)?;
        let track = Track { index, path };
        state.counter = index;
        state.tracks.push(track.clone());
        info!("saved {}", track.path.display());
        Ok(track)
    }

    /// Consistent snapshot of the track list.
    pub fn tracks(&self) -> Vec<Track> {
        self.state.lock().unwrap().tracks.clone()
    }

    /// The most recently saved track.
    pub fn latest(&self) -> Option<Track> {
        self.state.lock().unwrap().tracks.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last assigned track index (0 when none assigned since the last
    /// clear).
    pub fn counter(&self) -> u32 {
        self.state.lock().unwrap().counter
    }

    /// Delete every tracked file (best effort: per-file failures are
    /// logged and the batch continues), empty the list, and reset the
    /// index counter. Callers stop playback first so no loop reads a
    /// vanishing file.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        for track in state.tracks.drain(..) {
            match fs::remove_file(&track.path) {
                Ok(()) => info!("deleted {}", track.path.display()),
                Err(e) => warn!("could not delete {}: {e}", track.path.display()),
            }
        }
        state.counter = 0;
        info!("all tracks cleared");
    }

    /// Startup reconciliation: delete track files left behind by earlier
    /// runs. Returns how many were removed. Never called during normal
    /// operation; the in-memory list is the only source of truth after
    /// this point.
    pub fn recover(&self) -> usize {
        let entries = match fs::read_dir(&self.config.directory) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "could not scan {} for stale tracks: {e}",
                    self.config.directory.display()
                );
                return 0;
            }
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !self.config.is_track_file(name) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    warn!("removed stale track file {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => warn!("could not remove stale {}: {e}", entry.path().display()),
            }
        }
        removed
    }
}

fn write_wav(path: &Path, spec: WavSpec, blocks: &[Vec<i16>]) -> Result<()> {
    let mut writer = WavWriter::create(path, spec)?;
    for block in blocks {
        for &sample in block {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
