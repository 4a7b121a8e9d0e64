//! The command-surface facade over capture, storage, and playback.

use std::sync::{Arc, Mutex};

use log::warn;

use crate::audio::capture::CaptureSession;
use crate::audio::device::AudioHost;
use crate::audio::playback::PlaybackEngine;
use crate::error::{Error, Result};
use crate::params::{AudioFormat, CaptureConfig, StoreConfig};
use crate::store::{Track, TrackStore};

/// Sequences the capture session, track store, and playback engine
/// behind the five user-facing operations. State no-ops (double start,
/// stop while idle, stop while silent) are reported and return normally;
/// real device, storage, and signal failures propagate.
pub struct Looper {
    capture: Mutex<CaptureSession>,
    store: Arc<TrackStore>,
    playback: Arc<PlaybackEngine>,
}

impl Looper {
    pub fn new(
        host: Arc<dyn AudioHost>,
        format: AudioFormat,
        capture: CaptureConfig,
        store_config: StoreConfig,
    ) -> Self {
        let store = Arc::new(TrackStore::new(store_config, format.clone()));
        let playback = Arc::new(PlaybackEngine::new(Arc::clone(&host), format.clone()));
        Self {
            capture: Mutex::new(CaptureSession::new(host, format, capture)),
            store,
            playback,
        }
    }

    pub fn store(&self) -> &Arc<TrackStore> {
        &self.store
    }

    pub fn playback(&self) -> &Arc<PlaybackEngine> {
        &self.playback
    }

    pub fn is_recording(&self) -> bool {
        self.capture.lock().unwrap().is_recording()
    }

    /// Begin recording a new track.
    pub fn start_capture(&self) -> Result<()> {
        match self.capture.lock().unwrap().start() {
            Err(Error::AlreadyRecording) => {
                warn!("already recording");
                Ok(())
            }
            other => other,
        }
    }

    /// Stop recording and persist the buffer as the next track. Returns
    /// the saved track, or `None` when nothing was being recorded.
    pub fn stop_capture_and_save(&self) -> Result<Option<Track>> {
        let blocks = match self.capture.lock().unwrap().stop() {
            Ok(blocks) => blocks,
            Err(Error::NotRecording) => {
                warn!("not currently recording");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let track = self.store.save(&blocks)?;
        Ok(Some(track))
    }

    /// Loop every saved track concurrently (idempotent while unchanged).
    pub fn play_all(&self) {
        self.playback.play_all(&self.store.tracks());
    }

    /// Request playback stop; loops exit within one block duration.
    pub fn stop_playback(&self) {
        if let Err(Error::NotPlaying) = self.playback.stop() {
            warn!("not currently playing");
        }
    }

    /// Stop playback (blocking) and delete every track, resetting the
    /// index counter.
    pub fn clear_all(&self) {
        self.playback.stop_blocking();
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::testing::{InputTail, MockHost};
    use hound::WavReader;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    fn temp_dir() -> PathBuf {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "kaleidoloop-looper-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn small_format() -> AudioFormat {
        AudioFormat {
            sample_rate_hz: 1024,
            channels: 1,
            block_frames: 256,
        }
    }

    fn looper_with(host: Arc<MockHost>, dir: &PathBuf) -> Looper {
        Looper::new(
            host,
            small_format(),
            CaptureConfig { gain: 5.0 },
            StoreConfig {
                directory: dir.clone(),
                ..StoreConfig::default()
            },
        )
    }

    fn wait_until(deadline_ms: u64, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(deadline_ms);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        done()
    }

    #[test]
    fn two_seconds_of_silence_record_to_an_all_zero_track() {
        let dir = temp_dir();
        let host = Arc::new(MockHost::new(InputTail::Error));
        let format = small_format();
        // 2 s at 1024 Hz in 256-frame blocks.
        host.push_blocks((0..8).map(|_| vec![0i16; format.block_frames]));
        let looper = looper_with(host.clone(), &dir);

        looper.start_capture().unwrap();
        assert!(wait_until(1_000, || host.script_remaining() == 0));
        thread::sleep(Duration::from_millis(20));

        let track = looper.stop_capture_and_save().unwrap().unwrap();
        assert_eq!(track.index, 1);

        let mut reader = WavReader::open(&track.path).unwrap();
        assert_eq!(reader.len(), format.sample_rate_hz * 2);
        assert!(reader.samples::<i16>().all(|s| s.unwrap() == 0));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn stop_without_recording_is_a_reported_no_op() {
        let dir = temp_dir();
        let host = Arc::new(MockHost::new(InputTail::Silence));
        let looper = looper_with(host, &dir);

        assert!(looper.stop_capture_and_save().unwrap().is_none());
        assert!(looper.store().is_empty());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn clear_all_stops_playback_and_resets_the_index() {
        let dir = temp_dir();
        let host = Arc::new(MockHost::new(InputTail::Silence));
        let looper = looper_with(host, &dir);
        let format = small_format();

        for _ in 0..3 {
            looper
                .store()
                .save(&[vec![5i16; format.block_frames]])
                .unwrap();
        }
        looper.play_all();
        assert!(wait_until(2_000, || looper.playback().active_loops() == 3));

        looper.clear_all();
        assert_eq!(looper.playback().active_loops(), 0);
        assert!(looper.store().is_empty());
        let leftovers = fs::read_dir(&dir)
            .unwrap()
            .flatten()
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n.starts_with("track_") && n.ends_with(".wav"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);

        assert_eq!(looper.store().save(&[vec![1i16]]).unwrap().index, 1);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn capture_applies_gain_before_saving() {
        let dir = temp_dir();
        let host = Arc::new(MockHost::new(InputTail::Error));
        let format = small_format();
        host.push_blocks([vec![100i16; format.block_frames]]);
        let looper = looper_with(host.clone(), &dir);

        looper.start_capture().unwrap();
        assert!(wait_until(1_000, || host.script_remaining() == 0));
        thread::sleep(Duration::from_millis(20));

        let track = looper.stop_capture_and_save().unwrap().unwrap();
        let mut reader = WavReader::open(&track.path).unwrap();
        assert!(reader.samples::<i16>().all(|s| s.unwrap() == 500));

        let _ = fs::remove_dir_all(dir);
    }
}
