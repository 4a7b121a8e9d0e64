//! Multi-track looped playback.
//!
//! One independent playback thread per track, all observing a single
//! shared playing flag. Loops are deliberately unsynchronized: tracks of
//! different lengths drift out of phase over repeated passes, which is
//! the layering behavior, not a bug.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use hound::WavReader;
use log::{error, info, warn};

use crate::audio::device::AudioHost;
use crate::error::{Error, Result};
use crate::params::AudioFormat;
use crate::store::Track;

pub struct PlaybackEngine {
    host: Arc<dyn AudioHost>,
    format: AudioFormat,
    playing: Arc<AtomicBool>,
    workers: Mutex<Vec<Worker>>,
}

struct Worker {
    track_index: u32,
    handle: JoinHandle<()>,
}

impl PlaybackEngine {
    pub fn new(host: Arc<dyn AudioHost>, format: AudioFormat) -> Self {
        Self {
            host,
            format,
            playing: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Number of loops still running.
    pub fn active_loops(&self) -> usize {
        let mut workers = self.workers.lock().unwrap();
        prune(&mut workers);
        workers.len()
    }

    /// Start looped playback of every given track. Tracks that already
    /// have a live loop are skipped, so repeated calls never stack
    /// duplicate loops while newly saved tracks still get one.
    pub fn play_all(&self, tracks: &[Track]) {
        if tracks.is_empty() {
            warn!("no tracks to play");
            return;
        }
        self.playing.store(true, Ordering::Release);
        let mut workers = self.workers.lock().unwrap();
        prune(&mut workers);
        for track in tracks {
            if workers.iter().any(|w| w.track_index == track.index) {
                continue;
            }
            match self.spawn_loop(track.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) => error!("could not start playback of track {}: {e}", track.index),
            }
        }
        info!("playing {} track(s) on loop", workers.len());
    }

    /// Single-track path used by the visualizer's companion playback.
    pub fn play_track(&self, track: &Track) {
        self.playing.store(true, Ordering::Release);
        let mut workers = self.workers.lock().unwrap();
        prune(&mut workers);
        if workers.iter().any(|w| w.track_index == track.index) {
            return;
        }
        match self.spawn_loop(track.clone()) {
            Ok(worker) => workers.push(worker),
            Err(e) => error!("could not start playback of track {}: {e}", track.index),
        }
    }

    /// Request stop and return immediately. Every loop polls the flag at
    /// least once per block write, so termination lags by at most one
    /// block duration.
    pub fn stop(&self) -> Result<()> {
        if !self.playing.swap(false, Ordering::AcqRel) {
            return Err(Error::NotPlaying);
        }
        info!("playback stop requested");
        Ok(())
    }

    /// Stop and wait for every loop to exit. Required before deleting
    /// track files so no loop reads a vanishing file.
    pub fn stop_blocking(&self) {
        self.playing.store(false, Ordering::Release);
        let workers = std::mem::take(&mut *self.workers.lock().unwrap());
        for worker in workers {
            if worker.handle.join().is_err() {
                error!("playback thread for track {} panicked", worker.track_index);
            }
        }
    }

    fn spawn_loop(&self, track: Track) -> Result<Worker> {
        let host = Arc::clone(&self.host);
        let format = self.format.clone();
        let playing = Arc::clone(&self.playing);
        let index = track.index;
        let handle = thread::Builder::new()
            .name(format!("playback-{index}"))
            .spawn(move || track_loop(host.as_ref(), &format, &playing, &track))
            .map_err(|e| Error::Device(format!("could not spawn playback thread: {e}")))?;
        Ok(Worker {
            track_index: index,
            handle,
        })
    }
}

fn prune(workers: &mut Vec<Worker>) {
    let mut kept = Vec::with_capacity(workers.len());
    for worker in workers.drain(..) {
        if worker.handle.is_finished() {
            let _ = worker.handle.join();
        } else {
            kept.push(worker);
        }
    }
    *workers = kept;
}

fn track_loop(host: &dyn AudioHost, format: &AudioFormat, playing: &AtomicBool, track: &Track) {
    while playing.load(Ordering::Acquire) {
        match play_once(host, format, playing, track) {
            Ok(true) => {}
            Ok(false) => {
                warn!("track {} is empty, not looping it", track.path.display());
                break;
            }
            Err(e) => {
                // Device and storage failures terminate this loop only.
                error!("playback loop for {} terminated: {e}", track.path.display());
                break;
            }
        }
    }
}

/// One pass over the track file: open, stream fixed-size blocks, close.
/// Returns whether anything was played; ends early (still `Ok`) when the
/// playing flag clears.
fn play_once(
    host: &dyn AudioHost,
    format: &AudioFormat,
    playing: &AtomicBool,
    track: &Track,
) -> Result<bool> {
    let mut reader = WavReader::open(&track.path)?;
    let mut output = host.open_output(format)?;
    let mut samples = reader.samples::<i16>();
    let mut played = false;
    let mut block = Vec::with_capacity(format.block_frames);
    loop {
        if !playing.load(Ordering::Acquire) {
            return Ok(played);
        }
        block.clear();
        for sample in samples.by_ref().take(format.block_frames) {
            block.push(sample?);
        }
        if block.is_empty() {
            return Ok(played);
        }
        output.write_block(&block)?;
        played = true;
        if block.len() < format.block_frames {
            return Ok(played);
        }
    }
}
