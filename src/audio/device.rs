//! Trait seam over the platform audio API, plus the cpal-backed
//! implementation.
//!
//! cpal streams are callback-driven and not `Send`, so every stream is
//! created and owned by the worker thread that uses it. The bridge
//! between the device callback and the blocking `read_block` /
//! `write_block` calls is a condvar-guarded sample queue.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use log::{error, warn};

use crate::error::{Error, Result};
use crate::params::AudioFormat;

/// Input queue bound before the oldest samples are dropped (device
/// overflow tolerance, roughly 0.75 s at the defaults).
const INPUT_QUEUE_BLOCKS: usize = 32;

/// Output queue bound; writers block once this many blocks are pending,
/// which keeps stop latency within one block duration.
const OUTPUT_QUEUE_BLOCKS: usize = 2;

/// Platform audio entry point. Implementations must be callable from any
/// worker thread; the streams they hand out stay on the opening thread.
pub trait AudioHost: Send + Sync {
    fn open_input(&self, format: &AudioFormat) -> Result<Box<dyn InputStream>>;
    fn open_output(&self, format: &AudioFormat) -> Result<Box<dyn OutputStream>>;
}

/// One capture stream. `read_block` blocks until a full block is queued.
pub trait InputStream {
    fn read_block(&mut self) -> Result<Vec<i16>>;
}

/// One playback stream. `write_block` blocks while the device-side queue
/// is full, so callers observe stop flags within one block duration.
pub trait OutputStream {
    fn write_block(&mut self, block: &[i16]) -> Result<()>;
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32_768.0).clamp(-32_768.0, 32_767.0) as i16
}

fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32_768.0
}

#[derive(Default)]
struct QueueState {
    samples: VecDeque<i16>,
    dropped: usize,
    failed: bool,
}

/// Condvar-guarded queue shared between a device callback and one
/// blocking reader or writer.
#[derive(Default)]
struct SampleQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl SampleQueue {
    fn fail(&self) {
        self.state.lock().unwrap().failed = true;
        self.ready.notify_all();
    }
}

/// Default-host cpal implementation of the device seam.
pub struct CpalHost;

impl CpalHost {
    fn stream_config(format: &AudioFormat) -> StreamConfig {
        StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate_hz),
            buffer_size: cpal::BufferSize::Default,
        }
    }
}

impl AudioHost for CpalHost {
    fn open_input(&self, format: &AudioFormat) -> Result<Box<dyn InputStream>> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device available".into()))?;
        let config = Self::stream_config(format);

        let queue = Arc::new(SampleQueue::default());
        let cb_queue = Arc::clone(&queue);
        let err_queue = Arc::clone(&queue);
        let max_queued = format.block_frames * INPUT_QUEUE_BLOCKS;

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut state = cb_queue.state.lock().unwrap();
                    state.samples.extend(data.iter().map(|&s| f32_to_i16(s)));
                    if state.samples.len() > max_queued {
                        let excess = state.samples.len() - max_queued;
                        state.samples.drain(..excess);
                        state.dropped += excess;
                    }
                    drop(state);
                    cb_queue.ready.notify_all();
                },
                move |err| {
                    error!("audio input error: {err}");
                    err_queue.fail();
                },
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;
        stream.play().map_err(|e| Error::Device(e.to_string()))?;

        Ok(Box::new(CpalInputStream {
            queue,
            block_frames: format.block_frames,
            _stream: stream,
        }))
    }

    fn open_output(&self, format: &AudioFormat) -> Result<Box<dyn OutputStream>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Device("no output device available".into()))?;
        let config = Self::stream_config(format);

        let queue = Arc::new(SampleQueue::default());
        let cb_queue = Arc::clone(&queue);
        let err_queue = Arc::clone(&queue);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut state = cb_queue.state.lock().unwrap();
                    for slot in data.iter_mut() {
                        // Underruns play silence rather than stalling the
                        // device.
                        *slot = state
                            .samples
                            .pop_front()
                            .map(i16_to_f32)
                            .unwrap_or(0.0);
                    }
                    drop(state);
                    cb_queue.ready.notify_all();
                },
                move |err| {
                    error!("audio output error: {err}");
                    err_queue.fail();
                },
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;
        stream.play().map_err(|e| Error::Device(e.to_string()))?;

        Ok(Box::new(CpalOutputStream {
            queue,
            capacity: format.block_frames * OUTPUT_QUEUE_BLOCKS,
            _stream: stream,
        }))
    }
}

struct CpalInputStream {
    queue: Arc<SampleQueue>,
    block_frames: usize,
    _stream: cpal::Stream,
}

impl InputStream for CpalInputStream {
    fn read_block(&mut self) -> Result<Vec<i16>> {
        let mut state = self.queue.state.lock().unwrap();
        loop {
            if state.failed {
                return Err(Error::Device("input stream failed".into()));
            }
            if state.dropped > 0 {
                warn!("input overflow: dropped {} queued samples", state.dropped);
                state.dropped = 0;
            }
            if state.samples.len() >= self.block_frames {
                return Ok(state.samples.drain(..self.block_frames).collect());
            }
            state = self.queue.ready.wait(state).unwrap();
        }
    }
}

struct CpalOutputStream {
    queue: Arc<SampleQueue>,
    capacity: usize,
    _stream: cpal::Stream,
}

impl OutputStream for CpalOutputStream {
    fn write_block(&mut self, block: &[i16]) -> Result<()> {
        let mut state = self.queue.state.lock().unwrap();
        loop {
            if state.failed {
                return Err(Error::Device("output stream failed".into()));
            }
            if state.samples.len() + block.len() <= self.capacity.max(block.len()) {
                state.samples.extend(block.iter().copied());
                return Ok(());
            }
            let (guard, _timeout) = self
                .queue
                .ready
                .wait_timeout(state, Duration::from_millis(250))
                .unwrap();
            state = guard;
        }
    }
}
