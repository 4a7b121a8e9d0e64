//! Microphone capture session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::audio::device::{AudioHost, InputStream};
use crate::audio::gain;
use crate::error::{Error, Result};
use crate::params::{AudioFormat, CaptureConfig};

/// Accumulates gain-processed blocks from a background capture loop.
///
/// The session cycles Idle -> Recording -> Idle. The capture thread owns
/// its input stream (streams are not `Send`); stream-open failures are
/// reported back through a handshake channel before `start` returns.
pub struct CaptureSession {
    host: Arc<dyn AudioHost>,
    format: AudioFormat,
    gain: f32,
    recording: Arc<AtomicBool>,
    buffer: Arc<Mutex<Vec<Vec<i16>>>>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn new(host: Arc<dyn AudioHost>, format: AudioFormat, capture: CaptureConfig) -> Self {
        Self {
            host,
            format,
            gain: capture.gain,
            recording: Arc::new(AtomicBool::new(false)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            worker: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Begin recording. Fails with `AlreadyRecording` while a session is
    /// active; the running capture loop and its buffer are untouched and
    /// no second stream is opened.
    pub fn start(&mut self) -> Result<()> {
        if self.recording.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyRecording);
        }
        self.buffer.lock().unwrap().clear();

        let (ready_tx, ready_rx) = mpsc::channel();
        let host = Arc::clone(&self.host);
        let format = self.format.clone();
        let gain_value = self.gain;
        let recording = Arc::clone(&self.recording);
        let buffer = Arc::clone(&self.buffer);

        let spawned = thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                let mut input = match host.open_input(&format) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                capture_loop(input.as_mut(), gain_value, &recording, &buffer);
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                self.recording.store(false, Ordering::Release);
                return Err(Error::Device(format!("could not spawn capture thread: {e}")));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                info!("recording started");
                Ok(())
            }
            Ok(Err(e)) => {
                self.recording.store(false, Ordering::Release);
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                self.recording.store(false, Ordering::Release);
                let _ = worker.join();
                Err(Error::Device(
                    "capture thread exited before opening a stream".into(),
                ))
            }
        }
    }

    /// Stop recording and flush the captured blocks in capture order.
    /// Also reconciles a session whose capture loop already died on a
    /// stream error: the state flips back to Idle and whatever was
    /// captured before the failure is still flushed.
    pub fn stop(&mut self) -> Result<Vec<Vec<i16>>> {
        if !self.recording.swap(false, Ordering::AcqRel) {
            return Err(Error::NotRecording);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("capture thread panicked");
            }
        }
        let blocks = std::mem::take(&mut *self.buffer.lock().unwrap());
        info!("recording stopped ({} blocks captured)", blocks.len());
        Ok(blocks)
    }
}

fn capture_loop(
    input: &mut dyn InputStream,
    gain_value: f32,
    recording: &AtomicBool,
    buffer: &Mutex<Vec<Vec<i16>>>,
) {
    while recording.load(Ordering::Acquire) {
        match input.read_block() {
            Ok(block) => {
                let processed = gain::apply(&block, gain_value);
                buffer.lock().unwrap().push(processed);
            }
            Err(e) => {
                // Only this loop terminates; the session stays Recording
                // until an explicit stop() reconciles.
                error!("capture loop terminated: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::testing::{InputTail, MockHost};
    use std::time::{Duration, Instant};

    fn small_format() -> AudioFormat {
        AudioFormat {
            sample_rate_hz: 1024,
            channels: 1,
            block_frames: 4,
        }
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
    fn captured_blocks_are_gain_processed_in_order() {
        let host = Arc::new(MockHost::new(InputTail::Error));
        host.push_blocks([vec![1i16, 2, 3, 4], vec![-5, 0, 5, 100]]);
        let mut session = CaptureSession::new(
            host.clone(),
            small_format(),
            CaptureConfig { gain: 2.0 },
        );

        session.start().unwrap();
        assert!(wait_until(1_000, || host.script_remaining() == 0));
        // Let the loop hit the scripted error and die.
        thread::sleep(Duration::from_millis(20));

        // The dead loop leaves the session Recording until stop().
        assert!(session.is_recording());

        let blocks = session.stop().unwrap();
        assert!(!session.is_recording());
        assert_eq!(blocks, vec![vec![2i16, 4, 6, 8], vec![-10, 0, 10, 200]]);
    }

    #[test]
    fn second_start_fails_and_leaves_single_stream() {
        let host = Arc::new(MockHost::new(InputTail::Silence));
        let mut session =
            CaptureSession::new(host.clone(), small_format(), CaptureConfig { gain: 1.0 });

        session.start().unwrap();
        thread::sleep(Duration::from_millis(20));

        assert!(matches!(session.start(), Err(Error::AlreadyRecording)));
        assert_eq!(host.inputs_opened.load(std::sync::atomic::Ordering::SeqCst), 1);

        let blocks = session.stop().unwrap();
        // The failed second start must not have cleared the buffer.
        assert!(!blocks.is_empty());
    }

    #[test]
    fn stop_without_start_reports_not_recording() {
        let host = Arc::new(MockHost::new(InputTail::Silence));
        let mut session =
            CaptureSession::new(host, small_format(), CaptureConfig { gain: 1.0 });
        assert!(matches!(session.stop(), Err(Error::NotRecording)));
    }

    #[test]
    fn session_restarts_cleanly_after_stop() {
        let host = Arc::new(MockHost::new(InputTail::Error));
        host.push_blocks([vec![7i16, 7, 7, 7]]);
        let mut session =
            CaptureSession::new(host.clone(), small_format(), CaptureConfig { gain: 1.0 });

        session.start().unwrap();
        assert!(wait_until(1_000, || host.script_remaining() == 0));
        thread::sleep(Duration::from_millis(10));
        assert_eq!(session.stop().unwrap().len(), 1);

        host.push_blocks([vec![9i16, 9, 9, 9]]);
        session.start().unwrap();
        assert!(wait_until(1_000, || host.script_remaining() == 0));
        thread::sleep(Duration::from_millis(10));
        let blocks = session.stop().unwrap();
        // A fresh start clears the previous session's buffer.
        assert_eq!(blocks, vec![vec![9i16, 9, 9, 9]]);
        assert_eq!(host.inputs_opened.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
