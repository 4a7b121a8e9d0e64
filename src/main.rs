//! Kaleidoloop - record, layer, and visualize looped audio tracks.
//!
//! Recordings accumulate as numbered tracks that all play back on
//! independent loops; stopping a recording visualizes the newest track
//! as an audio-reactive kaleidoscope while the layers keep spinning.

use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use winit::event_loop::EventLoop;

use kaleidoloop::audio::device::{AudioHost, CpalHost};
use kaleidoloop::cli::Args;
use kaleidoloop::looper::Looper;
use kaleidoloop::params::{RenderConfig, VisualMapping, VisualizerConfig};
use kaleidoloop::viz::window::Visualizer;

fn main() {
    env_logger::init();
    let args = Args::parse();

    let host: Arc<dyn AudioHost> = Arc::new(CpalHost);
    let looper = Looper::new(
        host,
        args.audio_format(),
        args.capture_config(),
        args.store_config(),
    );

    if !args.keep_stale {
        let removed = looper.store().recover();
        if removed > 0 {
            info!("removed {removed} stale track file(s) from a previous run");
        }
    }

    // The event loop lives on the main thread and is reused for every
    // visualization via run-on-demand.
    let mut event_loop = match EventLoop::new() {
        Ok(event_loop) => Some(event_loop),
        Err(e) => {
            warn!("no display available, visualization disabled: {e}");
            None
        }
    };
    let visualizer = Visualizer::new(
        VisualizerConfig::default(),
        VisualMapping::default(),
        RenderConfig::default(),
    );

    println!("commands: r=record  s=stop+save  p=play all  x=stop playback  c=clear  q=quit");
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("stdin error: {e}");
                break;
            }
        }
        match line.trim() {
            "r" => {
                if let Err(e) = looper.start_capture() {
                    error!("could not start recording: {e}");
                }
            }
            "s" => stop_and_save(&looper, &visualizer, event_loop.as_mut()),
            "p" => looper.play_all(),
            "x" => looper.stop_playback(),
            "c" => {
                if looper.is_recording() {
                    stop_and_save(&looper, &visualizer, event_loop.as_mut());
                }
                looper.clear_all();
                println!("all tracks cleared");
            }
            "q" => {
                if looper.is_recording() {
                    stop_and_save(&looper, &visualizer, event_loop.as_mut());
                }
                looper.playback().stop_blocking();
                break;
            }
            "" => {}
            other => println!("unknown command '{other}'"),
        }
    }
    info!("exiting");
}

/// Stop recording, save the track, visualize it (modal until the window
/// closes), then layer every track on loop.
fn stop_and_save(looper: &Looper, visualizer: &Visualizer, event_loop: Option<&mut EventLoop<()>>) {
    match looper.stop_capture_and_save() {
        Ok(Some(track)) => {
            println!("saved {}", track.path.display());
            if let Some(event_loop) = event_loop {
                if let Err(e) = visualizer.run(event_loop, &track, looper.playback()) {
                    error!("visualization failed: {e}");
                }
            }
            looper.play_all();
        }
        Ok(None) => {}
        Err(e) => error!("could not save track: {e}"),
    }
}
