//! Visualization window: a winit application driving the per-frame
//! analyze -> map -> transform -> compose -> present loop.

use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::run_on_demand::EventLoopExtRunOnDemand;
use winit::window::{Window, WindowId};

use crate::audio::playback::PlaybackEngine;
use crate::error::{Error, Result};
use crate::params::{RenderConfig, VisualMapping, VisualizerConfig};
use crate::rendering::RenderSystem;
use crate::store::Track;
use crate::viz::kaleidoscope::{self, Kaleidoscope, VisualParams};
use crate::viz::spectrum::{self, SpectrumAnalyzer};

/// One-shot kaleidoscope visualization of a single track.
pub struct Visualizer {
    config: VisualizerConfig,
    mapping: VisualMapping,
    render: RenderConfig,
}

impl Visualizer {
    pub fn new(config: VisualizerConfig, mapping: VisualMapping, render: RenderConfig) -> Self {
        Self {
            config,
            mapping,
            render,
        }
    }

    /// Load and normalize the track's signal, start its companion
    /// playback loop, and run the render loop until the window is
    /// closed. Closing the window does not stop playback; that stays
    /// with the normal stop path.
    pub fn run(
        &self,
        event_loop: &mut EventLoop<()>,
        track: &Track,
        engine: &PlaybackEngine,
    ) -> Result<()> {
        let signal = spectrum::load_signal(&track.path)?;
        engine.play_track(track);
        info!("visualizing {}", track.path.display());

        let mut app = VizApp::new(
            signal,
            self.config.clone(),
            self.mapping.clone(),
            self.render.clone(),
        );
        event_loop
            .run_app_on_demand(&mut app)
            .map_err(|e| Error::Render(e.to_string()))?;
        if let Some(failure) = app.failure.take() {
            return Err(failure);
        }
        Ok(())
    }
}

struct VizApp {
    signal: Vec<f32>,
    config: VisualizerConfig,
    mapping: VisualMapping,
    render_config: RenderConfig,
    analyzer: SpectrumAnalyzer,
    window: Option<Arc<Window>>,
    renderer: Option<RenderSystem>,
    kaleidoscope: Option<Kaleidoscope>,
    frame: u64,
    last_frame: Instant,
    failure: Option<Error>,
}

impl VizApp {
    fn new(
        signal: Vec<f32>,
        config: VisualizerConfig,
        mapping: VisualMapping,
        render_config: RenderConfig,
    ) -> Self {
        Self {
            signal,
            config,
            mapping,
            render_config,
            analyzer: SpectrumAnalyzer::new(),
            window: None,
            renderer: None,
            kaleidoscope: None,
            frame: 0,
            last_frame: Instant::now(),
            failure: None,
        }
    }

    fn render_frame(&mut self) {
        let (Some(renderer), Some(kal)) = (&self.renderer, &self.kaleidoscope) else {
            return;
        };

        let window = spectrum::analysis_window(&self.signal, self.frame, self.config.chunk_samples);
        let bands = self.analyzer.band_energies(window);
        let params = VisualParams::derive(&bands, &self.mapping);

        let tile = kal.frame(&params);
        let radii = kaleidoscope::ring_radii(kal.size(), self.config.ring_spacing, bands.mid);
        let canvas = kaleidoscope::compose_canvas(&tile, &radii, params.color, &self.render_config);

        if let Err(e) = renderer.present(canvas.as_raw()) {
            error!("present failed: {e}");
        }
        self.frame += 1;

        // Bound the loop to the target frame rate.
        let frame_duration = self.render_config.frame_duration();
        let elapsed = self.last_frame.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
        self.last_frame = Instant::now();
    }
}

impl ApplicationHandler for VizApp {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let attributes = Window::default_attributes()
            .with_title("Kaleidoloop")
            .with_resizable(false)
            .with_inner_size(LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.failure = Some(Error::Render(format!("create window: {e}")));
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.render_config.window_width,
            self.render_config.window_height,
        )) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                self.failure = Some(e);
                event_loop.exit();
                return;
            }
        }

        self.kaleidoscope = Some(Kaleidoscope::new(self.config.tile_size, &mut rand::rng()));
        self.frame = 0;
        self.last_frame = Instant::now();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.render_frame(),
            _ => {}
        }
    }
}
