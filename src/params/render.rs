//! Render window configuration.

use std::time::Duration;

/// Visualization canvas configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Render loop target frame rate
    pub target_fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            target_fps: 60,
        }
    }
}

impl RenderConfig {
    /// Duration of one frame at the target rate.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }
}
