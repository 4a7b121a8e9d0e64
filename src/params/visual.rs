//! Visualization tuning: analysis cadence, tile geometry, and the
//! band-to-visual mapping.

/// Tile geometry and analysis cadence for one visualization run.
#[derive(Debug, Clone)]
pub struct VisualizerConfig {
    /// Base tile edge length (pixels) before mirroring
    pub tile_size: u32,

    /// Samples the analysis cursor advances per rendered frame
    pub chunk_samples: usize,

    /// Pixel step between concentric ring overlays
    pub ring_spacing: u32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            tile_size: 100,
            chunk_samples: 100,
            ring_spacing: 10,
        }
    }
}

/// Mapping from frequency-band energies to kaleidoscope parameters.
#[derive(Debug, Clone)]
pub struct VisualMapping {
    /// Mid energy drives rotation (degrees per unit energy)
    /// Formula: rotation = mid * this
    pub mid_to_rotation_degrees: f32,

    /// Low energy drives zoom above unity
    /// Formula: scale = 1 + low * this
    pub low_to_scale: f32,

    /// Band energy drives color channels
    /// Formula: rgb = (high, mid, low) * this
    pub color_depth: f32,
}

impl Default for VisualMapping {
    fn default() -> Self {
        Self {
            mid_to_rotation_degrees: 360.0,
            low_to_scale: 2.0,
            color_depth: 255.0,
        }
    }
}
