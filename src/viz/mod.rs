//! Spectral analysis and kaleidoscope rendering.

pub mod kaleidoscope;
pub mod spectrum;
pub mod window;
