//! Audio pipeline: gain processing, the device seam, capture, and
//! looped playback.

pub mod capture;
pub mod device;
pub mod gain;
pub mod playback;
