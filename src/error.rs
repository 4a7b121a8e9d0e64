//! Crate-wide error taxonomy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong across capture, storage, playback, and
/// visualization. State errors (the first three) are reported and handled
/// as no-ops at the command surface; the rest propagate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("already recording")]
    AlreadyRecording,

    #[error("not currently recording")]
    NotRecording,

    #[error("not currently playing")]
    NotPlaying,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("track storage error: {0}")]
    Storage(#[from] hound::Error),

    #[error("degenerate signal: {0}")]
    Numeric(&'static str),

    #[error("render error: {0}")]
    Render(String),
}
