use crate::sync::session::PlaybackStatus;
use thiserror::Error;

/// Reported by an [`EmulationCore`](crate::emulation::EmulationCore) that refused a cartridge image.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct CoreError(pub String);

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    #[error("Audio device unavailable: {0}")]
    Unavailable(String),

    #[error("Audio device failed: {0}")]
    Device(String),

    #[error("Audio stream closed")]
    Closed,

    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Cartridge initialization failed: {0}")]
    Initialization(#[from] CoreError),

    #[error("No cartridge loaded")]
    NoCartridge,

    #[error("Cannot {action} while {status:?}")]
    InvalidTransition {
        status: PlaybackStatus,
        action: &'static str,
    },

    #[error("Could not open audio output: {0}")]
    SinkOpen(#[source] SinkError),

    /// The session was torn down because the sink rejected a buffer.
    #[error("Playback halted: {0}")]
    Halted(#[source] SinkError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
