use retroboy_sync::prelude::*;

/// Published by the scheduler thread
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Loaded(RomMetadata),
    StatusChanged(PlaybackStatus),
    /// Reset requested while a buffer is in flight; it lands with the next
    /// step timer
    ResetDeferred,
    /// The audio output failed and the session was torn down
    Halted(String),
    /// A command that could not be carried out
    Rejected(String),
    Stopped(PlaybackStats),
}
