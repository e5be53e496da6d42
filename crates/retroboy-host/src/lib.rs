// Native host for the audio-clock scheduler: cpal output, deadline timers and
// a command-driven runtime thread
pub mod audio;
pub mod command;
pub mod config;
pub mod event;
pub mod runtime;
pub mod timers;
pub mod tone;

// Re-exports
pub use command::HostCommand;
pub use config::HostConfig;
pub use event::HostEvent;
pub use runtime::{HostHandle, HostRuntime};
pub use tone::{ToneConfig, ToneCore};
