//! Convenient imports for hosts driving the scheduler
//!
//! Pull in everything commonly needed in one line:
//! ```rust
//! use retroboy_sync::prelude::*;
//! ```

// Main scheduler API
pub use crate::sync::controller::{PlaybackController, ResetOutcome};
pub use crate::sync::session::{PlaybackStatus, SessionId};
pub use crate::sync::stats::PlaybackStats;
pub use crate::sync::timer::{StepTimer, StepTimers};

// Traits a host implements
pub use crate::emulation::EmulationCore;
pub use crate::sink::AudioSink;

// Boundary types
pub use crate::emulation::{EmulatorSettings, Mode, RomMetadata, SampleBuffer, SampleCallback};

// Errors and configuration
pub use crate::config::SyncConfig;
pub use crate::error::{CoreError, PlaybackError, SinkError};
