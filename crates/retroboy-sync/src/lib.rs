// Audio-clock synchronized stepping for an externally supplied emulation core
pub mod config;
pub mod emulation;
pub mod error;
pub mod prelude;
pub mod sink;
pub mod sync;

// Re-exports
pub use config::SyncConfig;
pub use error::{CoreError, PlaybackError, SinkError};
pub use sync::controller::PlaybackController;

#[cfg(any(test, feature = "testing-utils"))]
pub mod test_utils;
