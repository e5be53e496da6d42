use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default safety margin before a scheduled buffer starts (milliseconds)
pub const DEFAULT_LOOKAHEAD_GAP_MS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Subtracted from the time left before a buffer starts, so the next step
    /// is requested while the current buffer is still queued.
    pub lookahead_gap_ms: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookahead_gap_ms: DEFAULT_LOOKAHEAD_GAP_MS,
        }
    }
}

impl SyncConfig {
    pub fn with_lookahead_gap(gap: Duration) -> Self {
        Self {
            lookahead_gap_ms: gap.as_secs_f64() * 1000.0,
        }
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if !self.lookahead_gap_ms.is_finite() || self.lookahead_gap_ms < 0.0 {
            return Err(PlaybackError::Config(format!(
                "lookahead_gap_ms must be a finite, non-negative number (got {})",
                self.lookahead_gap_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gap_is_fifteen_ms() {
        let config = SyncConfig::default();
        assert_eq!(config.lookahead_gap_ms, 15.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SyncConfig::default());

        let config: SyncConfig = serde_json::from_str(r#"{ "lookahead_gap_ms": 40 }"#).unwrap();
        assert_eq!(config.lookahead_gap_ms, 40.0);
    }

    #[test]
    fn rejects_negative_or_nan_gap() {
        let negative = SyncConfig {
            lookahead_gap_ms: -1.0,
        };
        assert!(matches!(negative.validate(), Err(PlaybackError::Config(_))));

        let nan = SyncConfig {
            lookahead_gap_ms: f64::NAN,
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn gap_from_duration() {
        let config = SyncConfig::with_lookahead_gap(Duration::from_millis(20));
        assert!((config.lookahead_gap_ms - 20.0).abs() < 1e-9);
    }
}
