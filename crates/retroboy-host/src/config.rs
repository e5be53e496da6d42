use crate::tone::ToneConfig;
use anyhow::Context;
use retroboy_sync::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the native host reads at startup. Missing fields fall back to
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub sync: SyncConfig,
    pub settings: EmulatorSettings,
    pub tone: ToneConfig,
}

impl HostConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.sync.validate()?;
        self.tone.validate()?;
        if self.settings.audio_sample_rate == 0 {
            anyhow::bail!("settings.audio_sample_rate must be non-zero");
        }
        Ok(())
    }
}
