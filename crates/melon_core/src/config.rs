use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Purchase and tick policies chosen by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reject purchases of locked buildings/upgrades and unmet requirements.
    pub enforce_unlocks: bool,
    /// Longest span of a single tick simulated at full rate; `None` is unbounded.
    pub max_step_ms: Option<u64>,
    /// Credit time beyond `max_step_ms` at `offline_progress_rate`.
    pub offline_progress_enabled: bool,
    pub offline_progress_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enforce_unlocks: true,
            max_step_ms: Some(60_000),
            offline_progress_enabled: false,
            offline_progress_rate: 0.5,
        }
    }
}

impl EngineConfig {
    /// Trust the caller: no unlock enforcement and no step cap.
    pub fn permissive() -> Self {
        Self {
            enforce_unlocks: false,
            max_step_ms: None,
            ..Self::default()
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open engine config {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader).context("invalid engine config json")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.offline_progress_rate),
            "offline_progress_rate {} must be within [0, 1]",
            self.offline_progress_rate
        );
        ensure!(
            self.max_step_ms != Some(0),
            "max_step_ms must be positive when set"
        );
        Ok(())
    }
}
