use std::io::BufRead;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A single mutating request against the engine.
///
/// Hosts serialize every action through this type so that a replayed command
/// list reproduces the same state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Click,
    Sell {
        amount: f64,
    },
    BuyBuilding {
        id: String,
        #[serde(default = "single")]
        amount: u32,
    },
    BuyUpgrade {
        id: String,
    },
    Tick {
        now_ms: u64,
    },
}

fn single() -> u32 {
    1
}

impl Command {
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line).with_context(|| format!("invalid command {line:?}"))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Click => "click",
            Command::Sell { .. } => "sell",
            Command::BuyBuilding { .. } => "buy_building",
            Command::BuyUpgrade { .. } => "buy_upgrade",
            Command::Tick { .. } => "tick",
        }
    }
}

/// Read one command per line. Blank lines and `#` comments are skipped.
pub fn parse_script<R: BufRead>(reader: R) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read script line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let command =
            Command::from_json(trimmed).with_context(|| format!("script line {}", index + 1))?;
        commands.push(command);
    }
    Ok(commands)
}
