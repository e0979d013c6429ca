//! Deterministic melon economy engine.
//!
//! A [`GameEngine`] owns one [`GameState`] and exposes the five mutating
//! actions (click, sell, buy building, buy upgrade, tick). Hosts supply
//! wall-clock timestamps; the engine never reads the clock itself.

pub mod building;
pub mod catalog;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod io;
pub mod market;
pub mod phase;
pub mod state;
#[cfg(any(test, feature = "proptest-support"))]
pub mod strategy;
pub mod upgrade;

pub use catalog::{Catalog, CatalogError};
pub use command::Command;
pub use config::EngineConfig;
pub use engine::{GameEngine, Outcome, Rejection};
pub use io::frame::Snapshot;
pub use phase::Phase;
pub use state::GameState;
