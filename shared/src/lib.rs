//! Deterministic building blocks for the danmaku encounter engine.
//!
//! Nothing in here owns session state: geometry, pattern emission, the score
//! ledger and the difficulty tables are all usable on their own.

pub mod config;
pub mod geometry;
pub mod ledger;
pub mod patterns;
pub mod rng;

pub use config::{ConfigError, Difficulty, DifficultyTables, EncounterConfig};
pub use geometry::{Playfield, Rect};
pub use ledger::{LedgerSnapshot, ScoreLedger};
pub use patterns::{BulletClass, PatternShape, PatternSpec, PatternState, ProjectileSpawn};
