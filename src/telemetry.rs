//! Tracing bootstrap for the headless runner, plus an event log listener.

use anyhow::Result;
use tracing::{debug, info, trace};

use crate::events::{CoreEvent, EventListener};

/// Install a fmt subscriber. `filter` wins over `RUST_LOG`; the default is
/// `info`.
pub fn init_tracing(filter: Option<&str>) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()?;
    info!(target: "telemetry", "tracing initialized");
    Ok(())
}

/// Writes every core event to the log: noisy ones at trace, the rest at debug.
#[derive(Debug, Default)]
pub struct EventLog;

impl EventListener for EventLog {
    fn on_event(&mut self, tick: u64, event: &CoreEvent) {
        match event {
            CoreEvent::Graze { .. } | CoreEvent::EnemyHit { .. } => trace!(tick, ?event, "event"),
            _ => debug!(tick, ?event, "event"),
        }
    }
}
