//! Deterministic bullet-hell encounter engine.
//!
//! Drive an [`EncounterSession`] one tick at a time with a [`FrameInput`];
//! read back a [`RenderSnapshot`] and the tick's [`CoreEvent`]s.

pub mod actors;
pub mod autopilot;
pub mod combat;
pub mod director;
pub mod events;
pub mod input;
pub mod session;
pub mod snapshot;
pub mod telemetry;

pub use danmaku_shared as shared;

pub use events::{CoreEvent, EventListener};
pub use input::FrameInput;
pub use session::{EncounterSession, SessionError, StageOutcome, TickReport};
pub use snapshot::RenderSnapshot;
