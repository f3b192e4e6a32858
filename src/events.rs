//! Discrete notifications for sound and UI layers.
//!
//! The core never waits on a listener. Every event of a tick is also
//! returned in that tick's report.

use danmaku_shared::config::ItemKind;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::actors::{ActorId, ActorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreEvent {
    EnemyHit {
        actor: ActorId,
        kind: ActorKind,
        remaining: f32,
    },
    EnemyDestroyed {
        actor: ActorId,
        kind: ActorKind,
        position: Vec2,
    },
    PlayerHit {
        lives_left: u32,
    },
    ItemCollected {
        kind: ItemKind,
    },
    Graze {
        total: u32,
    },
    SpellCardActivated {
        actor: ActorId,
        name: SmolStr,
    },
    SpellCardCaptured {
        actor: ActorId,
        name: SmolStr,
        bonus: u64,
        /// Awarded because the boss fell during its own card.
        retroactive: bool,
    },
    SpellCardFailed {
        actor: ActorId,
        name: SmolStr,
    },
    PhaseChanged {
        actor: ActorId,
        phase: usize,
    },
    BossEntered {
        actor: ActorId,
        name: SmolStr,
    },
    BossDefeated {
        actor: ActorId,
        name: SmolStr,
    },
    BombActivated {
        bombs_left: u32,
        cleared: usize,
    },
    StageCleared,
    StageFailed,
}

/// Subscriber for [`CoreEvent`]s.
pub trait EventListener {
    fn on_event(&mut self, tick: u64, event: &CoreEvent);
}

impl<F: FnMut(u64, &CoreEvent)> EventListener for F {
    fn on_event(&mut self, tick: u64, event: &CoreEvent) {
        self(tick, event)
    }
}
