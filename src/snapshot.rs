//! Read-only view of a session for renderers and HUDs.

use danmaku_shared::config::ItemKind;
use danmaku_shared::ledger::LedgerSnapshot;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::actors::{Actor, ActorId, ActorKind, ActorState};
use crate::combat::Owner;
use crate::session::{EncounterSession, StageOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorView {
    pub id: ActorId,
    pub name: SmolStr,
    pub kind: ActorKind,
    pub position: Vec2,
    pub state: ActorState,
    pub spell_card: Option<SmolStr>,
    pub health: f32,
    pub max_health: f32,
    pub phase: usize,
    /// Health-bar ticks: fractions of max health where later phases end.
    pub phase_markers: Vec<f32>,
}

impl From<&Actor> for ActorView {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            name: actor.name.clone(),
            kind: actor.kind,
            position: actor.position,
            state: actor.state(),
            spell_card: actor.spell_card().map(|card| card.name.clone()),
            health: actor.health(),
            max_health: actor.max_health(),
            phase: actor.phase(),
            phase_markers: actor.phase_markers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    pub position: Vec2,
    pub sprite: SmolStr,
    pub owner: Owner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    pub position: Vec2,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub position: Vec2,
    pub focused: bool,
    pub invincible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub tick: u64,
    pub player: PlayerView,
    pub actors: Vec<ActorView>,
    pub projectiles: Vec<ProjectileView>,
    pub items: Vec<ItemView>,
    pub ledger: LedgerSnapshot,
    pub outcome: Option<StageOutcome>,
}

impl EncounterSession {
    pub fn snapshot(&self) -> RenderSnapshot {
        let player = self.player();
        let projectiles = self
            .player_projectiles()
            .iter()
            .chain(self.enemy_projectiles())
            .map(|p| ProjectileView {
                position: p.position,
                sprite: p.class.sprite.clone(),
                owner: p.owner,
            })
            .collect();

        RenderSnapshot {
            tick: self.tick_count(),
            player: PlayerView {
                position: player.position,
                focused: player.focused,
                invincible: player.is_invincible(),
            },
            actors: self.director().actors().iter().map(ActorView::from).collect(),
            projectiles,
            items: self
                .items()
                .iter()
                .map(|item| ItemView {
                    position: item.position,
                    kind: item.kind,
                })
                .collect(),
            ledger: self.ledger().snapshot(),
            outcome: self.outcome(),
        }
    }
}
