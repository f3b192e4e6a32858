//! Enemies and bosses.
//!
//! A single [`Actor`] type covers both: trash mobs are one-phase actors
//! without spell cards, bosses carry their phase table. The per-tick state
//! machine lives in [`machine`].

mod machine;

pub use machine::ActorContext;

use std::collections::HashMap;

use danmaku_shared::config::{
    AttackSchedule, BossConfig, ItemKind, NonSpellConfig, SpellCardConfig, TrashConfig,
};
use danmaku_shared::geometry::{Playfield, Rect};
use danmaku_shared::patterns::PatternState;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::combat::{Owner, ProjectileField};

pub type ActorId = u64;

/// Actor constants that are not per-difficulty.
pub mod defaults {
    /// Bosses sway between these insets from the side walls.
    pub const DRIFT_MARGIN: f32 = 100.0;
    /// Threshold products this close to an integer snap onto it.
    pub const THRESHOLD_SNAP: f32 = 1e-3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    Trash,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub has_phases: bool,
    pub has_spell_cards: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorState {
    Entering,
    NonSpellActive,
    SpellIntro,
    SpellActive,
    Defeated,
}

/// Result of a single damage application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Not targetable (entering, defeated or already at zero).
    Ignored,
    Hit { remaining: f32 },
    /// This hit took the last point of health.
    Killed,
}

/// A phase with its thresholds resolved to absolute health.
#[derive(Debug, Clone)]
pub struct ActorPhase {
    pub end_health: f32,
    pub spell_trigger: Option<f32>,
    pub non_spell: NonSpellConfig,
    pub spell: Option<SpellCardConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSpellCard {
    pub name: SmolStr,
    /// Phase index (0-based) the card was triggered in.
    pub phase: usize,
    pub started_at: u64,
    pub intro_ticks: u32,
    pub duration: u32,
    pub elapsed: u32,
    pub bonus: u64,
    pub survived: bool,
    pub bonus_awarded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternSlot {
    NonSpell(usize),
    Spell,
}

/// Rotation memory per (attack slot, volley entry).
pub type PatternMemory = HashMap<(PatternSlot, usize), PatternState>;

#[derive(Debug, Clone, Default)]
pub struct AttackTimers {
    pub cooldown: u32,
    pub attack_index: usize,
    pub schedule_ticks: u32,
    pub spell_cooldown: u32,
    pub intro_ticks: u32,
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub name: SmolStr,
    pub kind: ActorKind,
    pub capabilities: Capabilities,
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    health: f32,
    max_health: f32,
    phase: usize,
    phases: Vec<ActorPhase>,
    state: ActorState,
    entry_target: Vec2,
    entry_speed: f32,
    drift_speed: f32,
    spell: Option<ActiveSpellCard>,
    timers: AttackTimers,
    memory: PatternMemory,
    pub projectiles: ProjectileField,
    defeat_ticks: u32,
    defeat_effect_ticks: u32,
    pub drops: Vec<ItemKind>,
    pub rewards_dropped: bool,
}

fn threshold(max_health: f32, fraction: f32) -> f32 {
    let value = max_health * fraction;
    if (value - value.round()).abs() < defaults::THRESHOLD_SNAP {
        value.round()
    } else {
        value
    }
}

impl Actor {
    /// A boss placed just above the field, entering toward its target.
    ///
    /// Expects a config that passed [`BossConfig::validate`]. An empty phase
    /// table yields a boss that never attacks.
    pub fn boss(id: ActorId, config: &BossConfig) -> Self {
        let max_health = config.health;
        let phases: Vec<ActorPhase> = config
            .phases
            .iter()
            .map(|phase| ActorPhase {
                end_health: threshold(max_health, phase.end_fraction),
                spell_trigger: phase
                    .spell
                    .as_ref()
                    .map(|spell| threshold(max_health, spell.trigger_fraction)),
                non_spell: phase.non_spell.clone(),
                spell: phase.spell.clone(),
            })
            .collect();
        let capabilities = Capabilities {
            has_phases: phases.len() > 1,
            has_spell_cards: phases.iter().any(|p| p.spell.is_some()),
        };
        let spawn = Vec2::new(config.entry_target.x, -config.size.y * 0.5);

        Self {
            id,
            name: config.name.clone(),
            kind: ActorKind::Boss,
            capabilities,
            position: spawn,
            velocity: Vec2::ZERO,
            size: config.size,
            health: max_health,
            max_health,
            phase: 0,
            phases,
            state: ActorState::Entering,
            entry_target: config.entry_target,
            entry_speed: config.entry_speed,
            drift_speed: config.drift_speed,
            spell: None,
            timers: AttackTimers::default(),
            memory: PatternMemory::new(),
            projectiles: ProjectileField::new(Owner::Enemy),
            defeat_ticks: 0,
            defeat_effect_ticks: config.defeat_effect_ticks,
            drops: config.drops.clone(),
            rewards_dropped: false,
        }
    }

    /// A trash mob at `x`, already active and falling at its configured speed.
    pub fn trash(id: ActorId, config: &TrashConfig, x: f32) -> Self {
        let position = Vec2::new(x, config.spawn_y);
        let mut actor = Self {
            id,
            name: config.name.clone(),
            kind: ActorKind::Trash,
            capabilities: Capabilities::default(),
            position,
            velocity: Vec2::new(0.0, config.speed),
            size: config.size,
            health: config.health,
            max_health: config.health,
            phase: 0,
            phases: vec![ActorPhase {
                end_health: 0.0,
                spell_trigger: None,
                non_spell: NonSpellConfig {
                    attacks: vec![config.attack.clone()],
                    schedule: AttackSchedule::Fixed,
                },
                spell: None,
            }],
            state: ActorState::NonSpellActive,
            entry_target: position,
            entry_speed: 0.0,
            drift_speed: 0.0,
            spell: None,
            timers: AttackTimers::default(),
            memory: PatternMemory::new(),
            projectiles: ProjectileField::new(Owner::Enemy),
            defeat_ticks: 0,
            defeat_effect_ticks: 0,
            drops: Vec::new(),
            rewards_dropped: false,
        };
        actor.reset_non_spell_timers();
        actor
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.position, self.size)
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Current phase, starting at 1.
    pub fn phase(&self) -> usize {
        self.phase + 1
    }

    pub fn last_phase(&self) -> usize {
        self.phases.len()
    }

    pub fn phases(&self) -> &[ActorPhase] {
        &self.phases
    }

    pub fn state(&self) -> ActorState {
        self.state
    }

    pub fn spell_card(&self) -> Option<&ActiveSpellCard> {
        self.spell.as_ref()
    }

    pub fn entry_target(&self) -> Vec2 {
        self.entry_target
    }

    /// True once the entry has finished and until defeat. Only active
    /// actors take damage or attack.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, ActorState::Entering | ActorState::Defeated)
    }

    pub fn is_defeated(&self) -> bool {
        self.state == ActorState::Defeated
    }

    /// Defeated and past the cosmetic defeat delay.
    pub fn is_finished(&self) -> bool {
        self.is_defeated() && self.defeat_ticks >= self.defeat_effect_ticks
    }

    /// Health fractions of the phase ends still ahead, for health-bar markers.
    pub fn phase_markers(&self) -> Vec<f32> {
        if self.max_health <= 0.0 {
            return Vec::new();
        }
        self.phases[self.phase..]
            .iter()
            .map(|p| p.end_health / self.max_health)
            .filter(|f| *f > 0.0)
            .collect()
    }

    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.is_active() || self.health <= 0.0 {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount.max(0.0)).clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            DamageOutcome::Killed
        } else {
            DamageOutcome::Hit {
                remaining: self.health,
            }
        }
    }

    /// Set health directly, clamped to `[0, max]`. Scripted damage and tests.
    pub fn set_health(&mut self, health: f32) {
        self.health = health.clamp(0.0, self.max_health);
    }

    fn reset_non_spell_timers(&mut self) {
        let first = self
            .phases
            .get(self.phase)
            .and_then(|p| p.non_spell.attacks.first())
            .map_or(0, |a| a.cooldown);
        self.timers = AttackTimers {
            cooldown: first,
            ..AttackTimers::default()
        };
    }

    /// Sway bounds for drifting bosses.
    fn drift_bounds(&self, playfield: &Playfield) -> (f32, f32) {
        let inset = self.size.x * 0.5 + defaults::DRIFT_MARGIN;
        let (lo, hi) = (inset, playfield.width - inset);
        if lo > hi {
            (playfield.width * 0.5, playfield.width * 0.5)
        } else {
            (lo, hi)
        }
    }
}
