//! Per-tick actor state machine.
//!
//! Order within one tick: entry movement, health resolution (phase
//! transitions, then defeat), then the behaviour of the current state.
//! Phase transitions always win over a spell trigger on the same tick.

use danmaku_shared::config::{AttackConfig, AttackSchedule};
use danmaku_shared::geometry::Playfield;
use danmaku_shared::ledger::ScoreLedger;
use danmaku_shared::patterns::emit;
use glam::Vec2;
use rand::rngs::StdRng;
use tracing::{debug, error, info};

use super::{ActiveSpellCard, Actor, ActorKind, ActorState, PatternMemory, PatternSlot};
use crate::combat::ProjectileField;
use crate::events::CoreEvent;

/// Everything an actor may touch while it ticks.
pub struct ActorContext<'a> {
    pub tick: u64,
    /// Aim target for aimed patterns.
    pub player: Vec2,
    pub playfield: &'a Playfield,
    pub rng: &'a mut StdRng,
    pub ledger: &'a mut ScoreLedger,
    pub events: &'a mut Vec<CoreEvent>,
}

/// Fire every pattern of one attack into `field`.
fn fire(
    attack: &AttackConfig,
    slot: PatternSlot,
    origin: Vec2,
    memory: &mut PatternMemory,
    field: &mut ProjectileField,
    ctx: &mut ActorContext<'_>,
) {
    for (i, spec) in attack.volley.iter().enumerate() {
        let state = memory.entry((slot, i)).or_default();
        field.spawn(emit(origin, Some(ctx.player), spec, state, ctx.rng));
    }
}

impl Actor {
    pub fn tick(&mut self, ctx: &mut ActorContext<'_>) {
        match self.state {
            ActorState::Defeated => {
                self.defeat_ticks = self.defeat_ticks.saturating_add(1);
                return;
            }
            ActorState::Entering => {
                self.step_entry();
                return;
            }
            _ => {}
        }

        self.health = self.health.clamp(0.0, self.max_health);
        self.resolve_health(ctx);

        match self.state {
            ActorState::NonSpellActive => {
                if !self.try_trigger_spell(ctx) {
                    self.run_non_spell(ctx);
                }
            }
            ActorState::SpellIntro => self.run_spell_intro(),
            ActorState::SpellActive => self.run_spell(ctx),
            ActorState::Entering | ActorState::Defeated => return,
        }

        self.step_motion(ctx.playfield);
    }

    // ============================================================================
    // MOVEMENT
    // ============================================================================

    /// Move toward the entry target; snap onto it instead of overshooting.
    fn step_entry(&mut self) {
        let to_target = self.entry_target - self.position;
        if to_target.length() <= self.entry_speed {
            self.position = self.entry_target;
            self.state = ActorState::NonSpellActive;
            self.velocity = Vec2::new(self.drift_speed, 0.0);
            self.reset_non_spell_timers();
            info!(actor = self.id, name = %self.name, "boss in position");
        } else {
            self.position += to_target.normalize() * self.entry_speed;
        }
    }

    fn step_motion(&mut self, playfield: &Playfield) {
        self.position += self.velocity;
        if self.kind == ActorKind::Boss && self.drift_speed > 0.0 {
            let (lo, hi) = self.drift_bounds(playfield);
            if self.position.x <= lo {
                self.position.x = lo;
                self.velocity.x = self.drift_speed;
            } else if self.position.x >= hi {
                self.position.x = hi;
                self.velocity.x = -self.drift_speed;
            }
        }
    }

    // ============================================================================
    // HEALTH RESOLUTION
    // ============================================================================

    /// Apply every phase transition the current health has earned, one at a
    /// time, then check for defeat.
    fn resolve_health(&mut self, ctx: &mut ActorContext<'_>) {
        let last = self.phases.len().saturating_sub(1);
        while self.capabilities.has_phases && self.phase < last && self.health <= self.phases[self.phase].end_health {
            self.end_spell_without_bonus(ctx);
            self.phase += 1;
            self.memory.clear();
            self.reset_non_spell_timers();
            self.state = ActorState::NonSpellActive;
            ctx.events.push(CoreEvent::PhaseChanged {
                actor: self.id,
                phase: self.phase(),
            });
            info!(actor = self.id, name = %self.name, phase = self.phase(), health = self.health, "phase changed");
        }

        if self.health > 0.0 {
            return;
        }

        let own_card = self.state == ActorState::SpellActive
            && self.spell.as_ref().is_some_and(|card| card.phase == self.phase);
        if own_card {
            self.award_spell_bonus(ctx, true);
        } else {
            self.end_spell_without_bonus(ctx);
        }

        self.state = ActorState::Defeated;
        self.velocity = Vec2::ZERO;
        self.defeat_ticks = 0;
        ctx.events.push(CoreEvent::EnemyDestroyed {
            actor: self.id,
            kind: self.kind,
            position: self.position,
        });
        match self.kind {
            ActorKind::Boss => {
                ctx.events.push(CoreEvent::BossDefeated {
                    actor: self.id,
                    name: self.name.clone(),
                });
                info!(actor = self.id, name = %self.name, tick = ctx.tick, "boss defeated");
            }
            ActorKind::Trash => debug!(actor = self.id, "trash destroyed"),
        }
    }

    // ============================================================================
    // SPELL CARDS
    // ============================================================================

    fn try_trigger_spell(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        if !self.capabilities.has_spell_cards {
            return false;
        }
        let Some(phase) = self.phases.get(self.phase) else {
            return false;
        };
        let (Some(trigger), Some(spell)) = (phase.spell_trigger, phase.spell.as_ref()) else {
            return false;
        };
        if !(self.health <= trigger && self.health > phase.end_health) {
            return false;
        }

        self.spell = Some(ActiveSpellCard {
            name: spell.name.clone(),
            phase: self.phase,
            started_at: ctx.tick,
            intro_ticks: spell.intro_ticks,
            duration: spell.duration,
            elapsed: 0,
            bonus: spell.bonus,
            survived: false,
            bonus_awarded: false,
        });
        self.timers.intro_ticks = 0;
        self.state = ActorState::SpellIntro;
        ctx.events.push(CoreEvent::SpellCardActivated {
            actor: self.id,
            name: spell.name.clone(),
        });
        info!(actor = self.id, card = %spell.name, health = self.health, "spell card declared");
        true
    }

    fn run_spell_intro(&mut self) {
        let intro = self.spell.as_ref().map_or(0, |card| card.intro_ticks);
        self.timers.intro_ticks += 1;
        if self.timers.intro_ticks >= intro {
            self.state = ActorState::SpellActive;
            self.timers.spell_cooldown = 0;
        }
    }

    fn run_spell(&mut self, ctx: &mut ActorContext<'_>) {
        let Some(spell) = self.phases.get(self.phase).and_then(|p| p.spell.as_ref()) else {
            error!(actor = self.id, "spell active in a phase without a spell card");
            debug_assert!(false, "spell active without a card");
            self.state = ActorState::NonSpellActive;
            return;
        };

        if self.timers.spell_cooldown == 0 {
            fire(
                &spell.attack,
                PatternSlot::Spell,
                self.position,
                &mut self.memory,
                &mut self.projectiles,
                ctx,
            );
            self.timers.spell_cooldown = spell.attack.cooldown;
        }
        self.timers.spell_cooldown = self.timers.spell_cooldown.saturating_sub(1);

        let Some(card) = self.spell.as_mut() else {
            self.state = ActorState::NonSpellActive;
            return;
        };
        card.elapsed += 1;
        if card.elapsed >= card.duration {
            card.survived = true;
            self.award_spell_bonus(ctx, false);
            self.spell = None;
            self.state = ActorState::NonSpellActive;
            self.reset_non_spell_timers();
        }
    }

    /// Pay out the active card's bonus. At most once per activation.
    fn award_spell_bonus(&mut self, ctx: &mut ActorContext<'_>, retroactive: bool) {
        let Some(card) = self.spell.as_mut() else {
            return;
        };
        if card.bonus_awarded {
            error!(actor = self.id, card = %card.name, "spell bonus already paid");
            debug_assert!(false, "duplicate spell bonus");
            return;
        }
        card.bonus_awarded = true;
        ctx.ledger.award_spell_bonus(card.bonus);
        ctx.events.push(CoreEvent::SpellCardCaptured {
            actor: self.id,
            name: card.name.clone(),
            bonus: card.bonus,
            retroactive,
        });
        info!(actor = self.id, card = %card.name, bonus = card.bonus, retroactive, "spell card captured");
    }

    fn end_spell_without_bonus(&mut self, ctx: &mut ActorContext<'_>) {
        let Some(card) = self.spell.take() else {
            return;
        };
        if card.bonus_awarded {
            return;
        }
        ctx.events.push(CoreEvent::SpellCardFailed {
            actor: self.id,
            name: card.name.clone(),
        });
        info!(actor = self.id, card = %card.name, "spell card broken");
    }

    // ============================================================================
    // NON-SPELL ATTACKS
    // ============================================================================

    fn run_non_spell(&mut self, ctx: &mut ActorContext<'_>) {
        let Some(plan) = self.phases.get(self.phase).map(|p| &p.non_spell) else {
            return;
        };
        let count = plan.attacks.len();
        if count == 0 {
            return;
        }

        if let AttackSchedule::Timed { switch_after } = plan.schedule {
            self.timers.schedule_ticks += 1;
            if self.timers.schedule_ticks >= switch_after {
                self.timers.schedule_ticks = 0;
                self.timers.attack_index = (self.timers.attack_index + 1) % count;
                self.timers.cooldown = self.timers.cooldown.min(plan.attacks[self.timers.attack_index].cooldown);
            }
        }

        let index = self.timers.attack_index.min(count - 1);
        if self.timers.cooldown == 0 {
            let attack = &plan.attacks[index];
            fire(
                attack,
                PatternSlot::NonSpell(index),
                self.position,
                &mut self.memory,
                &mut self.projectiles,
                ctx,
            );
            self.timers.cooldown = attack.cooldown;
            if plan.schedule == AttackSchedule::Alternate {
                self.timers.attack_index = (index + 1) % count;
            }
        }
        self.timers.cooldown = self.timers.cooldown.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::DamageOutcome;
    use danmaku_shared::config::{Difficulty, presets};
    use rand::SeedableRng;

    struct Harness {
        rng: StdRng,
        ledger: ScoreLedger,
        events: Vec<CoreEvent>,
        playfield: Playfield,
        tick: u64,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                rng: StdRng::seed_from_u64(11),
                ledger: ScoreLedger::default(),
                events: Vec::new(),
                playfield: presets::PLAYFIELD,
                tick: 0,
            }
        }

        fn step(&mut self, actor: &mut Actor) {
            self.tick += 1;
            let mut ctx = ActorContext {
                tick: self.tick,
                player: Vec2::new(400.0, 540.0),
                playfield: &self.playfield,
                rng: &mut self.rng,
                ledger: &mut self.ledger,
                events: &mut self.events,
            };
            actor.tick(&mut ctx);
        }

        fn enter(&mut self, actor: &mut Actor) {
            while actor.state() == ActorState::Entering {
                self.step(actor);
                assert!(self.tick < 10_000);
            }
        }
    }

    #[test]
    fn entry_lands_exactly_on_target_without_attacking() {
        let mut h = Harness::new();
        let mut boss = Actor::boss(1, &presets::kaguya(Difficulty::Normal));
        let target = boss.entry_target();
        while boss.state() == ActorState::Entering {
            assert!(boss.position.y <= target.y);
            assert_eq!(boss.take_damage(50.0), DamageOutcome::Ignored);
            h.step(&mut boss);
        }
        assert_eq!(boss.position, target);
        assert_eq!(boss.state(), ActorState::NonSpellActive);
        assert!(boss.projectiles.is_empty());
        assert_eq!(boss.health(), boss.max_health());
    }

    #[test]
    fn one_shot_kill_walks_through_every_phase() {
        let mut h = Harness::new();
        let mut boss = Actor::boss(1, &presets::kaguya(Difficulty::Normal));
        h.enter(&mut boss);

        boss.set_health(0.0);
        h.step(&mut boss);

        let phases: Vec<usize> = h
            .events
            .iter()
            .filter_map(|e| match e {
                CoreEvent::PhaseChanged { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect();
        assert_eq!(phases, vec![2, 3]);
        assert_eq!(boss.phase(), 3);
        assert!(boss.is_defeated());
        assert_eq!(h.ledger.score(), 0);
    }

    #[test]
    fn defeat_during_own_final_card_pays_once() {
        let mut h = Harness::new();
        let mut boss = Actor::boss(1, &presets::reisen(Difficulty::Normal));
        h.enter(&mut boss);

        boss.set_health(40.0);
        h.step(&mut boss);
        assert_eq!(boss.state(), ActorState::SpellIntro);
        while boss.state() == ActorState::SpellIntro {
            h.step(&mut boss);
        }
        assert_eq!(boss.state(), ActorState::SpellActive);

        boss.set_health(0.0);
        h.step(&mut boss);
        assert!(boss.is_defeated());
        assert_eq!(h.ledger.score(), 50_000);

        let captures = h
            .events
            .iter()
            .filter(|e| matches!(e, CoreEvent::SpellCardCaptured { retroactive: true, .. }))
            .count();
        assert_eq!(captures, 1);
    }

    #[test]
    fn survived_card_is_declared_again_and_pays_each_time() {
        let mut h = Harness::new();
        let mut boss = Actor::boss(1, &presets::reisen(Difficulty::Normal));
        h.enter(&mut boss);
        boss.set_health(40.0);

        while h.ledger.snapshot().spell_bonuses < 1 {
            h.step(&mut boss);
            assert!(h.tick < 5_000);
        }
        assert_eq!(boss.state(), ActorState::NonSpellActive);
        assert!(boss.spell_card().is_none());
        assert_eq!(h.ledger.score(), 50_000);

        // Still between trigger and phase end, so the card comes straight back.
        h.step(&mut boss);
        assert_eq!(boss.state(), ActorState::SpellIntro);

        while h.ledger.snapshot().spell_bonuses < 2 {
            h.step(&mut boss);
            assert!(h.tick < 10_000);
        }
        assert_eq!(h.ledger.score(), 100_000);

        let activations = h
            .events
            .iter()
            .filter(|e| matches!(e, CoreEvent::SpellCardActivated { .. }))
            .count();
        let captures = h
            .events
            .iter()
            .filter(|e| matches!(e, CoreEvent::SpellCardCaptured { retroactive: false, .. }))
            .count();
        assert_eq!(activations, 2);
        assert_eq!(captures, 2);
    }

    #[test]
    fn boss_without_phases_is_inert_but_killable() {
        let mut h = Harness::new();
        let mut config = presets::reisen(Difficulty::Normal);
        config.phases.clear();
        let mut boss = Actor::boss(1, &config);
        h.enter(&mut boss);
        for _ in 0..120 {
            h.step(&mut boss);
        }
        assert!(boss.projectiles.is_empty());
        assert!(boss.phase_markers().is_empty());

        boss.set_health(0.0);
        h.step(&mut boss);
        assert!(boss.is_defeated());
    }

    #[test]
    fn pattern_memory_resets_on_phase_change() {
        let mut h = Harness::new();
        let mut boss = Actor::boss(1, &presets::kaguya(Difficulty::Normal));
        h.enter(&mut boss);
        for _ in 0..200 {
            h.step(&mut boss);
        }
        assert!(!boss.memory.is_empty());
        boss.set_health(374.0);
        h.step(&mut boss);
        assert_eq!(boss.phase(), 2);
        assert!(boss.memory.is_empty());
    }

    #[test]
    fn alternate_schedule_cycles_attacks() {
        let mut h = Harness::new();
        let mut config = presets::reisen(Difficulty::Normal);
        config.phases[0].non_spell.schedule = AttackSchedule::Alternate;
        let mut boss = Actor::boss(1, &config);
        h.enter(&mut boss);

        // Cooldowns are 60 then 120; both attacks have fired by tick 181.
        for _ in 0..200 {
            h.step(&mut boss);
        }
        assert!(boss.memory.contains_key(&(PatternSlot::NonSpell(0), 0)));
        assert!(boss.memory.contains_key(&(PatternSlot::NonSpell(1), 0)));
    }
}
