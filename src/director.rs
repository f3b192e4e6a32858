//! Encounter timeline: trash spawns, the boss queue, rewards and removal.

use danmaku_shared::config::{BossConfig, DropWeights, EncounterConfig, ItemKind};
use danmaku_shared::geometry::Playfield;
use danmaku_shared::ledger::ScoreLedger;
use danmaku_shared::rng::{deterministic_roll, weighted_index};
use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::actors::{Actor, ActorContext, ActorId, ActorKind};
use crate::combat::{ItemField, ProjectileField};
use crate::events::CoreEvent;

/// Roll sequence offsets so chance, type and scatter draws never collide.
mod roll_stream {
    pub const DROP_CHANCE: u32 = 0;
    pub const DROP_KIND: u32 = 1;
    pub const SCATTER: u32 = 2;
}

/// Session-level inputs the director reads each tick.
pub struct DirectorContext<'a> {
    pub tick: u64,
    pub seed: u64,
    pub player: Vec2,
    pub rng: &'a mut StdRng,
    pub ledger: &'a mut ScoreLedger,
    pub items: &'a mut ItemField,
    /// Inherits the projectiles of removed actors.
    pub stray: &'a mut ProjectileField,
    pub events: &'a mut Vec<CoreEvent>,
}

#[derive(Debug, Clone)]
pub struct EncounterDirector {
    elapsed: u64,
    next_actor_id: ActorId,
    actors: Vec<Actor>,
    next_boss: usize,
    /// Elapsed tick at which the last boss was removed.
    last_boss_removed: Option<u64>,
    trash_timer: u32,
    kills: u32,
    cleared: bool,
}

impl Default for EncounterDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl EncounterDirector {
    pub fn new() -> Self {
        Self {
            elapsed: 0,
            next_actor_id: 1,
            actors: Vec::new(),
            next_boss: 0,
            last_boss_removed: None,
            trash_timer: 0,
            kills: 0,
            cleared: false,
        }
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actors_mut(&mut self) -> &mut [Actor] {
        &mut self.actors
    }

    pub fn is_stage_cleared(&self) -> bool {
        self.cleared
    }

    /// A boss is on the field, entering, fighting or playing its defeat effect.
    pub fn boss_in_play(&self) -> bool {
        self.actors.iter().any(|a| a.kind == ActorKind::Boss)
    }

    /// Between one boss's removal and the next one's entrance.
    pub fn in_boss_gap(&self, config: &EncounterConfig) -> bool {
        self.last_boss_removed.is_some() && self.next_boss < config.bosses.len()
    }

    pub fn trash_suppressed(&self, config: &EncounterConfig) -> bool {
        self.boss_in_play() || self.in_boss_gap(config)
    }

    /// Bosses still waiting for their entrance.
    pub fn bosses_remaining(&self, config: &EncounterConfig) -> usize {
        config.bosses.len().saturating_sub(self.next_boss)
    }

    /// Advance the timeline one tick: entrances and trash spawns, every
    /// actor's state machine, then rewards and removals.
    pub fn tick(&mut self, config: &EncounterConfig, ctx: &mut DirectorContext<'_>) {
        if self.cleared {
            return;
        }
        self.elapsed += 1;

        self.schedule_boss(config, ctx);
        self.schedule_trash(config, ctx);

        let mut actor_ctx = ActorContext {
            tick: ctx.tick,
            player: ctx.player,
            playfield: &config.playfield,
            rng: &mut *ctx.rng,
            ledger: &mut *ctx.ledger,
            events: &mut *ctx.events,
        };
        for actor in &mut self.actors {
            actor.tick(&mut actor_ctx);
        }

        self.drop_rewards(config, ctx);
        self.remove_finished(config, ctx);
    }

    fn schedule_boss(&mut self, config: &EncounterConfig, ctx: &mut DirectorContext<'_>) {
        if self.boss_in_play() {
            return;
        }
        let Some(boss) = config.bosses.get(self.next_boss) else {
            return;
        };
        if !self.entrance_open(boss, ctx.ledger.score()) {
            return;
        }

        let id = self.allocate_id();
        self.actors.push(Actor::boss(id, boss));
        self.next_boss += 1;
        ctx.events.push(CoreEvent::BossEntered {
            actor: id,
            name: boss.name.clone(),
        });
        info!(actor = id, name = %boss.name, tick = ctx.tick, "boss entering");
    }

    fn entrance_open(&self, boss: &BossConfig, score: u64) -> bool {
        let gate = &boss.entrance;
        let gap_done = self
            .last_boss_removed
            .is_none_or(|at| self.elapsed.saturating_sub(at) >= u64::from(gate.gap_ticks));
        if !gap_done {
            return false;
        }
        match (gate.after_ticks, gate.min_score) {
            (None, None) => true,
            (after, min) => {
                after.is_some_and(|t| self.elapsed >= t) || min.is_some_and(|s| score >= s)
            }
        }
    }

    fn schedule_trash(&mut self, config: &EncounterConfig, ctx: &mut DirectorContext<'_>) {
        if self.trash_suppressed(config) {
            return;
        }
        self.trash_timer += 1;
        if self.trash_timer < config.trash.spawn_cooldown {
            return;
        }
        self.trash_timer = 0;

        let x = spawn_x(&config.playfield, config.trash.spawn_margin, ctx.rng);
        let id = self.allocate_id();
        self.actors.push(Actor::trash(id, &config.trash, x));
        debug!(actor = id, x, tick = ctx.tick, "trash spawned");
    }

    fn drop_rewards(&mut self, config: &EncounterConfig, ctx: &mut DirectorContext<'_>) {
        for actor in self.actors.iter_mut().filter(|a| a.is_defeated() && !a.rewards_dropped) {
            actor.rewards_dropped = true;
            let drops = match actor.kind {
                ActorKind::Boss => actor.drops.clone(),
                ActorKind::Trash => {
                    let seq = self.kills.wrapping_mul(4);
                    self.kills += 1;
                    trash_drop(
                        config.trash.drop_chance,
                        &config.trash.drop_weights,
                        deterministic_roll(ctx.seed, actor.id, seq + roll_stream::DROP_CHANCE),
                        deterministic_roll(ctx.seed, actor.id, seq + roll_stream::DROP_KIND),
                    )
                    .into_iter()
                    .collect()
                }
            };

            for (i, kind) in drops.into_iter().enumerate() {
                let salt = roll_stream::SCATTER + 2 * i as u32;
                let jitter = Vec2::new(
                    deterministic_roll(ctx.seed ^ 0x5ca7, actor.id, salt) - 0.5,
                    deterministic_roll(ctx.seed ^ 0x5ca7, actor.id, salt + 1) - 0.5,
                );
                ctx.items.spawn(kind, actor.position + jitter * config.items.scatter);
                debug!(actor = actor.id, ?kind, "item dropped");
            }
        }
    }

    fn remove_finished(&mut self, config: &EncounterConfig, ctx: &mut DirectorContext<'_>) {
        let playfield = config.playfield;
        let mut boss_removed = false;
        let mut i = 0;
        while i < self.actors.len() {
            let actor = &self.actors[i];
            let escaped = actor.kind == ActorKind::Trash && !actor.is_defeated() && has_escaped(&playfield, actor);
            if !(actor.is_finished() || escaped) {
                i += 1;
                continue;
            }
            let mut actor = self.actors.remove(i);
            ctx.stray.absorb(&mut actor.projectiles);
            if actor.kind == ActorKind::Boss {
                boss_removed = true;
            }
            if escaped {
                debug!(actor = actor.id, "trash left the field");
            }
        }

        if boss_removed {
            self.last_boss_removed = Some(self.elapsed);
            if self.next_boss >= config.bosses.len() && !self.boss_in_play() {
                self.cleared = true;
                ctx.events.push(CoreEvent::StageCleared);
                info!(tick = ctx.tick, score = ctx.ledger.score(), "stage cleared");
            }
        }
    }

    fn allocate_id(&mut self) -> ActorId {
        let id = self.next_actor_id;
        self.next_actor_id += 1;
        id
    }
}

fn has_escaped(playfield: &Playfield, actor: &Actor) -> bool {
    playfield.has_left(&actor.rect(), actor.velocity)
}

/// Random horizontal spawn position, `margin` away from both walls.
fn spawn_x(playfield: &Playfield, margin: f32, rng: &mut StdRng) -> f32 {
    let lo = margin.min(playfield.width * 0.5);
    let hi = (playfield.width - margin).max(lo);
    rng.random_range(lo..=hi)
}

/// Drop decision for one trash kill from two rolls in `[0, 1)`.
pub fn trash_drop(chance: f32, weights: &DropWeights, chance_roll: f32, kind_roll: f32) -> Option<ItemKind> {
    if chance_roll >= chance {
        return None;
    }
    weighted_index(&weights.as_array(), kind_roll).map(DropWeights::kind_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use danmaku_shared::config::{Difficulty, presets};
    use rand::SeedableRng;

    use crate::combat::Owner;

    struct World {
        rng: StdRng,
        ledger: ScoreLedger,
        items: ItemField,
        stray: ProjectileField,
        events: Vec<CoreEvent>,
        tick: u64,
    }

    impl World {
        fn new() -> Self {
            Self {
                rng: StdRng::seed_from_u64(5),
                ledger: ScoreLedger::default(),
                items: ItemField::default(),
                stray: ProjectileField::new(Owner::Enemy),
                events: Vec::new(),
                tick: 0,
            }
        }

        fn step(&mut self, director: &mut EncounterDirector, config: &EncounterConfig) {
            self.tick += 1;
            let mut ctx = DirectorContext {
                tick: self.tick,
                seed: 5,
                player: Vec2::new(400.0, 540.0),
                rng: &mut self.rng,
                ledger: &mut self.ledger,
                items: &mut self.items,
                stray: &mut self.stray,
                events: &mut self.events,
            };
            director.tick(config, &mut ctx);
        }
    }

    #[test]
    fn drop_rolls_follow_chance_and_weights() {
        let weights = DropWeights {
            score: 0.6,
            power: 0.3,
            bomb: 0.1,
        };
        assert_eq!(trash_drop(0.6, &weights, 0.7, 0.0), None);
        assert_eq!(trash_drop(0.6, &weights, 0.1, 0.1), Some(ItemKind::Score));
        assert_eq!(trash_drop(0.6, &weights, 0.1, 0.7), Some(ItemKind::Power));
        assert_eq!(trash_drop(0.6, &weights, 0.1, 0.95), Some(ItemKind::Bomb));
    }

    #[test]
    fn trash_spawns_on_cooldown_within_margins() {
        let config = presets::encounter(Difficulty::Normal);
        let mut director = EncounterDirector::new();
        let mut world = World::new();
        for _ in 0..config.trash.spawn_cooldown {
            world.step(&mut director, &config);
        }
        assert_eq!(director.actors().len(), 1);
        let x = director.actors()[0].position.x;
        assert!(x >= config.trash.spawn_margin && x <= config.playfield.width - config.trash.spawn_margin);
    }

    #[test]
    fn boss_suspends_trash_and_enters_on_time() {
        let mut config = presets::encounter(Difficulty::Normal);
        config.bosses[0].entrance.min_score = None;
        let mut director = EncounterDirector::new();
        let mut world = World::new();
        for _ in 0..900 {
            world.step(&mut director, &config);
        }
        assert!(director.boss_in_play());
        let trash_before = director.actors().iter().filter(|a| a.kind == ActorKind::Trash).count();

        for _ in 0..(config.trash.spawn_cooldown * 2) {
            world.step(&mut director, &config);
        }
        let trash_after = director.actors().iter().filter(|a| a.kind == ActorKind::Trash).count();
        assert!(trash_after <= trash_before);
    }

    #[test]
    fn score_gate_opens_the_entrance_early() {
        let config = presets::encounter(Difficulty::Normal);
        let gate = config.bosses[0].entrance;
        let mut director = EncounterDirector::new();
        let mut world = World::new();

        for _ in 0..10 {
            world.step(&mut director, &config);
        }
        assert!(!director.boss_in_play());

        world.ledger.add_score(gate.min_score.expect("reisen has a score gate"));
        world.step(&mut director, &config);
        assert!(director.boss_in_play());
        assert!(director.elapsed() < gate.after_ticks.expect("reisen has a time gate"));
        assert!(
            world
                .events
                .iter()
                .any(|e| matches!(e, CoreEvent::BossEntered { name, .. } if name == &config.bosses[0].name))
        );
    }

    #[test]
    fn trash_stays_away_between_bosses() {
        let mut config = presets::encounter(Difficulty::Normal);
        config.bosses[0].entrance.after_ticks = Some(1);
        config.bosses[0].defeat_effect_ticks = 5;
        let gap = u64::from(config.bosses[1].entrance.gap_ticks);
        assert!(gap > u64::from(config.trash.spawn_cooldown));
        let mut director = EncounterDirector::new();
        let mut world = World::new();

        while !director.actors().iter().any(|a| a.kind == ActorKind::Boss && a.is_active()) {
            world.step(&mut director, &config);
            assert!(world.tick < 2_000);
        }
        director
            .actors_mut()
            .iter_mut()
            .filter(|a| a.kind == ActorKind::Boss)
            .for_each(|a| a.set_health(0.0));

        while director.boss_in_play() {
            world.step(&mut director, &config);
            assert!(world.tick < 2_000);
        }
        let removed_at = director.elapsed();
        assert!(director.in_boss_gap(&config));
        world.events.clear();

        while !world.events.iter().any(|e| matches!(e, CoreEvent::BossEntered { .. })) {
            assert!(director.trash_suppressed(&config));
            world.step(&mut director, &config);
            assert!(director.actors().iter().all(|a| a.kind != ActorKind::Trash));
            assert!(world.tick < 5_000);
        }
        assert_eq!(director.elapsed() - removed_at, gap);
        assert!(!director.in_boss_gap(&config));
    }

    #[test]
    fn last_boss_removal_clears_the_stage() {
        let mut config = presets::encounter(Difficulty::Normal);
        config.bosses.truncate(1);
        config.bosses[0].entrance.after_ticks = Some(1);
        config.bosses[0].defeat_effect_ticks = 10;
        let mut director = EncounterDirector::new();
        let mut world = World::new();

        while director.actors().iter().all(|a| a.kind != ActorKind::Boss || !a.is_active()) {
            world.step(&mut director, &config);
            assert!(world.tick < 2_000);
        }
        let boss = director
            .actors_mut()
            .iter_mut()
            .find(|a| a.kind == ActorKind::Boss)
            .expect("boss on field");
        boss.set_health(0.0);

        for _ in 0..12 {
            world.step(&mut director, &config);
        }
        assert!(director.is_stage_cleared());
        assert!(world.events.contains(&CoreEvent::StageCleared));
        assert_eq!(world.items.len(), config.bosses[0].drops.len());
    }
}
