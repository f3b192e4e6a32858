//! One encounter from first tick to clear or failure.
//!
//! [`EncounterSession`] is the only place that owns mutable encounter state.
//! Each [`EncounterSession::tick`] runs the fixed sequence: player input,
//! director and actors, projectile and item motion, collisions, outcome.

use std::iter;

use danmaku_shared::config::{ConfigError, Difficulty, DifficultyTables, EncounterConfig};
use danmaku_shared::ledger::ScoreLedger;
use danmaku_shared::rng::derive_seed;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::combat::{CollisionResolver, ItemField, Owner, Player, Projectile, ProjectileField};
use crate::director::{DirectorContext, EncounterDirector};
use crate::events::{CoreEvent, EventListener};
use crate::input::FrameInput;

/// Stream label for the pattern/spawn generator.
const SIM_STREAM: u64 = 0x51;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("encounter schedules no bosses and could never be cleared")]
    NoBosses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageOutcome {
    Cleared,
    Failed,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<CoreEvent>,
    pub outcome: Option<StageOutcome>,
}

pub struct EncounterSession {
    config: EncounterConfig,
    seed: u64,
    rng: StdRng,
    tick: u64,
    player: Player,
    player_shots: ProjectileField,
    stray: ProjectileField,
    items: ItemField,
    director: EncounterDirector,
    ledger: ScoreLedger,
    outcome: Option<StageOutcome>,
    listeners: Vec<Box<dyn EventListener>>,
}

impl EncounterSession {
    /// Validate `config` and set up a session. Nothing ticks on failure.
    pub fn new(config: EncounterConfig, seed: u64) -> Result<Self, SessionError> {
        config.validate()?;
        if config.bosses.is_empty() {
            return Err(SessionError::NoBosses);
        }

        let player = Player::new(&config.player);
        let player_shots = ProjectileField::new(Owner::Player).with_damage(config.player.shot_damage);
        let ledger = ScoreLedger::new(config.ledger);
        info!(seed, bosses = config.bosses.len(), "encounter session ready");

        Ok(Self {
            rng: StdRng::seed_from_u64(derive_seed(seed, SIM_STREAM)),
            seed,
            tick: 0,
            player,
            player_shots,
            stray: ProjectileField::new(Owner::Enemy),
            items: ItemField::default(),
            director: EncounterDirector::new(),
            ledger,
            outcome: None,
            listeners: Vec::new(),
            config,
        })
    }

    pub fn from_tables(tables: &DifficultyTables, difficulty: Difficulty, seed: u64) -> Result<Self, SessionError> {
        let config = tables.table(difficulty)?.clone();
        info!(%difficulty, "loading difficulty table");
        Self::new(config, seed)
    }

    pub fn subscribe(&mut self, listener: impl EventListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn tick(&mut self, input: &FrameInput) -> TickReport {
        if let Some(outcome) = self.outcome {
            return TickReport {
                tick: self.tick,
                events: Vec::new(),
                outcome: Some(outcome),
            };
        }
        self.tick += 1;
        let mut events = Vec::new();

        self.apply_input(input, &mut events);

        let mut ctx = DirectorContext {
            tick: self.tick,
            seed: self.seed,
            player: self.player.position,
            rng: &mut self.rng,
            ledger: &mut self.ledger,
            items: &mut self.items,
            stray: &mut self.stray,
            events: &mut events,
        };
        self.director.tick(&self.config, &mut ctx);

        self.advance_fields();
        self.resolve_collisions(&mut events);
        self.update_outcome(&mut events);

        for event in &events {
            for listener in &mut self.listeners {
                listener.on_event(self.tick, event);
            }
        }
        trace!(
            tick = self.tick,
            actors = self.director.actors().len(),
            enemy_bullets = self.enemy_projectiles().count(),
            items = self.items.len(),
            "tick"
        );

        TickReport {
            tick: self.tick,
            events,
            outcome: self.outcome,
        }
    }

    fn apply_input(&mut self, input: &FrameInput, events: &mut Vec<CoreEvent>) {
        let cfg = &self.config.player;
        self.player.tick_timers();
        self.player.apply_movement(input, cfg, &self.config.playfield);

        if input.bomb && self.player.bomb_ready() && self.ledger.use_bomb() {
            self.player.start_bomb(cfg);
            let cleared = clear_enemy_fields(&mut self.director, &mut self.stray);
            events.push(CoreEvent::BombActivated {
                bombs_left: self.ledger.bombs(),
                cleared,
            });
            debug!(tick = self.tick, cleared, bombs_left = self.ledger.bombs(), "bomb");
        }

        if input.shoot {
            let cfg = &self.config.player;
            let volley = self.player.try_shoot(cfg, &mut self.rng);
            self.player_shots.spawn(volley);
        }
    }

    fn advance_fields(&mut self) {
        let playfield = &self.config.playfield;
        let fields = self
            .director
            .actors_mut()
            .iter_mut()
            .map(|a| &mut a.projectiles)
            .chain([&mut self.stray, &mut self.player_shots]);
        for field in fields {
            field.advance_all();
            field.cull(playfield);
        }
        self.items.advance(self.player.position, &self.config.items);
        self.items.cull(playfield, &self.config.items);
    }

    fn resolve_collisions(&mut self, events: &mut Vec<CoreEvent>) {
        let resolver = CollisionResolver::new(&self.config);
        resolver.player_shots_vs_actors(
            &mut self.player_shots,
            self.director.actors_mut(),
            &mut self.ledger,
            events,
        );

        let enemy_fields = self
            .director
            .actors_mut()
            .iter_mut()
            .map(|a| &mut a.projectiles)
            .chain(iter::once(&mut self.stray));
        let hit = resolver.enemy_shots_vs_player(enemy_fields, &mut self.player, &mut self.ledger, events);
        if hit.was_hit() && self.config.player.clear_bullets_on_hit {
            clear_enemy_fields(&mut self.director, &mut self.stray);
        }

        resolver.player_vs_items(&mut self.items, &self.player, &mut self.ledger, events);
    }

    fn update_outcome(&mut self, events: &mut Vec<CoreEvent>) {
        if self.ledger.is_out_of_lives() {
            self.outcome = Some(StageOutcome::Failed);
            events.push(CoreEvent::StageFailed);
            info!(tick = self.tick, score = self.ledger.score(), "stage failed");
        } else if self.director.is_stage_cleared() {
            self.outcome = Some(StageOutcome::Cleared);
        }
    }

    /// Remove every enemy projectile. Returns how many were live.
    pub fn clear_enemy_projectiles(&mut self) -> usize {
        clear_enemy_fields(&mut self.director, &mut self.stray)
    }

    pub fn enemy_projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.director
            .actors()
            .iter()
            .flat_map(|a| a.projectiles.iter())
            .chain(self.stray.iter())
    }

    pub fn player_projectiles(&self) -> &ProjectileField {
        &self.player_shots
    }

    /// Stray field for bullets no actor owns any more.
    pub fn stray_projectiles_mut(&mut self) -> &mut ProjectileField {
        &mut self.stray
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn director(&self) -> &EncounterDirector {
        &self.director
    }

    pub fn director_mut(&mut self) -> &mut EncounterDirector {
        &mut self.director
    }

    pub fn items(&self) -> &ItemField {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut ItemField {
        &mut self.items
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ScoreLedger {
        &mut self.ledger
    }

    pub fn outcome(&self) -> Option<StageOutcome> {
        self.outcome
    }
}

fn clear_enemy_fields(director: &mut EncounterDirector, stray: &mut ProjectileField) -> usize {
    let owned: usize = director
        .actors_mut()
        .iter_mut()
        .map(|a| a.projectiles.clear())
        .sum();
    owned + stray.clear()
}
