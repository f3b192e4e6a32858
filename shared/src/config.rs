//! Per-difficulty encounter tables.
//!
//! Tables are plain serde data so they can live in a RON file next to the
//! game, the same way settings do. A session consumes one validated
//! [`EncounterConfig`] and treats it as immutable for its whole lifetime.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::geometry::{DOWN_DEG, Playfield};
use crate::ledger::LedgerLimits;
use crate::patterns::{BulletClass, PatternShape, PatternSpec};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read tables from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse difficulty tables: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("no table for difficulty {0}")]
    MissingDifficulty(Difficulty),
    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),
    #[error("invalid {context}: {reason}")]
    Invalid { context: String, reason: String },
}

fn invalid(context: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        context: context.into(),
        reason: reason.into(),
    }
}

// ============================================================================
// DIFFICULTY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Lunatic,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Lunatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Lunatic => "lunatic",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownDifficulty(s.to_string()))
    }
}

// ============================================================================
// TABLE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Score,
    Power,
    Bomb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub start: Vec2,
    /// Sprite size; also the item collection rectangle.
    pub size: Vec2,
    pub speed: f32,
    pub focused_speed: f32,
    /// Half side of the strict (lethal) hitbox.
    pub hitbox_radius: f32,
    /// Extra reach beyond hitbox + bullet radius that still counts as a graze.
    pub graze_margin: f32,
    pub invincibility_ticks: u32,
    pub shot_cooldown: u32,
    pub shot_speed: f32,
    pub shot_damage: f32,
    pub needle: BulletClass,
    pub amulet: BulletClass,
    pub bomb_cooldown: u32,
    pub bomb_invincibility_ticks: u32,
    pub clear_bullets_on_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemConfig {
    pub size: Vec2,
    pub fall_speed: f32,
    pub attraction_speed: f32,
    /// Player above this line (smaller y) pulls every item in.
    pub auto_collect_line: f32,
    /// Drops are scattered within this box around the drop point.
    pub scatter: Vec2,
    pub score_value: u64,
    pub power_value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub boss_hit: u64,
    pub trash_hit: u64,
    pub trash_kill: u64,
    pub graze: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionConfig {
    /// Applied to both shapes in player-shot vs enemy tests.
    pub shrink_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackConfig {
    pub name: SmolStr,
    pub cooldown: u32,
    pub volley: Vec<PatternSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackSchedule {
    /// Always the first attack.
    Fixed,
    /// Next attack after every volley.
    Alternate,
    /// Next attack every `switch_after` ticks.
    Timed { switch_after: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonSpellConfig {
    pub attacks: Vec<AttackConfig>,
    pub schedule: AttackSchedule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellCardConfig {
    pub name: SmolStr,
    /// Fraction of max health at or below which the card starts.
    pub trigger_fraction: f32,
    pub intro_ticks: u32,
    pub duration: u32,
    pub bonus: u64,
    pub attack: AttackConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Fraction of max health at or below which this phase ends.
    pub end_fraction: f32,
    pub non_spell: NonSpellConfig,
    #[serde(default)]
    pub spell: Option<SpellCardConfig>,
}

/// When a scheduled boss may enter. Time and score gates are alternatives:
/// either one being met is enough. With neither set the boss enters as soon
/// as `gap_ticks` have passed since the previous boss left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EntranceGate {
    #[serde(default)]
    pub after_ticks: Option<u64>,
    #[serde(default)]
    pub min_score: Option<u64>,
    #[serde(default)]
    pub gap_ticks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossConfig {
    pub name: SmolStr,
    pub health: f32,
    pub size: Vec2,
    pub entry_target: Vec2,
    pub entry_speed: f32,
    /// Side-to-side sway while attacking; 0 holds position.
    #[serde(default)]
    pub drift_speed: f32,
    pub entrance: EntranceGate,
    pub phases: Vec<PhaseConfig>,
    pub defeat_effect_ticks: u32,
    #[serde(default)]
    pub drops: Vec<ItemKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropWeights {
    pub score: f32,
    pub power: f32,
    pub bomb: f32,
}

impl DropWeights {
    pub fn as_array(&self) -> [f32; 3] {
        [self.score, self.power, self.bomb]
    }

    pub fn kind_at(index: usize) -> ItemKind {
        match index {
            0 => ItemKind::Score,
            1 => ItemKind::Power,
            _ => ItemKind::Bomb,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashConfig {
    pub name: SmolStr,
    pub health: f32,
    pub size: Vec2,
    pub speed: f32,
    pub spawn_cooldown: u32,
    /// Keep spawns this far from the side walls.
    pub spawn_margin: f32,
    pub spawn_y: f32,
    pub attack: AttackConfig,
    pub drop_chance: f32,
    pub drop_weights: DropWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterConfig {
    pub playfield: Playfield,
    pub player: PlayerConfig,
    pub ledger: LedgerLimits,
    pub items: ItemConfig,
    pub scoring: ScoringConfig,
    pub collision: CollisionConfig,
    pub trash: TrashConfig,
    pub bosses: Vec<BossConfig>,
}

// ============================================================================
// VALIDATION
// ============================================================================

fn positive(context: &str, field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(context, format!("{field} must be positive, got {value}")))
    }
}

fn nonzero(context: &str, field: &str, value: u32) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(invalid(context, format!("{field} must be at least 1")))
    }
}

fn finite(context: &str, field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(context, format!("{field} must be finite, got {value}")))
    }
}

fn non_negative(context: &str, field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(context, format!("{field} must be finite and not negative, got {value}")))
    }
}

impl PatternSpec {
    /// Reject parameters the emitter cannot draw from. Random ranges in
    /// particular panic on non-finite bounds.
    pub fn validate(&self, context: &str) -> Result<(), ConfigError> {
        finite(context, "offset.x", self.offset.x)?;
        finite(context, "offset.y", self.offset.y)?;
        non_negative(context, "speed_jitter", self.speed_jitter)?;
        positive(context, "bullet width", self.class.size.x)?;
        positive(context, "bullet height", self.class.size.y)?;

        match &self.shape {
            PatternShape::Ring {
                speed,
                turn_deg,
                layers,
                layer_speed_step,
                layer_spacing,
                ..
            } => {
                non_negative(context, "speed", *speed)?;
                finite(context, "turn_deg", *turn_deg)?;
                nonzero(context, "layers", *layers)?;
                finite(context, "layer_speed_step", *layer_speed_step)?;
                finite(context, "layer_spacing", *layer_spacing)?;
            }
            PatternShape::AimedCone { spread_deg, speed, .. } => {
                finite(context, "spread_deg", *spread_deg)?;
                non_negative(context, "speed", *speed)?;
            }
            PatternShape::Fan {
                spread_deg,
                speed,
                center_deg,
                ..
            } => {
                finite(context, "spread_deg", *spread_deg)?;
                non_negative(context, "speed", *speed)?;
                finite(context, "center_deg", *center_deg)?;
            }
            PatternShape::Spiral {
                arm_step_deg,
                base_radius,
                radial_step,
                speed,
                turn_deg,
                ..
            } => {
                finite(context, "arm_step_deg", *arm_step_deg)?;
                finite(context, "base_radius", *base_radius)?;
                finite(context, "radial_step", *radial_step)?;
                non_negative(context, "speed", *speed)?;
                finite(context, "turn_deg", *turn_deg)?;
            }
            PatternShape::Streams { streams, speed } => {
                non_negative(context, "speed", *speed)?;
                for stream in streams {
                    finite(context, "stream angle_deg", stream.angle_deg)?;
                    finite(context, "stream offset.x", stream.offset.x)?;
                    finite(context, "stream offset.y", stream.offset.y)?;
                }
            }
            PatternShape::Scatter {
                jitter_deg,
                speed_min,
                speed_max,
                ..
            } => {
                finite(context, "jitter_deg", *jitter_deg)?;
                non_negative(context, "speed_min", *speed_min)?;
                non_negative(context, "speed_max", *speed_max)?;
            }
            PatternShape::Branch {
                stream_spread_deg,
                bullet_step_deg,
                speed,
                speed_step,
                ..
            } => {
                finite(context, "stream_spread_deg", *stream_spread_deg)?;
                finite(context, "bullet_step_deg", *bullet_step_deg)?;
                non_negative(context, "speed", *speed)?;
                finite(context, "speed_step", *speed_step)?;
            }
        }
        Ok(())
    }
}

impl AttackConfig {
    pub fn validate(&self, context: &str) -> Result<(), ConfigError> {
        let context = format!("{context} attack '{}'", self.name);
        nonzero(&context, "cooldown", self.cooldown)?;
        if self.volley.is_empty() {
            return Err(invalid(context, "volley is empty"));
        }
        for (i, spec) in self.volley.iter().enumerate() {
            spec.validate(&format!("{context} pattern {}", i + 1))?;
        }
        Ok(())
    }
}

impl BossConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let context = format!("boss '{}'", self.name);
        positive(&context, "health", self.health)?;
        positive(&context, "entry_speed", self.entry_speed)?;
        if self.phases.is_empty() {
            return Err(invalid(context, "at least one phase is required"));
        }

        let mut upper = 1.0_f32;
        for (i, phase) in self.phases.iter().enumerate() {
            let phase_ctx = format!("{context} phase {}", i + 1);
            if !(0.0..1.0).contains(&phase.end_fraction) || phase.end_fraction >= upper {
                return Err(invalid(
                    phase_ctx,
                    format!(
                        "end_fraction {} must be below {upper} and thresholds must strictly decrease",
                        phase.end_fraction
                    ),
                ));
            }
            if phase.non_spell.attacks.is_empty() {
                return Err(invalid(phase_ctx, "no non-spell attacks"));
            }
            for attack in &phase.non_spell.attacks {
                attack.validate(&phase_ctx)?;
            }
            if let AttackSchedule::Timed { switch_after } = phase.non_spell.schedule {
                nonzero(&phase_ctx, "switch_after", switch_after)?;
            }
            if let Some(spell) = &phase.spell {
                if spell.trigger_fraction <= phase.end_fraction || spell.trigger_fraction > upper {
                    return Err(invalid(
                        phase_ctx,
                        format!(
                            "spell '{}' trigger {} must lie in ({}, {upper}]",
                            spell.name, spell.trigger_fraction, phase.end_fraction
                        ),
                    ));
                }
                nonzero(&phase_ctx, "spell duration", spell.duration)?;
                spell.attack.validate(&phase_ctx)?;
            }
            upper = phase.end_fraction;
        }
        if upper != 0.0 {
            return Err(invalid(context, "the last phase must end at zero health"));
        }
        Ok(())
    }
}

impl EncounterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("playfield", "width", self.playfield.width)?;
        positive("playfield", "height", self.playfield.height)?;

        let p = &self.player;
        positive("player", "speed", p.speed)?;
        positive("player", "focused_speed", p.focused_speed)?;
        positive("player", "hitbox_radius", p.hitbox_radius)?;
        positive("player", "shot_speed", p.shot_speed)?;
        positive("player", "shot_damage", p.shot_damage)?;
        nonzero("player", "shot_cooldown", p.shot_cooldown)?;
        if p.graze_margin < 0.0 {
            return Err(invalid("player", "graze_margin must not be negative"));
        }

        nonzero("ledger", "max_power", self.ledger.max_power)?;
        nonzero("ledger", "max_bombs", self.ledger.max_bombs)?;
        nonzero("ledger", "start_lives", self.ledger.start_lives)?;

        positive("items", "attraction_speed", self.items.attraction_speed)?;
        positive("items", "fall_speed", self.items.fall_speed)?;

        let ratio = self.collision.shrink_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(invalid("collision", format!("shrink_ratio {ratio} must be in (0, 1]")));
        }

        let t = &self.trash;
        positive("trash", "health", t.health)?;
        nonzero("trash", "spawn_cooldown", t.spawn_cooldown)?;
        if !(0.0..=1.0).contains(&t.drop_chance) {
            return Err(invalid("trash", "drop_chance must be within [0, 1]"));
        }
        if t.spawn_margin * 2.0 > self.playfield.width {
            return Err(invalid("trash", "spawn_margin leaves no room to spawn"));
        }
        t.attack.validate("trash")?;

        for boss in &self.bosses {
            boss.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// TABLES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTables(pub BTreeMap<Difficulty, EncounterConfig>);

impl DifficultyTables {
    /// Presets for every difficulty.
    pub fn builtin() -> Self {
        Self(
            Difficulty::ALL
                .into_iter()
                .map(|d| (d, presets::encounter(d)))
                .collect(),
        )
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading difficulty tables");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&content)
    }

    /// The validated table for `difficulty`.
    pub fn table(&self, difficulty: Difficulty) -> Result<&EncounterConfig, ConfigError> {
        let config = self
            .0
            .get(&difficulty)
            .ok_or(ConfigError::MissingDifficulty(difficulty))?;
        if let Err(err) = config.validate() {
            warn!(%difficulty, %err, "rejecting difficulty table");
            return Err(err);
        }
        Ok(config)
    }
}

// ============================================================================
// PRESETS
// ============================================================================

/// Built-in tables for the Reisen/Kaguya stage.
pub mod presets {
    use super::*;

    pub const PLAYFIELD: Playfield = Playfield {
        width: 800.0,
        height: 600.0,
    };

    struct Scale {
        boss_health: f32,
        trash_health: f32,
        trash_cooldown: u32,
        trash_shot_speed: f32,
    }

    fn scale(difficulty: Difficulty) -> Scale {
        match difficulty {
            Difficulty::Easy => Scale {
                boss_health: 0.8,
                trash_health: 5.0,
                trash_cooldown: 150,
                trash_shot_speed: 4.0,
            },
            Difficulty::Normal => Scale {
                boss_health: 1.0,
                trash_health: 10.0,
                trash_cooldown: 120,
                trash_shot_speed: 5.0,
            },
            Difficulty::Hard => Scale {
                boss_health: 1.2,
                trash_health: 15.0,
                trash_cooldown: 90,
                trash_shot_speed: 5.5,
            },
            Difficulty::Lunatic => Scale {
                boss_health: 1.5,
                trash_health: 20.0,
                trash_cooldown: 60,
                trash_shot_speed: 6.0,
            },
        }
    }

    fn attack(name: &str, cooldown: u32, volley: Vec<PatternSpec>) -> AttackConfig {
        AttackConfig {
            name: SmolStr::new(name),
            cooldown,
            volley,
        }
    }

    fn ring(count: u32, speed: f32, turn_deg: f32) -> PatternShape {
        PatternShape::Ring {
            count,
            speed,
            turn_deg,
            random_offset: false,
            layers: 1,
            layer_speed_step: 0.0,
            layer_spacing: 0.0,
        }
    }

    pub fn player() -> PlayerConfig {
        PlayerConfig {
            start: Vec2::new(400.0, 540.0),
            size: Vec2::new(40.0, 48.0),
            speed: 5.0,
            focused_speed: 2.0,
            hitbox_radius: 3.0,
            graze_margin: 12.0,
            invincibility_ticks: 120,
            shot_cooldown: 6,
            shot_speed: 10.0,
            shot_damage: 1.0,
            needle: BulletClass::new("player_needle", Vec2::new(6.0, 12.0)),
            amulet: BulletClass::new("player_amulet", Vec2::new(8.0, 16.0)),
            bomb_cooldown: 180,
            bomb_invincibility_ticks: 120,
            clear_bullets_on_hit: true,
        }
    }

    pub fn items() -> ItemConfig {
        ItemConfig {
            size: Vec2::splat(16.0),
            fall_speed: 2.0,
            attraction_speed: 7.0,
            auto_collect_line: 150.0,
            scatter: Vec2::new(48.0, 32.0),
            score_value: 100,
            power_value: 5,
        }
    }

    pub fn trash(difficulty: Difficulty) -> TrashConfig {
        let s = scale(difficulty);
        let shot = PatternSpec::new(
            PatternShape::Fan {
                count: 1,
                spread_deg: 0.0,
                speed: s.trash_shot_speed,
                center_deg: DOWN_DEG,
            },
            BulletClass::new("zako_bullet", Vec2::splat(10.0)),
        )
        .with_offset(Vec2::new(0.0, 16.0));
        TrashConfig {
            name: SmolStr::new("zako"),
            health: s.trash_health,
            size: Vec2::splat(32.0),
            speed: 2.0,
            spawn_cooldown: s.trash_cooldown,
            spawn_margin: 50.0,
            spawn_y: -16.0,
            attack: attack("zako_shot", 90, vec![shot]),
            drop_chance: 0.6,
            drop_weights: DropWeights {
                score: 0.6,
                power: 0.3,
                bomb: 0.1,
            },
        }
    }

    pub fn reisen(difficulty: Difficulty) -> BossConfig {
        let bullet = BulletClass::new("reisen_bullet", Vec2::splat(12.0));
        let wave = PatternSpec::new(
            PatternShape::Fan {
                count: 7,
                spread_deg: 90.0,
                speed: 3.0,
                center_deg: DOWN_DEG,
            },
            bullet.clone(),
        );
        let burst = PatternSpec::new(
            PatternShape::Scatter {
                count: 5,
                jitter_deg: 12.0,
                speed_min: 4.0,
                speed_max: 4.0,
                aimed: true,
            },
            bullet,
        );
        let blast = PatternSpec::new(
            ring(12, 2.5, 0.0),
            BulletClass::new("reisen_spell_bullet", Vec2::splat(14.0)),
        );

        BossConfig {
            name: SmolStr::new("Reisen"),
            health: (100.0 * scale(difficulty).boss_health).round(),
            size: Vec2::new(60.0, 80.0),
            entry_target: Vec2::new(400.0, 100.0),
            entry_speed: 2.0,
            drift_speed: 2.0,
            entrance: EntranceGate {
                after_ticks: Some(900),
                min_score: Some(500),
                gap_ticks: 0,
            },
            phases: vec![PhaseConfig {
                end_fraction: 0.0,
                non_spell: NonSpellConfig {
                    attacks: vec![
                        attack("wave", 60, vec![wave]),
                        attack("targeted_burst", 120, vec![burst]),
                    ],
                    schedule: AttackSchedule::Timed { switch_after: 300 },
                },
                spell: Some(SpellCardConfig {
                    name: SmolStr::new("Illusionary Blast"),
                    trigger_fraction: 0.5,
                    intro_ticks: 60,
                    duration: 900,
                    bonus: 50_000,
                    attack: attack("illusionary_blast", 12, vec![blast]),
                }),
            }],
            defeat_effect_ticks: 120,
            drops: [vec![ItemKind::Score; 10], vec![ItemKind::Bomb, ItemKind::Power]].concat(),
        }
    }

    pub fn kaguya(difficulty: Difficulty) -> BossConfig {
        let jewel = BulletClass::new("kaguya_jewel", Vec2::splat(10.0));
        let lunar = BulletClass::new("kaguya_lunar", Vec2::splat(12.0));

        let jewel_scatter = PatternSpec::new(
            PatternShape::Scatter {
                count: 15,
                jitter_deg: 45.0,
                speed_min: 2.0,
                speed_max: 4.0,
                aimed: true,
            },
            jewel.clone(),
        );
        let rainbow = PatternSpec::new(
            PatternShape::Ring {
                count: 8,
                speed: 3.0,
                turn_deg: 0.0,
                random_offset: true,
                layers: 3,
                layer_speed_step: 0.5,
                layer_spacing: 10.0,
            },
            BulletClass::new("kaguya_rainbow", Vec2::splat(10.0)),
        );
        let branch = PatternSpec::new(
            PatternShape::Branch {
                streams: 3,
                bullets_per_stream: 8,
                stream_spread_deg: 60.0,
                bullet_step_deg: 5.0,
                speed: 2.5,
                speed_step: 0.1,
            },
            BulletClass::new("kaguya_branch", Vec2::new(8.0, 14.0)),
        );
        let fire_rat = PatternSpec::new(
            PatternShape::AimedCone {
                count: 20,
                spread_deg: 120.0,
                speed: 2.5,
            },
            BulletClass::new("kaguya_flame", Vec2::splat(14.0)),
        )
        .with_speed_jitter(1.5);
        let vortex = PatternSpec::new(
            PatternShape::Spiral {
                arms: 4,
                bullets_per_arm: 10,
                arm_step_deg: 15.0,
                base_radius: 10.0,
                radial_step: 5.0,
                speed: 2.0,
                turn_deg: 7.0,
            },
            lunar.clone(),
        );
        let eoin_aimed = PatternSpec::new(
            PatternShape::AimedCone {
                count: 3,
                spread_deg: 6.0,
                speed: 5.0,
            },
            BulletClass::new("kaguya_jewel_small", Vec2::splat(8.0)),
        );
        let eoin_ring = PatternSpec::new(ring(24, 2.0, 10.0), lunar);

        let phase = |end_fraction: f32, attack: AttackConfig, spell: SpellCardConfig| PhaseConfig {
            end_fraction,
            non_spell: NonSpellConfig {
                attacks: vec![attack],
                schedule: AttackSchedule::Fixed,
            },
            spell: Some(spell),
        };
        let spell = |name: &str, trigger_fraction: f32, duration: u32, bonus: u64, attack| {
            SpellCardConfig {
                name: SmolStr::new(name),
                trigger_fraction,
                intro_ticks: 60,
                duration,
                bonus,
                attack,
            }
        };

        BossConfig {
            name: SmolStr::new("Kaguya"),
            health: (500.0 * scale(difficulty).boss_health).round(),
            size: Vec2::new(80.0, 100.0),
            entry_target: Vec2::new(400.0, 150.0),
            entry_speed: 1.5,
            drift_speed: 0.0,
            entrance: EntranceGate {
                after_ticks: None,
                min_score: None,
                gap_ticks: 180,
            },
            phases: vec![
                phase(
                    0.75,
                    attack("jewel_scatter", 72, vec![jewel_scatter]),
                    spell(
                        "Divine Treasure \"Jewel Branch of Hourai -Rainbow Bullets-\"",
                        0.85,
                        720,
                        75_000,
                        attack("rainbow_bullets", 9, vec![rainbow]),
                    ),
                ),
                phase(
                    0.40,
                    attack("bullet_branch", 90, vec![branch]),
                    spell(
                        "Impossible Request \"Robe of the Fire Rat -Indestructible Flame-\"",
                        0.55,
                        900,
                        100_000,
                        attack("indestructible_flame", 12, vec![fire_rat]),
                    ),
                ),
                phase(
                    0.0,
                    attack("lunar_vortex", 60, vec![vortex]),
                    spell(
                        "End of Imperishable Night",
                        0.15,
                        1200,
                        150_000,
                        attack("imperishable_night", 6, vec![eoin_aimed, eoin_ring]),
                    ),
                ),
            ],
            defeat_effect_ticks: 180,
            drops: [vec![ItemKind::Score; 20], vec![ItemKind::Power; 3]].concat(),
        }
    }

    pub fn encounter(difficulty: Difficulty) -> EncounterConfig {
        EncounterConfig {
            playfield: PLAYFIELD,
            player: player(),
            ledger: LedgerLimits::default(),
            items: items(),
            scoring: ScoringConfig {
                boss_hit: 10,
                trash_hit: 20,
                trash_kill: 200,
                graze: 10,
            },
            collision: CollisionConfig { shrink_ratio: 0.8 },
            trash: trash(difficulty),
            bosses: vec![reisen(difficulty), kaguya(difficulty)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_validate() {
        let tables = DifficultyTables::builtin();
        for difficulty in Difficulty::ALL {
            let table = tables.table(difficulty).expect("preset should validate");
            assert_eq!(table.bosses.len(), 2);
        }
    }

    #[test]
    fn missing_difficulty_is_reported() {
        let mut tables = DifficultyTables::builtin();
        tables.0.remove(&Difficulty::Lunatic);
        assert!(matches!(
            tables.table(Difficulty::Lunatic),
            Err(ConfigError::MissingDifficulty(Difficulty::Lunatic))
        ));
    }

    #[test]
    fn thresholds_must_strictly_decrease() {
        let mut boss = presets::kaguya(Difficulty::Normal);
        boss.phases[1].end_fraction = 0.8;
        assert!(matches!(boss.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn non_finite_pattern_parameters_are_rejected() {
        let mut table = presets::encounter(Difficulty::Normal);
        let burst = &mut table.bosses[0].phases[0].non_spell.attacks[1].volley[0];
        let PatternShape::Scatter { jitter_deg, .. } = &mut burst.shape else {
            panic!("reisen's second attack should be a scatter");
        };
        *jitter_deg = f32::INFINITY;
        assert!(matches!(table.validate(), Err(ConfigError::Invalid { .. })));

        let mut table = presets::encounter(Difficulty::Normal);
        table.trash.attack.volley[0].speed_jitter = f32::NAN;
        assert!(matches!(table.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn ring_needs_at_least_one_layer() {
        let mut boss = presets::kaguya(Difficulty::Normal);
        boss.phases[0].non_spell.attacks[0].volley.push(PatternSpec::new(
            PatternShape::Ring {
                count: 4,
                speed: 2.0,
                turn_deg: 0.0,
                random_offset: false,
                layers: 0,
                layer_speed_step: 0.0,
                layer_spacing: 0.0,
            },
            BulletClass::new("ring", Vec2::splat(8.0)),
        ));
        assert!(matches!(boss.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn last_phase_must_reach_zero() {
        let mut boss = presets::kaguya(Difficulty::Normal);
        boss.phases[2].end_fraction = 0.1;
        boss.phases[2].spell = None;
        assert!(boss.validate().is_err());
    }

    #[test]
    fn spell_trigger_must_sit_inside_its_phase() {
        let mut boss = presets::kaguya(Difficulty::Normal);
        if let Some(spell) = boss.phases[0].spell.as_mut() {
            spell.trigger_fraction = 0.7;
        }
        assert!(boss.validate().is_err());
    }

    #[test]
    fn tables_survive_ron() {
        let tables = DifficultyTables::builtin();
        let text = ron::ser::to_string_pretty(&tables, Default::default()).expect("serialize");
        let parsed = DifficultyTables::from_ron_str(&text).expect("parse");
        assert_eq!(
            parsed.table(Difficulty::Hard).expect("hard").trash.health,
            15.0
        );
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Lunatic".parse::<Difficulty>().ok(), Some(Difficulty::Lunatic));
        assert!("extra".parse::<Difficulty>().is_err());
    }
}
