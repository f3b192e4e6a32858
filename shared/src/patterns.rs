//! Bullet pattern generator.
//!
//! Pure functions: an origin, an optional aim target and a [`PatternSpec`]
//! go in, a list of [`ProjectileSpawn`] records comes out. Rotating shapes
//! keep their angle in a caller-owned [`PatternState`]; nothing is stored here.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::geometry::{DOWN_DEG, bearing_deg, unit_from_deg, wrap_deg};

/// Visual class of a projectile. `size` doubles as its hit box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletClass {
    pub sprite: SmolStr,
    pub size: Vec2,
}

impl BulletClass {
    pub fn new(sprite: &str, size: Vec2) -> Self {
        Self {
            sprite: SmolStr::new(sprite),
            size,
        }
    }
}

/// One projectile to be inserted into a field.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpawn {
    pub position: Vec2,
    pub velocity: Vec2,
    pub class: BulletClass,
}

/// Rotation memory for one pattern slot. Owned by the firing actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternState {
    pub rotation_deg: f32,
}

/// A fixed-heading stream with its own spawn offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDef {
    pub angle_deg: f32,
    #[serde(default)]
    pub offset: Vec2,
}

fn one() -> u32 {
    1
}

fn down() -> f32 {
    DOWN_DEG
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternShape {
    /// `count` bullets evenly spaced over 360°, starting at the slot's
    /// rotation. `turn_deg` advances the rotation after every call;
    /// `random_offset` adds a fresh offset within one bullet gap.
    /// Extra `layers` repeat the ring further out and faster.
    Ring {
        count: u32,
        speed: f32,
        #[serde(default)]
        turn_deg: f32,
        #[serde(default)]
        random_offset: bool,
        #[serde(default = "one")]
        layers: u32,
        #[serde(default)]
        layer_speed_step: f32,
        #[serde(default)]
        layer_spacing: f32,
    },
    /// `count` bullets over `spread_deg`, centered on the bearing to the aim
    /// target.
    AimedCone {
        count: u32,
        spread_deg: f32,
        speed: f32,
    },
    /// Like a cone but around a fixed heading (default straight down).
    Fan {
        count: u32,
        spread_deg: f32,
        speed: f32,
        #[serde(default = "down")]
        center_deg: f32,
    },
    /// Multi-arm spiral. Arms start at the slot's rotation, which advances by
    /// `turn_deg` per call.
    Spiral {
        arms: u32,
        bullets_per_arm: u32,
        arm_step_deg: f32,
        base_radius: f32,
        radial_step: f32,
        speed: f32,
        turn_deg: f32,
    },
    /// One bullet per stream at a fixed heading.
    Streams { streams: Vec<StreamDef>, speed: f32 },
    /// Bullets around the aim bearing (or straight down) with random angular
    /// jitter and speed.
    Scatter {
        count: u32,
        jitter_deg: f32,
        speed_min: f32,
        speed_max: f32,
        #[serde(default)]
        aimed: bool,
    },
    /// Streams fanned around a random heading; bullets within a stream bend
    /// by `bullet_step_deg` and speed up by `speed_step`.
    Branch {
        streams: u32,
        bullets_per_stream: u32,
        stream_spread_deg: f32,
        bullet_step_deg: f32,
        speed: f32,
        speed_step: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub shape: PatternShape,
    pub class: BulletClass,
    /// Spawn offset from the firing actor's center.
    #[serde(default)]
    pub offset: Vec2,
    /// Each bullet gains a random extra speed in `[0, speed_jitter]`.
    #[serde(default)]
    pub speed_jitter: f32,
}

impl PatternSpec {
    pub fn new(shape: PatternShape, class: BulletClass) -> Self {
        Self {
            shape,
            class,
            offset: Vec2::ZERO,
            speed_jitter: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_speed_jitter(mut self, jitter: f32) -> Self {
        self.speed_jitter = jitter;
        self
    }

    /// Upper bound of bullets a single call can produce.
    pub fn bullet_count(&self) -> usize {
        match &self.shape {
            PatternShape::Ring { count, layers, .. } => (*count as usize) * (*layers as usize),
            PatternShape::AimedCone { count, .. }
            | PatternShape::Fan { count, .. }
            | PatternShape::Scatter { count, .. } => *count as usize,
            PatternShape::Spiral {
                arms,
                bullets_per_arm,
                ..
            } => (*arms as usize) * (*bullets_per_arm as usize),
            PatternShape::Streams { streams, .. } => streams.len(),
            PatternShape::Branch {
                streams,
                bullets_per_stream,
                ..
            } => (*streams as usize) * (*bullets_per_stream as usize),
        }
    }
}

/// Angles of `count` bullets spread over `spread` degrees around `center`.
/// A single bullet flies at `center`; an even count straddles it.
pub fn spread_angles(center: f32, spread: f32, count: u32) -> impl Iterator<Item = f32> {
    let (start, step) = if count <= 1 {
        (center, 0.0)
    } else {
        (center - spread * 0.5, spread / (count - 1) as f32)
    };
    (0..count).map(move |i| start + step * i as f32)
}

/// Generate the spawn records for one pattern call.
pub fn emit<R: Rng + ?Sized>(
    origin: Vec2,
    aim: Option<Vec2>,
    spec: &PatternSpec,
    state: &mut PatternState,
    rng: &mut R,
) -> Vec<ProjectileSpawn> {
    let center = origin + spec.offset;
    let aim_deg = || aim.map_or(DOWN_DEG, |target| bearing_deg(center, target));

    let mut out = Vec::with_capacity(spec.bullet_count());
    let mut push = |position: Vec2, angle_deg: f32, speed: f32| {
        out.push(ProjectileSpawn {
            position,
            velocity: unit_from_deg(angle_deg) * speed,
            class: spec.class.clone(),
        });
    };

    match &spec.shape {
        PatternShape::Ring {
            count,
            speed,
            turn_deg,
            random_offset,
            layers,
            layer_speed_step,
            layer_spacing,
        } => {
            if *count > 0 {
                let gap = 360.0 / *count as f32;
                let mut base = state.rotation_deg;
                if *random_offset {
                    base += rng.random_range(0.0..=gap);
                }
                for layer in 0..*layers {
                    let k = layer as f32;
                    for i in 0..*count {
                        let angle = base + gap * i as f32;
                        let pos = center + unit_from_deg(angle) * (layer_spacing * k);
                        push(pos, angle, speed + layer_speed_step * k);
                    }
                }
            }
            state.rotation_deg = wrap_deg(state.rotation_deg + turn_deg);
        }
        PatternShape::AimedCone {
            count,
            spread_deg,
            speed,
        } => {
            for angle in spread_angles(aim_deg(), *spread_deg, *count) {
                push(center, angle, *speed);
            }
        }
        PatternShape::Fan {
            count,
            spread_deg,
            speed,
            center_deg,
        } => {
            for angle in spread_angles(*center_deg, *spread_deg, *count) {
                push(center, angle, *speed);
            }
        }
        PatternShape::Spiral {
            arms,
            bullets_per_arm,
            arm_step_deg,
            base_radius,
            radial_step,
            speed,
            turn_deg,
        } => {
            if *arms > 0 {
                let arm_gap = 360.0 / *arms as f32;
                for arm in 0..*arms {
                    let arm_deg = state.rotation_deg + arm_gap * arm as f32;
                    for j in 0..*bullets_per_arm {
                        let angle = arm_deg + arm_step_deg * j as f32;
                        let dist = base_radius + radial_step * j as f32;
                        push(center + unit_from_deg(angle) * dist, angle, *speed);
                    }
                }
            }
            state.rotation_deg = wrap_deg(state.rotation_deg + turn_deg);
        }
        PatternShape::Streams { streams, speed } => {
            for stream in streams {
                push(center + stream.offset, stream.angle_deg, *speed);
            }
        }
        PatternShape::Scatter {
            count,
            jitter_deg,
            speed_min,
            speed_max,
            aimed,
        } => {
            let heading = if *aimed { aim_deg() } else { DOWN_DEG };
            let jitter = jitter_deg.abs();
            let (lo, hi) = (speed_min.min(*speed_max), speed_min.max(*speed_max));
            for _ in 0..*count {
                let angle = heading + rng.random_range(-jitter..=jitter);
                let speed = rng.random_range(lo..=hi);
                push(center, angle, speed);
            }
        }
        PatternShape::Branch {
            streams,
            bullets_per_stream,
            stream_spread_deg,
            bullet_step_deg,
            speed,
            speed_step,
        } => {
            let heading = rng.random_range(0.0..360.0_f32);
            for base in spread_angles(heading, *stream_spread_deg, *streams) {
                for j in 0..*bullets_per_stream {
                    let k = j as f32;
                    push(center, base + bullet_step_deg * k, speed + speed_step * k);
                }
            }
        }
    }

    if spec.speed_jitter > 0.0 {
        for spawn in &mut out {
            let extra = rng.random_range(0.0..=spec.speed_jitter);
            spawn.velocity += spawn.velocity.normalize_or_zero() * extra;
        }
    }
    out
}
