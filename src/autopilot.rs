//! Scripted input source for headless runs.
//!
//! Not a good player: it shoots constantly, lines up under the nearest
//! target, sidesteps the closest incoming bullet and bombs when cornered.

use glam::Vec2;

use crate::actors::ActorKind;
use crate::input::FrameInput;
use crate::session::EncounterSession;

pub mod defaults {
    /// Bullets closer than this are dodged.
    pub const DANGER_RADIUS: f32 = 48.0;
    /// Bullets closer than this trigger a bomb.
    pub const PANIC_RADIUS: f32 = 10.0;
    /// Resting height above the bottom of the field.
    pub const HOME_INSET: f32 = 80.0;
}

#[derive(Debug, Clone, Default)]
pub struct Autopilot;

impl Autopilot {
    pub fn new() -> Self {
        Self
    }

    pub fn next_input(&mut self, session: &EncounterSession) -> FrameInput {
        let player = session.player();
        let me = player.position;
        let field = &session.config().playfield;

        let threat = session
            .enemy_projectiles()
            .map(|p| (p.position.distance(me), p))
            .filter(|(d, _)| *d < defaults::DANGER_RADIUS)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        let boss_up = session
            .director()
            .actors()
            .iter()
            .any(|a| a.kind == ActorKind::Boss && a.is_active());

        let movement = match threat {
            Some((_, bullet)) => {
                // Step sideways, away from the bullet's line of travel.
                let away = me - bullet.position;
                let side = if away.x.abs() < f32::EPSILON {
                    if me.x < field.width * 0.5 { 1.0 } else { -1.0 }
                } else {
                    away.x.signum()
                };
                Vec2::new(side, away.y.signum() * 0.5)
            }
            None => {
                let target_x = session
                    .director()
                    .actors()
                    .iter()
                    .filter(|a| a.is_active())
                    .min_by(|a, b| a.position.distance(me).total_cmp(&b.position.distance(me)))
                    .map_or(field.width * 0.5, |a| a.position.x);
                let home_y = field.height - defaults::HOME_INSET;
                Vec2::new(
                    ((target_x - me.x) * 0.2).clamp(-1.0, 1.0),
                    ((home_y - me.y) * 0.2).clamp(-1.0, 1.0),
                )
            }
        };

        let cornered = threat.is_some_and(|(d, _)| d < defaults::PANIC_RADIUS);
        FrameInput {
            movement,
            focused: boss_up && threat.is_none(),
            shoot: true,
            bomb: cornered && !player.is_invincible() && session.ledger().bombs() > 0,
        }
    }
}
