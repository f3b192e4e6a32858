//! The player ship: movement, shot volleys, bombs and invincibility.

use danmaku_shared::config::PlayerConfig;
use danmaku_shared::geometry::{Playfield, Rect};
use danmaku_shared::patterns::{
    PatternShape, PatternSpec, PatternState, ProjectileSpawn, StreamDef, emit,
};
use glam::Vec2;
use rand::Rng;

use crate::input::FrameInput;

/// Fixed geometry of the player's shot types.
pub mod defaults {
    /// Straight up the screen.
    pub const SHOT_DEG: f32 = -90.0;
    /// Horizontal offset of each needle from the ship's center.
    pub const NEEDLE_OFFSET_X: f32 = 5.0;
    pub const FOCUSED_WAYS: u32 = 5;
    pub const FOCUSED_SPREAD_DEG: f32 = 60.0;
}

#[derive(Debug, Clone)]
pub struct Player {
    pub position: Vec2,
    pub focused: bool,
    invincible_ticks: u32,
    shot_cooldown: u32,
    bomb_cooldown: u32,
}

impl Player {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            position: config.start,
            focused: false,
            invincible_ticks: 0,
            shot_cooldown: 0,
            bomb_cooldown: 0,
        }
    }

    /// Strict hitbox: a small square on the sprite's center.
    pub fn hitbox(&self, config: &PlayerConfig) -> Rect {
        Rect::from_center_size(self.position, Vec2::splat(config.hitbox_radius * 2.0))
    }

    /// Full sprite box, used to pick up items.
    pub fn collection_rect(&self, config: &PlayerConfig) -> Rect {
        Rect::from_center_size(self.position, config.size)
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_ticks > 0
    }

    pub fn invincible_ticks(&self) -> u32 {
        self.invincible_ticks
    }

    pub fn grant_invincibility(&mut self, ticks: u32) {
        self.invincible_ticks = self.invincible_ticks.max(ticks);
    }

    /// Count down invincibility and cooldowns by one tick.
    pub fn tick_timers(&mut self) {
        self.invincible_ticks = self.invincible_ticks.saturating_sub(1);
        self.shot_cooldown = self.shot_cooldown.saturating_sub(1);
        self.bomb_cooldown = self.bomb_cooldown.saturating_sub(1);
    }

    /// Move by the input vector and keep the sprite on the field.
    pub fn apply_movement(&mut self, input: &FrameInput, config: &PlayerConfig, playfield: &Playfield) {
        self.focused = input.focused;
        let speed = if input.focused {
            config.focused_speed
        } else {
            config.speed
        };
        let moved = self.collection_rect(config);
        let moved = Rect {
            center: moved.center + input.direction() * speed,
            ..moved
        };
        self.position = moved.clamped_inside(&playfield.rect()).center;
    }

    /// Shot volley for this tick, or nothing while the shot is cooling down.
    pub fn try_shoot<R: Rng + ?Sized>(&mut self, config: &PlayerConfig, rng: &mut R) -> Vec<ProjectileSpawn> {
        if self.shot_cooldown > 0 {
            return Vec::new();
        }
        self.shot_cooldown = config.shot_cooldown;
        let spec = self.shot_spec(config);
        emit(self.position, None, &spec, &mut PatternState::default(), rng)
    }

    fn shot_spec(&self, config: &PlayerConfig) -> PatternSpec {
        let nose = Vec2::new(0.0, -config.size.y * 0.5);
        if self.focused {
            PatternSpec::new(
                PatternShape::Fan {
                    count: defaults::FOCUSED_WAYS,
                    spread_deg: defaults::FOCUSED_SPREAD_DEG,
                    speed: config.shot_speed,
                    center_deg: defaults::SHOT_DEG,
                },
                config.amulet.clone(),
            )
            .with_offset(nose)
        } else {
            let needle = |x: f32| StreamDef {
                angle_deg: defaults::SHOT_DEG,
                offset: Vec2::new(x, 0.0),
            };
            PatternSpec::new(
                PatternShape::Streams {
                    streams: vec![
                        needle(-defaults::NEEDLE_OFFSET_X),
                        needle(defaults::NEEDLE_OFFSET_X),
                    ],
                    speed: config.shot_speed,
                },
                config.needle.clone(),
            )
            .with_offset(nose)
        }
    }

    pub fn bomb_ready(&self) -> bool {
        self.bomb_cooldown == 0
    }

    /// Start the bomb cooldown and its invincibility window. Stock is the
    /// ledger's business.
    pub fn start_bomb(&mut self, config: &PlayerConfig) {
        self.bomb_cooldown = config.bomb_cooldown;
        self.grant_invincibility(config.bomb_invincibility_ticks);
    }

    /// Back to the start position with a fresh invincibility window.
    pub fn respawn(&mut self, config: &PlayerConfig) {
        self.position = config.start;
        self.grant_invincibility(config.invincibility_ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use danmaku_shared::config::presets;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn focused_movement_is_slower_and_normalised() {
        let config = presets::player();
        let field = presets::PLAYFIELD;
        let mut player = Player::new(&config);
        let start = player.position;

        let input = FrameInput {
            movement: Vec2::new(1.0, 1.0),
            focused: true,
            ..Default::default()
        };
        player.apply_movement(&input, &config, &field);
        assert_abs_diff_eq!((player.position - start).length(), config.focused_speed, epsilon = 1e-4);
    }

    #[test]
    fn sprite_stays_inside_the_field() {
        let config = presets::player();
        let field = presets::PLAYFIELD;
        let mut player = Player::new(&config);
        let input = FrameInput {
            movement: Vec2::new(0.0, 1.0),
            ..Default::default()
        };
        for _ in 0..100 {
            player.apply_movement(&input, &config, &field);
        }
        assert_abs_diff_eq!(player.collection_rect(&config).bottom(), field.height);
    }

    #[test]
    fn shots_respect_cooldown_and_focus() {
        let config = presets::player();
        let mut rng = StdRng::seed_from_u64(3);
        let mut player = Player::new(&config);

        let needles = player.try_shoot(&config, &mut rng);
        assert_eq!(needles.len(), 2);
        assert!(needles.iter().all(|s| s.velocity.y < 0.0));
        assert!(player.try_shoot(&config, &mut rng).is_empty());

        for _ in 0..config.shot_cooldown {
            player.tick_timers();
        }
        player.focused = true;
        assert_eq!(player.try_shoot(&config, &mut rng).len(), 5);
    }
}
