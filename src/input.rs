//! Per-tick input handed to the core by whatever polls the devices.

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameInput {
    /// Desired direction; anything longer than 1 is normalised.
    pub movement: Vec2,
    pub focused: bool,
    pub shoot: bool,
    pub bomb: bool,
}

impl FrameInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn direction(&self) -> Vec2 {
        if !self.movement.is_finite() {
            return Vec2::ZERO;
        }
        if self.movement.length_squared() > 1.0 {
            self.movement.normalize()
        } else {
            self.movement
        }
    }
}
