//! Pickups: falling items and the auto-collect pull.

use danmaku_shared::config::{ItemConfig, ItemKind};
use danmaku_shared::geometry::{Playfield, Rect, bearing};
use glam::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub position: Vec2,
    pub velocity: Vec2,
    pub kind: ItemKind,
    /// Sticky: once set the item homes on the player until collected.
    pub attracted: bool,
}

impl Item {
    pub fn rect(&self, config: &ItemConfig) -> Rect {
        Rect::from_center_size(self.position, config.size)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemField {
    items: Vec<Item>,
}

impl ItemField {
    pub fn spawn(&mut self, kind: ItemKind, position: Vec2) {
        self.items.push(Item {
            position,
            velocity: Vec2::ZERO,
            kind,
            attracted: false,
        });
    }

    /// Move every item one tick. A player above the auto-collect line marks
    /// all items attracted; attracted items re-aim at the player's current
    /// position every tick, the rest fall straight down.
    pub fn advance(&mut self, player: Vec2, config: &ItemConfig) {
        let band = player.y < config.auto_collect_line;
        for item in &mut self.items {
            item.attracted |= band;
            item.velocity = if item.attracted {
                bearing(item.position, player) * config.attraction_speed
            } else {
                Vec2::new(0.0, config.fall_speed)
            };
            item.position += item.velocity;
        }
    }

    pub fn cull(&mut self, playfield: &Playfield, config: &ItemConfig) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| !playfield.has_left(&item.rect(config), item.velocity));
        before - self.items.len()
    }

    pub fn retain(&mut self, f: impl FnMut(&Item) -> bool) {
        self.items.retain(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use danmaku_shared::config::presets;

    #[test]
    fn items_fall_until_the_player_enters_the_band() {
        let config = presets::items();
        let mut field = ItemField::default();
        field.spawn(ItemKind::Power, Vec2::new(100.0, 50.0));

        field.advance(Vec2::new(400.0, 500.0), &config);
        let item = field.iter().next().expect("item");
        assert_eq!(item.velocity, Vec2::new(0.0, config.fall_speed));
        assert!(!item.attracted);

        field.advance(Vec2::new(400.0, 100.0), &config);
        let item = field.iter().next().expect("item");
        assert!(item.attracted);
        assert_abs_diff_eq!(item.velocity.length(), config.attraction_speed, epsilon = 1e-4);
    }

    #[test]
    fn attraction_survives_leaving_the_band() {
        let config = presets::items();
        let mut field = ItemField::default();
        field.spawn(ItemKind::Score, Vec2::new(100.0, 50.0));
        field.advance(Vec2::new(400.0, 100.0), &config);
        field.advance(Vec2::new(400.0, 500.0), &config);
        let item = field.iter().next().expect("item");
        assert!(item.attracted);
        assert!(item.velocity.y > 0.0 && item.velocity.x > 0.0);
    }
}
