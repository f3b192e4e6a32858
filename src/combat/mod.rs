//! Projectiles, pickups, the player ship and the collision pass.

mod collision;
mod item;
mod player;
mod projectile;

pub use collision::{CollisionResolver, PlayerHitOutcome};
pub use item::{Item, ItemField};
pub use player::Player;
pub use projectile::{Owner, Projectile, ProjectileField};
