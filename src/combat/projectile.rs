//! Projectile fields: linear motion and culling, nothing else.

use danmaku_shared::geometry::{Playfield, Rect};
use danmaku_shared::patterns::{BulletClass, ProjectileSpawn};
use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Enemy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub position: Vec2,
    pub velocity: Vec2,
    pub owner: Owner,
    pub class: BulletClass,
    /// Enemy projectiles only. Once set it is never re-evaluated.
    pub grazed: bool,
    pub damage: f32,
}

impl Projectile {
    pub fn from_spawn(spawn: ProjectileSpawn, owner: Owner, damage: f32) -> Self {
        Self {
            position: spawn.position,
            velocity: spawn.velocity,
            owner,
            class: spawn.class,
            grazed: false,
            damage,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.position, self.class.size)
    }

    /// Largest half extent, used as the bullet's radius for graze reach.
    pub fn radius(&self) -> f32 {
        self.class.size.max_element() * 0.5
    }
}

/// The live projectiles of one owner: an actor, the player, or the stray
/// field that inherits bullets from removed actors.
#[derive(Debug, Clone)]
pub struct ProjectileField {
    owner: Owner,
    damage: f32,
    projectiles: Vec<Projectile>,
}

impl ProjectileField {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            damage: 1.0,
            projectiles: Vec::new(),
        }
    }

    /// Damage carried by every projectile spawned from now on.
    pub fn with_damage(mut self, damage: f32) -> Self {
        self.damage = damage;
        self
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn spawn(&mut self, records: impl IntoIterator<Item = ProjectileSpawn>) {
        let (owner, damage) = (self.owner, self.damage);
        self.projectiles.extend(
            records
                .into_iter()
                .map(|spawn| Projectile::from_spawn(spawn, owner, damage)),
        );
    }

    pub fn advance_all(&mut self) {
        for p in &mut self.projectiles {
            p.position += p.velocity;
        }
    }

    /// Drop projectiles whose box has fully left the playfield and is not
    /// heading back in. Returns how many were removed.
    pub fn cull(&mut self, playfield: &Playfield) -> usize {
        let before = self.projectiles.len();
        self.projectiles
            .retain(|p| !playfield.has_left(&p.rect(), p.velocity));
        before - self.projectiles.len()
    }

    /// Take over every projectile of `other`, leaving it empty.
    pub fn absorb(&mut self, other: &mut ProjectileField) {
        self.projectiles.append(&mut other.projectiles);
    }

    pub fn clear(&mut self) -> usize {
        let n = self.projectiles.len();
        self.projectiles.clear();
        n
    }

    pub fn retain_mut(&mut self, f: impl FnMut(&mut Projectile) -> bool) {
        self.projectiles.retain_mut(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Projectile> {
        self.projectiles.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }
}
