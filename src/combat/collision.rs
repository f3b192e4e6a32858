//! Collision pass, run once per tick after everything has moved.
//!
//! Order: player shots vs actors, then graze and lethal checks per enemy
//! projectile, then item pickup. Graze is evaluated before the lethal test
//! of the same projectile and never for one overlapping the strict hitbox.

use danmaku_shared::config::{EncounterConfig, ItemKind};
use danmaku_shared::ledger::{LifeLoss, ScoreLedger};
use tracing::debug;

use super::{ItemField, Player, ProjectileField};
use crate::actors::{Actor, ActorKind, DamageOutcome};
use crate::events::CoreEvent;

/// What the lethal check did to the player this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerHitOutcome {
    Unhurt,
    Hit { lives_left: u32 },
    OutOfLives,
}

impl PlayerHitOutcome {
    pub fn was_hit(&self) -> bool {
        !matches!(self, PlayerHitOutcome::Unhurt)
    }
}

pub struct CollisionResolver<'a> {
    config: &'a EncounterConfig,
}

impl<'a> CollisionResolver<'a> {
    pub fn new(config: &'a EncounterConfig) -> Self {
        Self { config }
    }

    /// Player shots against every targetable actor. A shot hits at most one
    /// actor and is destroyed on hit.
    pub fn player_shots_vs_actors(
        &self,
        shots: &mut ProjectileField,
        actors: &mut [Actor],
        ledger: &mut ScoreLedger,
        events: &mut Vec<CoreEvent>,
    ) {
        let ratio = self.config.collision.shrink_ratio;
        let scoring = &self.config.scoring;
        shots.retain_mut(|shot| {
            let shot_box = shot.rect().scaled(ratio);
            let Some(actor) = actors
                .iter_mut()
                .find(|a| a.is_active() && a.health() > 0.0 && a.rect().scaled(ratio).overlaps(&shot_box))
            else {
                return true;
            };

            let outcome = actor.take_damage(shot.damage);
            let (hit_score, kill_score) = match actor.kind {
                ActorKind::Boss => (scoring.boss_hit, 0),
                ActorKind::Trash => (scoring.trash_hit, scoring.trash_kill),
            };
            match outcome {
                DamageOutcome::Ignored => return true,
                DamageOutcome::Hit { remaining } => {
                    ledger.add_score(hit_score);
                    events.push(CoreEvent::EnemyHit {
                        actor: actor.id,
                        kind: actor.kind,
                        remaining,
                    });
                }
                DamageOutcome::Killed => {
                    ledger.add_score(hit_score + kill_score);
                    events.push(CoreEvent::EnemyHit {
                        actor: actor.id,
                        kind: actor.kind,
                        remaining: 0.0,
                    });
                }
            }
            false
        });
    }

    /// Graze and lethal checks of every enemy projectile against the player.
    /// After a lethal hit the player is invincible, so at most one life is
    /// lost per tick.
    pub fn enemy_shots_vs_player<'f>(
        &self,
        fields: impl IntoIterator<Item = &'f mut ProjectileField>,
        player: &mut Player,
        ledger: &mut ScoreLedger,
        events: &mut Vec<CoreEvent>,
    ) -> PlayerHitOutcome {
        let cfg = &self.config.player;
        let hitbox = player.hitbox(cfg);
        let center = player.position;
        let mut outcome = PlayerHitOutcome::Unhurt;

        for field in fields {
            field.retain_mut(|p| {
                let strict = hitbox.overlaps(&p.rect());
                if !p.grazed && !strict {
                    let reach = cfg.hitbox_radius + p.radius() + cfg.graze_margin;
                    if p.position.distance(center) <= reach {
                        p.grazed = true;
                        let total = ledger.add_graze();
                        ledger.add_score(self.config.scoring.graze);
                        events.push(CoreEvent::Graze { total });
                    }
                }

                if !strict || player.is_invincible() || outcome.was_hit() {
                    return true;
                }

                let lives_left = match ledger.lose_life() {
                    LifeLoss::Remaining(left) => {
                        outcome = PlayerHitOutcome::Hit { lives_left: left };
                        left
                    }
                    LifeLoss::OutOfLives => {
                        outcome = PlayerHitOutcome::OutOfLives;
                        0
                    }
                };
                events.push(CoreEvent::PlayerHit { lives_left });
                debug!(lives_left, "player hit");
                false
            });
        }

        if outcome.was_hit() {
            player.respawn(cfg);
        }
        outcome
    }

    /// Items touching the player's collection box are picked up.
    pub fn player_vs_items(
        &self,
        items: &mut ItemField,
        player: &Player,
        ledger: &mut ScoreLedger,
        events: &mut Vec<CoreEvent>,
    ) {
        let cfg = &self.config.items;
        let collect = player.collection_rect(&self.config.player);
        items.retain(|item| {
            if !collect.overlaps(&item.rect(cfg)) {
                return true;
            }
            match item.kind {
                ItemKind::Score => {
                    ledger.add_score(cfg.score_value);
                }
                ItemKind::Power => {
                    ledger.add_power(cfg.power_value);
                }
                ItemKind::Bomb => {
                    ledger.add_bomb();
                }
            }
            events.push(CoreEvent::ItemCollected { kind: item.kind });
            debug!(kind = ?item.kind, "item collected");
            false
        });
    }
}
