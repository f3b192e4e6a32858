use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use danmaku::actors::{Actor, ActorContext, ActorState};
use danmaku::autopilot::Autopilot;
use danmaku::shared::config::{ConfigError, Difficulty, DifficultyTables, ItemKind, presets};
use danmaku::shared::geometry::Playfield;
use danmaku::shared::ledger::ScoreLedger;
use danmaku::shared::patterns::{BulletClass, PatternShape, ProjectileSpawn};
use danmaku::{CoreEvent, EncounterSession, EventListener, FrameInput, SessionError, StageOutcome};
use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn session(difficulty: Difficulty, seed: u64) -> EncounterSession {
    EncounterSession::from_tables(&DifficultyTables::builtin(), difficulty, seed).expect("builtin tables are valid")
}

fn still_bullet(position: Vec2) -> ProjectileSpawn {
    ProjectileSpawn {
        position,
        velocity: Vec2::ZERO,
        class: BulletClass::new("test", Vec2::splat(8.0)),
    }
}

struct Rig {
    rng: StdRng,
    ledger: ScoreLedger,
    events: Vec<CoreEvent>,
    playfield: Playfield,
    tick: u64,
}

impl Rig {
    fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(7),
            ledger: ScoreLedger::default(),
            events: Vec::new(),
            playfield: presets::PLAYFIELD,
            tick: 0,
        }
    }

    fn step(&mut self, actor: &mut Actor) {
        self.tick += 1;
        let mut ctx = ActorContext {
            tick: self.tick,
            player: Vec2::new(400.0, 540.0),
            playfield: &self.playfield,
            rng: &mut self.rng,
            ledger: &mut self.ledger,
            events: &mut self.events,
        };
        actor.tick(&mut ctx);
    }
}

#[test]
fn boss_spell_is_broken_by_phase_threshold() {
    let config = presets::kaguya(Difficulty::Normal);
    assert_eq!(config.health, 500.0);

    let mut rig = Rig::new();
    let mut boss = Actor::boss(1, &config);
    while boss.state() == ActorState::Entering {
        rig.step(&mut boss);
    }
    let thresholds: Vec<f32> = boss.phases().iter().map(|p| p.end_health).collect();
    assert_eq!(thresholds, vec![375.0, 200.0, 0.0]);
    assert_eq!(boss.phases()[0].spell_trigger, Some(425.0));

    // 76 shots of player fire: 500 -> 424.
    for _ in 0..76 {
        boss.take_damage(1.0);
    }
    assert_eq!(boss.health(), 424.0);
    rig.step(&mut boss);
    assert_eq!(boss.state(), ActorState::SpellIntro);

    while boss.state() == ActorState::SpellIntro {
        rig.step(&mut boss);
    }
    assert_eq!(boss.state(), ActorState::SpellActive);

    for _ in 0..49 {
        boss.take_damage(1.0);
    }
    assert_eq!(boss.health(), 375.0);
    rig.step(&mut boss);

    assert_eq!(boss.phase(), 2);
    assert_eq!(boss.state(), ActorState::NonSpellActive);
    assert!(boss.spell_card().is_none());
    assert_eq!(rig.ledger.score(), 0);
    assert!(rig.events.iter().any(|e| matches!(e, CoreEvent::SpellCardFailed { .. })));
    assert!(rig.events.contains(&CoreEvent::PhaseChanged { actor: 1, phase: 2 }));
}

#[test]
fn missing_table_fails_session_start() {
    let mut tables = DifficultyTables::builtin();
    tables.0.remove(&Difficulty::Hard);
    let err = EncounterSession::from_tables(&tables, Difficulty::Hard, 1).err();
    assert!(matches!(
        err,
        Some(SessionError::Config(ConfigError::MissingDifficulty(Difficulty::Hard)))
    ));
}

#[test]
fn invalid_table_fails_session_start() {
    let mut config = presets::encounter(Difficulty::Normal);
    config.trash.health = 0.0;
    assert!(matches!(
        EncounterSession::new(config, 1),
        Err(SessionError::Config(ConfigError::Invalid { .. }))
    ));

    let mut config = presets::encounter(Difficulty::Normal);
    if let PatternShape::Scatter { jitter_deg, .. } = &mut config.bosses[0].phases[0].non_spell.attacks[1].volley[0].shape {
        *jitter_deg = f32::INFINITY;
    }
    assert!(matches!(
        EncounterSession::new(config, 1),
        Err(SessionError::Config(ConfigError::Invalid { .. }))
    ));

    let mut config = presets::encounter(Difficulty::Normal);
    config.bosses.clear();
    assert!(matches!(EncounterSession::new(config, 1), Err(SessionError::NoBosses)));
}

#[test]
fn attracted_item_heads_for_the_player_at_fixed_speed() {
    let mut session = session(Difficulty::Normal, 3);
    let attraction = session.config().items.attraction_speed;
    session.player_mut().position = Vec2::new(400.0, 100.0);
    let start = Vec2::new(100.0, 20.0);
    session.items_mut().spawn(ItemKind::Score, start);

    session.tick(&FrameInput::idle());

    let player = session.player().position;
    let item = session.items().iter().next().expect("item still falling");
    assert!(item.attracted);
    assert_abs_diff_eq!(item.velocity.length(), attraction, epsilon = 1e-4);
    let expected = (player - start).normalize() * attraction;
    assert_abs_diff_eq!(item.velocity.x, expected.x, epsilon = 1e-4);
    assert_abs_diff_eq!(item.velocity.y, expected.y, epsilon = 1e-4);
}

#[test]
fn bomb_clears_enemy_bullets_and_spends_stock() {
    let mut session = session(Difficulty::Normal, 4);
    let bombs = session.ledger().bombs();
    session
        .stray_projectiles_mut()
        .spawn((0..10).map(|i| still_bullet(Vec2::new(100.0 + 20.0 * i as f32, 200.0))));

    let report = session.tick(&FrameInput {
        bomb: true,
        ..Default::default()
    });

    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, CoreEvent::BombActivated { cleared: 10, .. })));
    assert_eq!(session.enemy_projectiles().count(), 0);
    assert_eq!(session.ledger().bombs(), bombs - 1);
    assert!(session.player().is_invincible());
}

#[test]
fn losing_the_last_life_fails_the_stage() {
    let mut session = session(Difficulty::Normal, 5);
    let mut failed = false;
    for _ in 0..2_000 {
        if !session.player().is_invincible() {
            let at = session.player().position;
            session.stray_projectiles_mut().spawn([still_bullet(at)]);
        }
        let report = session.tick(&FrameInput::idle());
        if report.outcome == Some(StageOutcome::Failed) {
            assert!(report.events.contains(&CoreEvent::StageFailed));
            failed = true;
            break;
        }
    }
    assert!(failed);
    assert_eq!(session.ledger().lives(), 0);

    let after = session.tick(&FrameInput::idle());
    assert!(after.events.is_empty());
    assert_eq!(after.outcome, Some(StageOutcome::Failed));
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<CoreEvent>>>);

impl EventListener for Recorder {
    fn on_event(&mut self, _tick: u64, event: &CoreEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

#[test]
fn listeners_see_the_same_events_as_reports() {
    let mut session = session(Difficulty::Lunatic, 6);
    let recorder = Recorder::default();
    session.subscribe(recorder.clone());

    let mut pilot = Autopilot::new();
    let mut reported = Vec::new();
    for _ in 0..600 {
        let input = pilot.next_input(&session);
        reported.extend(session.tick(&input).events);
    }
    assert_eq!(*recorder.0.borrow(), reported);
}

#[test]
fn same_seed_same_encounter() {
    let run = |seed| {
        let mut session = session(Difficulty::Hard, seed);
        let mut pilot = Autopilot::new();
        for _ in 0..1_500 {
            let input = pilot.next_input(&session);
            session.tick(&input);
        }
        session.snapshot()
    };
    assert_eq!(run(99), run(99));
}

#[test]
fn autopilot_run_keeps_actor_invariants() {
    let mut session = session(Difficulty::Easy, 8);
    let mut pilot = Autopilot::new();
    let mut phases: HashMap<u64, usize> = HashMap::new();
    let mut activations = 0;
    let mut captures = 0;

    for _ in 0..4_000 {
        let input = pilot.next_input(&session);
        let report = session.tick(&input);
        for event in &report.events {
            match event {
                CoreEvent::SpellCardActivated { .. } => activations += 1,
                CoreEvent::SpellCardCaptured { .. } => captures += 1,
                _ => {}
            }
        }
        for actor in session.director().actors() {
            assert!(actor.health() >= 0.0 && actor.health() <= actor.max_health());
            assert!(actor.phase() <= actor.last_phase());
            let seen = phases.entry(actor.id).or_insert(actor.phase());
            assert!(actor.phase() >= *seen);
            *seen = actor.phase();
        }
        if report.outcome.is_some() {
            break;
        }
    }
    assert!(captures <= activations);
    assert_eq!(session.ledger().snapshot().spell_bonuses as usize, captures);
}
