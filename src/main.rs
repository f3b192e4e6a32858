use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use danmaku::autopilot::Autopilot;
use danmaku::shared::config::{Difficulty, DifficultyTables};
use danmaku::telemetry::{self, EventLog};
use danmaku::{CoreEvent, EncounterSession, StageOutcome};
use tracing::info;

/// Run one encounter headlessly with the autopilot at the controls.
#[derive(Debug, Parser)]
#[command(name = "danmaku", version, about)]
struct Cli {
    #[arg(long, default_value_t = Difficulty::Normal)]
    difficulty: Difficulty,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Stop after this many ticks (60 per second).
    #[arg(long, default_value_t = 60 * 60 * 5)]
    ticks: u64,
    /// RON file with difficulty tables; built-in presets otherwise.
    #[arg(long)]
    tables: Option<PathBuf>,
    /// Print a RON snapshot every N ticks.
    #[arg(long)]
    snapshot_every: Option<u64>,
    /// Log filter, e.g. `debug` or `danmaku=trace`.
    #[arg(long)]
    log: Option<String>,
}

#[derive(Debug, Default)]
struct Tally {
    kills: u32,
    hits_taken: u32,
    cards_captured: u32,
    cards_failed: u32,
}

impl Tally {
    fn record(&mut self, event: &CoreEvent) {
        match event {
            CoreEvent::EnemyDestroyed { .. } => self.kills += 1,
            CoreEvent::PlayerHit { .. } => self.hits_taken += 1,
            CoreEvent::SpellCardCaptured { .. } => self.cards_captured += 1,
            CoreEvent::SpellCardFailed { .. } => self.cards_failed += 1,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log.as_deref())?;

    let tables = match &cli.tables {
        Some(path) => DifficultyTables::load(path)
            .with_context(|| format!("loading tables from {}", path.display()))?,
        None => DifficultyTables::builtin(),
    };
    let mut session = EncounterSession::from_tables(&tables, cli.difficulty, cli.seed)?;
    session.subscribe(EventLog);

    let mut pilot = Autopilot::new();
    let mut tally = Tally::default();
    let mut outcome = None;
    let pretty = ron::ser::PrettyConfig::default();

    for _ in 0..cli.ticks {
        let input = pilot.next_input(&session);
        let report = session.tick(&input);
        report.events.iter().for_each(|e| tally.record(e));

        if let Some(every) = cli.snapshot_every.filter(|n| *n > 0) {
            if report.tick % every == 0 {
                println!("{}", ron::ser::to_string_pretty(&session.snapshot(), pretty.clone())?);
            }
        }
        if report.outcome.is_some() {
            outcome = report.outcome;
            break;
        }
    }

    let ledger = session.ledger().snapshot();
    let result = match outcome {
        Some(StageOutcome::Cleared) => "cleared",
        Some(StageOutcome::Failed) => "failed",
        None => "timed out",
    };
    info!(
        result,
        ticks = session.tick_count(),
        score = ledger.score,
        lives = ledger.lives,
        graze = ledger.graze,
        kills = tally.kills,
        "encounter finished"
    );
    println!(
        "{result} after {} ticks: score {} | power {} | graze {} | lives {} | bombs {} | kills {} | hits {} | cards {}/{}",
        session.tick_count(),
        ledger.score,
        ledger.power,
        ledger.graze,
        ledger.lives,
        ledger.bombs,
        tally.kills,
        tally.hits_taken,
        tally.cards_captured,
        tally.cards_captured + tally.cards_failed,
    );
    Ok(())
}
