//! Score ledger: the single writer of score, power, graze, bombs and lives.

use serde::{Deserialize, Serialize};

/// Caps and starting stock for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLimits {
    pub max_power: u32,
    pub max_bombs: u32,
    pub start_lives: u32,
    pub start_bombs: u32,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_power: 128,
            max_bombs: 8,
            start_lives: 3,
            start_bombs: 2,
        }
    }
}

/// What a lost life left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeLoss {
    Remaining(u32),
    OutOfLives,
}

/// Read-only view for the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub score: u64,
    pub power: u32,
    pub graze: u32,
    pub bombs: u32,
    pub lives: u32,
    pub spell_bonuses: u32,
}

#[derive(Debug, Clone)]
pub struct ScoreLedger {
    limits: LedgerLimits,
    score: u64,
    power: u32,
    graze: u32,
    bombs: u32,
    lives: u32,
    spell_bonuses: u32,
}

impl ScoreLedger {
    pub fn new(limits: LedgerLimits) -> Self {
        Self {
            limits,
            score: 0,
            power: 0,
            graze: 0,
            bombs: limits.start_bombs.min(limits.max_bombs),
            lives: limits.start_lives,
            spell_bonuses: 0,
        }
    }

    pub fn limits(&self) -> &LedgerLimits {
        &self.limits
    }

    pub fn add_score(&mut self, points: u64) -> u64 {
        self.score = self.score.saturating_add(points);
        self.score
    }

    /// Add power up to the cap. Returns the amount actually applied.
    pub fn add_power(&mut self, amount: u32) -> u32 {
        let before = self.power;
        self.power = self.power.saturating_add(amount).min(self.limits.max_power);
        self.power - before
    }

    pub fn add_graze(&mut self) -> u32 {
        self.graze = self.graze.saturating_add(1);
        self.graze
    }

    /// Add one bomb stock. Returns false when already at the cap.
    pub fn add_bomb(&mut self) -> bool {
        if self.bombs >= self.limits.max_bombs {
            return false;
        }
        self.bombs += 1;
        true
    }

    /// Spend one bomb stock if there is one.
    pub fn use_bomb(&mut self) -> bool {
        if self.bombs == 0 {
            return false;
        }
        self.bombs -= 1;
        true
    }

    pub fn lose_life(&mut self) -> LifeLoss {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            LifeLoss::OutOfLives
        } else {
            LifeLoss::Remaining(self.lives)
        }
    }

    /// Spell-card capture bonus; counted separately for the results screen.
    pub fn award_spell_bonus(&mut self, bonus: u64) -> u64 {
        self.spell_bonuses += 1;
        self.add_score(bonus)
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn graze(&self) -> u32 {
        self.graze
    }

    pub fn bombs(&self) -> u32 {
        self.bombs
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn is_out_of_lives(&self) -> bool {
        self.lives == 0
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            score: self.score,
            power: self.power,
            graze: self.graze,
            bombs: self.bombs,
            lives: self.lives,
            spell_bonuses: self.spell_bonuses,
        }
    }
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self::new(LedgerLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_clamps_at_cap() {
        let mut ledger = ScoreLedger::default();
        ledger.add_power(120);
        assert_eq!(ledger.add_power(5), 5);
        assert_eq!(ledger.power(), 125);
        assert_eq!(ledger.add_power(5), 3);
        assert_eq!(ledger.power(), 128);
    }

    #[test]
    fn bombs_respect_cap_and_stock() {
        let mut ledger = ScoreLedger::new(LedgerLimits {
            max_bombs: 3,
            start_bombs: 2,
            ..Default::default()
        });
        assert!(ledger.add_bomb());
        assert!(!ledger.add_bomb());
        assert_eq!(ledger.bombs(), 3);
        for _ in 0..3 {
            assert!(ledger.use_bomb());
        }
        assert!(!ledger.use_bomb());
    }

    #[test]
    fn last_life_reports_out_of_lives() {
        let mut ledger = ScoreLedger::default();
        assert_eq!(ledger.lose_life(), LifeLoss::Remaining(2));
        assert_eq!(ledger.lose_life(), LifeLoss::Remaining(1));
        assert_eq!(ledger.lose_life(), LifeLoss::OutOfLives);
        assert!(ledger.is_out_of_lives());
    }
}
