//! One scheduling cycle of the league.
//!
//! A [`Generation`] walks through its phases in a fixed order and becomes
//! read-only once sealed. Each mutator checks the current phase, so an
//! out-of-order step surfaces as a [`LeagueError`] instead of silently
//! corrupting the record.

use engine_config::DrawWeighting;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::{AgentId, Roster};
use crate::episode::{EpisodeOutcome, TerminalReason};
use crate::error::LeagueError;
use crate::schedule::ScheduledMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Scheduling,
    Running,
    Aggregating,
    ChallengerCheck,
    WildcardCheck,
    Checkpointing,
    Sealed,
}

impl Phase {
    /// The only phase that may follow this one.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Scheduling => Some(Phase::Running),
            Phase::Running => Some(Phase::Aggregating),
            Phase::Aggregating => Some(Phase::ChallengerCheck),
            Phase::ChallengerCheck => Some(Phase::WildcardCheck),
            Phase::WildcardCheck => Some(Phase::Checkpointing),
            Phase::Checkpointing => Some(Phase::Sealed),
            Phase::Sealed => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Scheduling => "scheduling",
            Phase::Running => "running",
            Phase::Aggregating => "aggregating",
            Phase::ChallengerCheck => "challenger_check",
            Phase::WildcardCheck => "wildcard_check",
            Phase::Checkpointing => "checkpointing",
            Phase::Sealed => "sealed",
        };
        f.write_str(s)
    }
}

/// Counters for the training episodes of one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub index: u64,
    pub scheduled: u32,
    pub completed: u32,
    pub failed: u32,
    /// Plies over completed episodes
    pub plies: u64,
    pub first_wins: u32,
    pub second_wins: u32,
    pub draws: u32,
    /// Draws caused by the move cap (included in `draws`)
    pub move_cap_draws: u32,
    /// Rejected candidates over all episodes, failed ones included
    pub violations: u64,
    pub weight_updates: u32,
}

impl GenerationStats {
    pub fn from_outcomes<S, M>(index: u64, outcomes: &[EpisodeOutcome<S, M>]) -> Self {
        let mut stats = Self {
            index,
            scheduled: outcomes.len() as u32,
            ..Self::default()
        };
        for outcome in outcomes {
            stats.violations += outcome.violations.len() as u64;
            let Some(result) = outcome.result() else {
                stats.failed += 1;
                continue;
            };
            stats.completed += 1;
            stats.plies += outcome.plies.len() as u64;
            match result.winner {
                Some(engine_core::Side::First) => stats.first_wins += 1,
                Some(engine_core::Side::Second) => stats.second_wins += 1,
                None => {
                    stats.draws += 1;
                    if result.reason == TerminalReason::MoveCap {
                        stats.move_cap_draws += 1;
                    }
                }
            }
        }
        stats
    }
}

/// Tally of a head-to-head series from one agent's perspective.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesScore {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Games that did not finish
    pub failed: u32,
}

impl SeriesScore {
    pub fn record(&mut self, reward: Option<f32>) {
        match reward {
            Some(r) if r > 0.0 => self.wins += 1,
            Some(r) if r < 0.0 => self.losses += 1,
            Some(_) => self.draws += 1,
            None => self.failed += 1,
        }
    }

    pub fn completed(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    /// `(wins + w * draws) / completed`, or 0 with no completed games.
    pub fn rate(&self, weighting: DrawWeighting) -> f64 {
        let games = self.completed();
        if games == 0 {
            return 0.0;
        }
        (self.wins as f64 + weighting.weight() * self.draws as f64) / games as f64
    }
}

/// Result of a challenger series, kept even when it is incomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengerReport {
    pub generation: u64,
    pub challenger: AgentId,
    pub champion: AgentId,
    pub games: u32,
    /// From the challenger's perspective
    pub score: SeriesScore,
    pub win_rate: f64,
    pub threshold: f64,
    pub promoted: bool,
}

/// Result of a wildcard audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WildcardReport {
    pub generation: u64,
    pub wildcard: AgentId,
    pub champion: AgentId,
    pub games: u32,
    /// From the Champion's perspective
    pub score: SeriesScore,
    pub champion_score: f64,
    /// Least-squares slope of recent audit scores
    pub trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Promoted(ChallengerReport),
    Defended(ChallengerReport),
    ChallengerSkipped {
        reason: String,
        partial: Option<ChallengerReport>,
    },
    WildcardRecorded(WildcardReport),
    WildcardSkipped {
        reason: String,
        partial: Option<WildcardReport>,
    },
}

/// Record of one generation.
#[derive(Debug, Clone)]
pub struct Generation<S, M> {
    index: u64,
    roster: Roster,
    matches: Vec<ScheduledMatch>,
    outcomes: Vec<EpisodeOutcome<S, M>>,
    decisions: Vec<Decision>,
    stats: GenerationStats,
    phase: Phase,
}

impl<S, M> Generation<S, M> {
    /// Open a generation with a snapshot of the roster at its start.
    pub fn new(index: u64, roster: Roster) -> Self {
        Self {
            index,
            roster,
            matches: Vec::new(),
            outcomes: Vec::new(),
            decisions: Vec::new(),
            stats: GenerationStats {
                index,
                ..GenerationStats::default()
            },
            phase: Phase::Scheduling,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_sealed(&self) -> bool {
        self.phase == Phase::Sealed
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn matches(&self) -> &[ScheduledMatch] {
        &self.matches
    }

    pub fn outcomes(&self) -> &[EpisodeOutcome<S, M>] {
        &self.outcomes
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    /// Move to the next phase. Skipping or repeating a phase is an error.
    pub fn advance(&mut self, to: Phase) -> Result<(), LeagueError> {
        if self.is_sealed() {
            return Err(LeagueError::Sealed(self.index));
        }
        if self.phase.next() != Some(to) {
            return Err(LeagueError::PhaseOrder {
                generation: self.index,
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }

    pub fn seal(&mut self) -> Result<(), LeagueError> {
        self.advance(Phase::Sealed)
    }

    pub fn set_matches(&mut self, matches: Vec<ScheduledMatch>) -> Result<(), LeagueError> {
        self.expect(Phase::Scheduling)?;
        self.matches = matches;
        Ok(())
    }

    pub fn record_outcomes(
        &mut self,
        outcomes: Vec<EpisodeOutcome<S, M>>,
    ) -> Result<(), LeagueError> {
        self.expect(Phase::Running)?;
        self.outcomes = outcomes;
        Ok(())
    }

    pub fn set_stats(&mut self, stats: GenerationStats) -> Result<(), LeagueError> {
        self.expect(Phase::Aggregating)?;
        self.stats = stats;
        Ok(())
    }

    pub fn decide(&mut self, decision: Decision) -> Result<(), LeagueError> {
        let expected = match decision {
            Decision::Promoted(_) | Decision::Defended(_) | Decision::ChallengerSkipped { .. } => {
                Phase::ChallengerCheck
            }
            Decision::WildcardRecorded(_) | Decision::WildcardSkipped { .. } => {
                Phase::WildcardCheck
            }
        };
        self.expect(expected)?;
        self.decisions.push(decision);
        Ok(())
    }

    fn expect(&self, phase: Phase) -> Result<(), LeagueError> {
        if self.is_sealed() {
            return Err(LeagueError::Sealed(self.index));
        }
        if self.phase != phase {
            return Err(LeagueError::PhaseOrder {
                generation: self.index,
                from: self.phase,
                to: phase,
            });
        }
        Ok(())
    }
}
