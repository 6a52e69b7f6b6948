//! League-wide statistics.
//!
//! Cumulative counters over every sealed generation, plus the wildcard trend
//! and a violation summary. The whole struct is serializable and travels in
//! each checkpoint, so a resumed league keeps its history.

use serde::{Deserialize, Serialize};
use tracing::info;
use validation::ViolationSummary;

use crate::generation::{Decision, GenerationStats};

/// One wildcard audit result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub generation: u64,
    /// Champion's score rate against the fresh baseline
    pub champion_score: f64,
    pub games: u32,
}

/// Least-squares slope of `champion_score` over `generation`.
///
/// `None` with fewer than two points or when every point has the same
/// generation.
pub fn trend_slope(points: &[TrendPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.generation as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.champion_score).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for p in points {
        let dx = p.generation as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (p.champion_score - mean_y);
    }
    if sxx == 0.0 {
        return None;
    }
    Some(sxy / sxx)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueStatistics {
    pub generations_completed: u64,
    pub episodes_completed: u64,
    pub episodes_failed: u64,
    pub total_plies: u64,
    pub first_wins: u64,
    pub second_wins: u64,
    pub draws: u64,
    pub move_cap_draws: u64,
    pub promotions: u32,
    pub defenses: u32,
    pub challenger_skipped: u32,
    pub wildcard_skipped: u32,
    pub training_failures: u32,
    /// Id for the next episode; ids are never reused, even across resumes
    pub next_episode_id: u64,
    #[serde(default)]
    pub wildcard_trend: Vec<TrendPoint>,
    #[serde(default)]
    pub violations: ViolationSummary,
    #[serde(default)]
    pub last_generation: Option<GenerationStats>,
}

impl LeagueStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a generation's training-episode counters.
    pub fn record_generation(&mut self, stats: &GenerationStats) {
        self.generations_completed += 1;
        self.episodes_completed += stats.completed as u64;
        self.episodes_failed += stats.failed as u64;
        self.total_plies += stats.plies;
        self.first_wins += stats.first_wins as u64;
        self.second_wins += stats.second_wins as u64;
        self.draws += stats.draws as u64;
        self.move_cap_draws += stats.move_cap_draws as u64;
        self.last_generation = Some(stats.clone());
    }

    pub fn record_decision(&mut self, decision: &Decision) {
        match decision {
            Decision::Promoted(_) => self.promotions += 1,
            Decision::Defended(_) => self.defenses += 1,
            Decision::ChallengerSkipped { .. } => self.challenger_skipped += 1,
            Decision::WildcardRecorded(report) => self.wildcard_trend.push(TrendPoint {
                generation: report.generation,
                champion_score: report.champion_score,
                games: report.score.completed(),
            }),
            Decision::WildcardSkipped { .. } => self.wildcard_skipped += 1,
        }
    }

    /// Hand out `count` consecutive episode ids, returning the first.
    pub fn allocate_episode_ids(&mut self, count: u64) -> u64 {
        let first = self.next_episode_id;
        self.next_episode_id += count;
        first
    }

    /// Slope over the last `window` trend points.
    pub fn trend(&self, window: usize) -> Option<f64> {
        let start = self.wildcard_trend.len().saturating_sub(window);
        trend_slope(&self.wildcard_trend[start..])
    }

    pub fn avg_plies_per_episode(&self) -> f64 {
        if self.episodes_completed == 0 {
            0.0
        } else {
            self.total_plies as f64 / self.episodes_completed as f64
        }
    }

    pub fn log_summary(&self) {
        info!(
            generations = self.generations_completed,
            episodes = self.episodes_completed,
            failed = self.episodes_failed,
            avg_plies = format!("{:.1}", self.avg_plies_per_episode()),
            first_wins = self.first_wins,
            second_wins = self.second_wins,
            draws = self.draws,
            promotions = self.promotions,
            defenses = self.defenses,
            violations = self.violations.total,
            "League summary"
        );
    }
}
