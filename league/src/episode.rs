//! Episode runner: plays one game between two seats.
//!
//! Each ply runs a fresh search for the side to move, records the search
//! policy and value, reports any validator rejections, and commits the
//! state the search returned. Episodes are synchronous and CPU bound; the
//! scheduler runs them on blocking worker threads.

use engine_core::{CancelToken, GameRules, GameStatus, Side};
use mcts::{
    Evaluator, EvaluatorError, MctsConfig, MctsSearch, Rejection, SearchError, SearchResult,
    UniformEvaluator,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use validation::{ViolationContext, ViolationLog, ViolationRecord};

use crate::agent::AgentId;
use crate::schedule::MatchKind;

/// Why a completed game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Win or draw by the game rules
    Rules,
    /// Draw by reaching `max_moves_per_game`
    MoveCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalResult {
    /// `None` for a draw
    pub winner: Option<Side>,
    pub reason: TerminalReason,
}

impl TerminalResult {
    /// +1 for a win, -1 for a loss, 0 for a draw.
    pub fn reward_for(&self, side: Side) -> f32 {
        match self.winner {
            Some(winner) if winner == side => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        }
    }
}

/// Episode-fatal errors.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpisodeFailure {
    #[error("no legal move survived validation after {attempts} attempt(s)")]
    NoLegalMoveSurvivedValidation { attempts: usize },

    #[error("evaluator unavailable after {attempts} attempt(s): {reason}")]
    EvaluatorUnavailable { attempts: u32, reason: String },

    #[error("could not obtain an evaluator for {agent}: {reason}")]
    EvaluatorLookup { agent: AgentId, reason: String },

    #[error("evaluator returned an unusable policy: {reason}")]
    InvalidPolicy { reason: String },

    #[error("rules report no legal moves in an ongoing position")]
    InconsistentRules,

    #[error("invalid search config: {reason}")]
    InvalidConfig { reason: String },

    #[error("episode cancelled")]
    Cancelled,

    #[error("episode worker stopped: {reason}")]
    Worker { reason: String },
}

impl From<SearchError> for EpisodeFailure {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Evaluator(EvaluatorError::Unavailable(reason)) => {
                EpisodeFailure::EvaluatorUnavailable {
                    attempts: 1,
                    reason,
                }
            }
            SearchError::Evaluator(EvaluatorError::InvalidPolicy(reason)) => {
                EpisodeFailure::InvalidPolicy { reason }
            }
            SearchError::NoLegalMoves => EpisodeFailure::InconsistentRules,
            SearchError::NoLegalMoveSurvivedValidation { attempts } => {
                EpisodeFailure::NoLegalMoveSurvivedValidation { attempts }
            }
            SearchError::Cancelled => EpisodeFailure::Cancelled,
            SearchError::InvalidConfig(reason) => EpisodeFailure::InvalidConfig { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeStatus {
    Completed(TerminalResult),
    Failed(EpisodeFailure),
}

/// One committed move and the search data behind it.
#[derive(Debug, Clone)]
pub struct Ply<S, M> {
    pub number: u32,
    pub side: Side,
    /// State the move was played from
    pub state: S,
    pub mv: M,
    /// Root visit distribution
    pub policy: Vec<(M, f32)>,
    /// Root value for `side`
    pub root_value: f32,
    /// Final result for `side`, filled in once the game completes
    pub outcome: Option<f32>,
}

/// Search counters summed over an episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSearchStats {
    pub searches: u32,
    pub simulations: u64,
    pub evaluations: u64,
    pub terminal_hits: u64,
    pub rejected_candidates: u32,
    pub evaluator_retries: u32,
    pub fallback_used: bool,
    pub search_time: Duration,
}

impl EpisodeSearchStats {
    fn add<S, M>(&mut self, result: &SearchResult<S, M>) {
        self.searches += 1;
        self.simulations += result.simulations as u64;
        self.evaluations += result.stats.evaluations as u64;
        self.terminal_hits += result.stats.terminal_hits as u64;
        self.rejected_candidates += result.rejected.len() as u32;
        self.search_time += result.stats.elapsed;
    }

    fn log_summary(&self, episode_id: u64) {
        if self.searches == 0 {
            return;
        }
        debug!(
            episode_id,
            searches = self.searches,
            simulations = self.simulations,
            evaluations = self.evaluations,
            terminal_hits = self.terminal_hits,
            rejected = self.rejected_candidates,
            search_ms = format!("{:.1}", self.search_time.as_secs_f64() * 1000.0),
            "MCTS episode stats"
        );
    }
}

/// Result of one episode, handed to aggregation and then to training.
#[derive(Debug, Clone)]
pub struct EpisodeOutcome<S, M> {
    pub id: u64,
    pub generation: u64,
    pub match_index: u32,
    pub kind: MatchKind,
    /// Agents in seat order: `[First, Second]`
    pub participants: [AgentId; 2],
    pub plies: Vec<Ply<S, M>>,
    pub status: EpisodeStatus,
    /// Records for every candidate the validator rejected
    pub violations: Vec<ViolationRecord>,
    pub search: EpisodeSearchStats,
}

impl<S, M> EpisodeOutcome<S, M> {
    /// An episode that failed before its first ply.
    pub fn failed(
        id: u64,
        generation: u64,
        match_index: u32,
        kind: MatchKind,
        participants: [AgentId; 2],
        failure: EpisodeFailure,
    ) -> Self {
        Self {
            id,
            generation,
            match_index,
            kind,
            participants,
            plies: Vec::new(),
            status: EpisodeStatus::Failed(failure),
            violations: Vec::new(),
            search: EpisodeSearchStats::default(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, EpisodeStatus::Completed(_))
    }

    pub fn result(&self) -> Option<&TerminalResult> {
        match &self.status {
            EpisodeStatus::Completed(result) => Some(result),
            EpisodeStatus::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&EpisodeFailure> {
        match &self.status {
            EpisodeStatus::Failed(failure) => Some(failure),
            EpisodeStatus::Completed(_) => None,
        }
    }

    /// Side played by `agent`; the first seat when it played both.
    pub fn side_of(&self, agent: AgentId) -> Option<Side> {
        if self.participants[0] == agent {
            Some(Side::First)
        } else if self.participants[1] == agent {
            Some(Side::Second)
        } else {
            None
        }
    }

    /// Result for `agent`, if it played and the game completed.
    pub fn reward_for(&self, agent: AgentId) -> Option<f32> {
        let side = self.side_of(agent)?;
        self.result().map(|r| r.reward_for(side))
    }
}

/// An agent in one seat of an episode.
pub struct Seat<G: GameRules> {
    pub agent: AgentId,
    /// Name used in violation records
    pub label: String,
    pub evaluator: Arc<dyn Evaluator<G>>,
}

impl<G: GameRules> Clone for Seat<G> {
    fn clone(&self) -> Self {
        Self {
            agent: self.agent,
            label: self.label.clone(),
            evaluator: Arc::clone(&self.evaluator),
        }
    }
}

/// Everything needed to play one scheduled match.
pub struct EpisodeSpec<G: GameRules> {
    pub id: u64,
    pub generation: u64,
    pub match_index: u32,
    pub kind: MatchKind,
    /// `[First, Second]`
    pub seats: [Seat<G>; 2],
    pub seed: u64,
}

impl<G: GameRules> EpisodeSpec<G> {
    pub fn participants(&self) -> [AgentId; 2] {
        [self.seats[0].agent, self.seats[1].agent]
    }
}

/// Per-episode settings.
#[derive(Debug, Clone)]
pub struct EpisodeConfig {
    pub search: MctsConfig,
    /// Plies played with `search.temperature` before switching to greedy
    /// selection. 0 keeps the configured temperature all game.
    pub temp_threshold: u32,
    /// Ply cap; reaching it ends the game as a draw
    pub max_moves: u32,
    /// Extra searches after an `EvaluatorUnavailable`
    pub evaluator_retries: u32,
    /// Substitute uniform priors once retries run out
    pub uniform_fallback: bool,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            search: MctsConfig::default(),
            temp_threshold: 30,
            max_moves: 200,
            evaluator_retries: 1,
            uniform_fallback: false,
        }
    }
}

impl EpisodeConfig {
    /// Search config for the given ply, with the temperature schedule applied.
    pub fn search_for_ply(&self, ply: u32) -> MctsConfig {
        if self.temp_threshold > 0 && ply >= self.temp_threshold {
            self.search.clone().with_temperature(0.0)
        } else {
            self.search.clone()
        }
    }
}

pub struct EpisodeRunner<'a, G: GameRules> {
    rules: &'a G,
    config: &'a EpisodeConfig,
    log: &'a dyn ViolationLog,
    cancel: CancelToken,
}

impl<'a, G: GameRules> EpisodeRunner<'a, G> {
    pub fn new(
        rules: &'a G,
        config: &'a EpisodeConfig,
        log: &'a dyn ViolationLog,
        cancel: CancelToken,
    ) -> Self {
        Self {
            rules,
            config,
            log,
            cancel,
        }
    }

    /// Play the episode to completion or failure.
    pub fn run(&self, spec: EpisodeSpec<G>) -> EpisodeOutcome<G::State, G::Move> {
        let mut rng = ChaCha20Rng::seed_from_u64(spec.seed);
        let mut state = self.rules.initial_state();
        let mut plies: Vec<Ply<G::State, G::Move>> = Vec::new();
        let mut violations = Vec::new();
        let mut stats = EpisodeSearchStats::default();

        debug!(
            episode_id = spec.id,
            generation = spec.generation,
            kind = %spec.kind,
            first = %spec.seats[0].label,
            second = %spec.seats[1].label,
            "Starting episode"
        );

        let status = loop {
            if self.cancel.is_cancelled() {
                break EpisodeStatus::Failed(EpisodeFailure::Cancelled);
            }

            match self.rules.status(&state) {
                GameStatus::Won(side) => {
                    break EpisodeStatus::Completed(TerminalResult {
                        winner: Some(side),
                        reason: TerminalReason::Rules,
                    })
                }
                GameStatus::Drawn => {
                    break EpisodeStatus::Completed(TerminalResult {
                        winner: None,
                        reason: TerminalReason::Rules,
                    })
                }
                GameStatus::Ongoing => {}
            }

            let number = plies.len() as u32;
            if number >= self.config.max_moves {
                break EpisodeStatus::Completed(TerminalResult {
                    winner: None,
                    reason: TerminalReason::MoveCap,
                });
            }

            let legal = self.rules.legal_moves(&state);
            if legal.is_empty() {
                break EpisodeStatus::Failed(EpisodeFailure::InconsistentRules);
            }

            let side = self.rules.side_to_move(&state);
            let seat = &spec.seats[side.index()];
            let result = match self.search(
                &spec,
                seat,
                number,
                &state,
                &legal,
                &mut rng,
                &mut violations,
                &mut stats,
            ) {
                Ok(result) => result,
                Err(failure) => break EpisodeStatus::Failed(failure),
            };

            let next_state = result.next_state;
            plies.push(Ply {
                number,
                side,
                state: std::mem::replace(&mut state, next_state),
                mv: result.mv,
                policy: result.policy,
                root_value: result.value,
                outcome: None,
            });
        };

        match &status {
            EpisodeStatus::Completed(result) => {
                for ply in &mut plies {
                    ply.outcome = Some(result.reward_for(ply.side));
                }
                debug!(
                    episode_id = spec.id,
                    plies = plies.len(),
                    winner = ?result.winner,
                    reason = ?result.reason,
                    "Episode completed"
                );
            }
            EpisodeStatus::Failed(failure) => {
                warn!(
                    episode_id = spec.id,
                    generation = spec.generation,
                    plies = plies.len(),
                    violations = violations.len(),
                    error = %failure,
                    "Episode failed"
                );
            }
        }
        stats.log_summary(spec.id);

        EpisodeOutcome {
            id: spec.id,
            generation: spec.generation,
            match_index: spec.match_index,
            kind: spec.kind,
            participants: spec.participants(),
            plies,
            status,
            violations,
            search: stats,
        }
    }

    /// Search one ply, retrying or falling back when the evaluator is down.
    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        spec: &EpisodeSpec<G>,
        seat: &Seat<G>,
        ply: u32,
        state: &G::State,
        legal: &[G::Move],
        rng: &mut ChaCha20Rng,
        violations: &mut Vec<ViolationRecord>,
        stats: &mut EpisodeSearchStats,
    ) -> Result<SearchResult<G::State, G::Move>, EpisodeFailure> {
        let config = self.config.search_for_ply(ply);
        let mut evaluator: Arc<dyn Evaluator<G>> = Arc::clone(&seat.evaluator);
        let mut failures = 0u32;
        let mut fallback = false;

        loop {
            let (result, rejections) = {
                let mut search = MctsSearch::new(
                    self.rules,
                    evaluator.as_ref(),
                    config.clone(),
                    state.clone(),
                    legal.to_vec(),
                )?
                .with_cancel(self.cancel.clone());
                let result = search.run(rng);
                let rejections = match &result {
                    Ok(_) => Vec::new(),
                    Err(_) => search.rejections().to_vec(),
                };
                (result, rejections)
            };

            match result {
                Ok(result) => {
                    self.report(spec, seat, ply, state, &result.rejected, violations);
                    stats.add(&result);
                    return Ok(result);
                }
                Err(SearchError::Evaluator(EvaluatorError::Unavailable(reason))) => {
                    failures += 1;
                    if failures <= self.config.evaluator_retries {
                        warn!(
                            episode_id = spec.id,
                            agent = %seat.label,
                            ply,
                            attempt = failures,
                            error = %reason,
                            "Evaluator unavailable, retrying"
                        );
                        stats.evaluator_retries += 1;
                        continue;
                    }
                    if self.config.uniform_fallback && !fallback {
                        warn!(
                            episode_id = spec.id,
                            agent = %seat.label,
                            ply,
                            error = %reason,
                            "Evaluator unavailable, falling back to uniform priors"
                        );
                        evaluator = Arc::new(UniformEvaluator);
                        fallback = true;
                        stats.fallback_used = true;
                        continue;
                    }
                    return Err(EpisodeFailure::EvaluatorUnavailable {
                        attempts: failures,
                        reason,
                    });
                }
                Err(e) => {
                    self.report(spec, seat, ply, state, &rejections, violations);
                    stats.rejected_candidates += rejections.len() as u32;
                    return Err(e.into());
                }
            }
        }
    }

    /// Turn rejected candidates into violation records.
    fn report(
        &self,
        spec: &EpisodeSpec<G>,
        seat: &Seat<G>,
        ply: u32,
        state: &G::State,
        rejections: &[Rejection<G::State, G::Move>],
        violations: &mut Vec<ViolationRecord>,
    ) {
        for rejection in rejections {
            let context = ViolationContext {
                game: self.rules.name().to_string(),
                agent: seat.label.clone(),
                generation: spec.generation,
                episode_id: spec.id,
                move_number: ply,
            };
            let record = ViolationRecord::from_result(
                &rejection.result,
                context,
                format!("{:?}", rejection.mv),
                format!("{state:?}"),
                format!("{:?}", rejection.after),
            );
            if let Some(record) = record {
                self.log.record(&record);
                violations.push(record);
            }
        }
    }
}
