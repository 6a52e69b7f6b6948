//! The generational league scheduler.
//!
//! ```text
//! Scheduling -> Running -> Aggregating -> ChallengerCheck -> WildcardCheck
//!      -> Checkpointing -> Sealed -> (next generation)
//! ```
//!
//! A single async controller walks the phases in order. Only `Running` fans
//! out: episodes go to blocking worker threads, bounded by a semaphore, and
//! the controller waits for all of them before aggregating. Every other
//! phase runs on the controller.
//!
//! Nothing below the scheduler aborts it. Failed episodes are excluded from
//! training, checks that cannot finish are skipped, and checkpoint failures
//! are reported while the generation completes in memory.

use engine_core::{CancelToken, GameRules};
use mcts::Evaluator;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use validation::{TracingViolationLog, ViolationFanout, ViolationLog, ViolationStats};

use crate::agent::{AgentId, Roster};
use crate::collaborators::{Collaborators, LeagueSnapshot};
use crate::episode::{EpisodeFailure, EpisodeOutcome, EpisodeRunner, EpisodeSpec, Seat};
use crate::error::LeagueError;
use crate::events::{LeagueEvent, SinkViolationLog};
use crate::generation::{
    ChallengerReport, Decision, Generation, GenerationStats, Phase, SeriesScore, WildcardReport,
};
use crate::schedule::{build_match_set, derive_seed, head_to_head, MatchKind, ScheduledMatch};
use crate::settings::LeagueConfig;
use crate::stats::{trend_slope, LeagueStatistics, TrendPoint};

type Outcome<G> = EpisodeOutcome<<G as GameRules>::State, <G as GameRules>::Move>;

pub struct LeagueScheduler<G: GameRules> {
    rules: Arc<G>,
    config: LeagueConfig,
    collaborators: Collaborators<G>,
    roster: Roster,
    statistics: LeagueStatistics,
    /// Index of the next generation to run
    next_index: u64,
    cancel: CancelToken,
    violations: Arc<ViolationStats>,
    violation_log: Arc<dyn ViolationLog>,
    last: Option<Generation<G::State, G::Move>>,
    /// Last generation written to a checkpoint
    saved_through: Option<u64>,
}

impl<G: GameRules> LeagueScheduler<G> {
    /// Start a new league: a Champion and the configured training agents,
    /// all on fresh weights.
    pub fn new(
        rules: Arc<G>,
        config: LeagueConfig,
        collaborators: Collaborators<G>,
    ) -> Result<Self, LeagueError> {
        config.validate()?;
        let provider = &collaborators.evaluators;
        let training = config
            .training_agents
            .iter()
            .map(|name| (name.clone(), provider.fresh_weights()))
            .collect();
        let roster = Roster::new(provider.fresh_weights(), training)?;

        info!(
            game = rules.name(),
            agents = roster.len(),
            champion = %roster.champion().weights,
            "Created league"
        );
        Ok(Self::assemble(
            rules,
            config,
            collaborators,
            roster,
            LeagueStatistics::new(),
            0,
        ))
    }

    /// Continue a league from a checkpoint. The next generation run is
    /// `snapshot.generation_index + 1`.
    pub fn resume(
        rules: Arc<G>,
        config: LeagueConfig,
        collaborators: Collaborators<G>,
        snapshot: LeagueSnapshot,
    ) -> Result<Self, LeagueError> {
        config.validate()?;
        snapshot.roster.check()?;

        info!(
            generation = snapshot.generation_index,
            agents = snapshot.roster.len(),
            champion = %snapshot.roster.champion().id,
            "Resuming league from checkpoint"
        );
        let mut scheduler = Self::assemble(
            rules,
            config,
            collaborators,
            snapshot.roster,
            snapshot.statistics,
            snapshot.generation_index + 1,
        );
        scheduler.saved_through = Some(snapshot.generation_index);
        Ok(scheduler)
    }

    fn assemble(
        rules: Arc<G>,
        config: LeagueConfig,
        collaborators: Collaborators<G>,
        roster: Roster,
        statistics: LeagueStatistics,
        next_index: u64,
    ) -> Self {
        let violations = Arc::new(ViolationStats::from_summary(statistics.violations.clone()));
        let mut fanout = ViolationFanout::new()
            .with(violations.clone())
            .with(Arc::new(SinkViolationLog::new(Arc::clone(
                &collaborators.events,
            ))));
        if config.log_violations {
            fanout = fanout.with(Arc::new(TracingViolationLog));
        }

        Self {
            rules,
            config,
            collaborators,
            roster,
            statistics,
            next_index,
            cancel: CancelToken::new(),
            violations,
            violation_log: Arc::new(fanout),
            last: None,
            saved_through: None,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &LeagueConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Statistics including the violations seen so far.
    pub fn statistics(&self) -> LeagueStatistics {
        let mut statistics = self.statistics.clone();
        statistics.violations = self.violations.snapshot();
        statistics
    }

    pub fn next_generation(&self) -> u64 {
        self.next_index
    }

    /// The most recently sealed generation of this process.
    pub fn last_generation(&self) -> Option<&Generation<G::State, G::Move>> {
        self.last.as_ref()
    }

    pub fn snapshot(&self, generation_index: u64) -> LeagueSnapshot {
        LeagueSnapshot {
            generation_index,
            roster: self.roster.clone(),
            statistics: self.statistics(),
            saved_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Run up to `generations` generations. Stops early on cancellation.
    /// Returns the number of generations sealed.
    pub async fn run(&mut self, generations: u64) -> Result<u64, LeagueError> {
        let mut sealed = 0;
        while sealed < generations {
            if self.cancel.is_cancelled() {
                break;
            }
            let last = sealed + 1 == generations;
            self.step(last).await?;
            sealed += 1;
        }

        if self.cancel.is_cancelled() {
            if let Some(index) = self.next_index.checked_sub(1) {
                if self.saved_through != Some(index) {
                    self.checkpoint(index).await;
                }
            }
        }
        self.statistics().log_summary();
        Ok(sealed)
    }

    /// Run exactly one generation.
    pub async fn run_generation(&mut self) -> Result<&Generation<G::State, G::Move>, LeagueError> {
        self.step(false).await?;
        self.last
            .as_ref()
            .ok_or_else(|| LeagueError::Roster("no generation was recorded".into()))
    }

    async fn step(&mut self, last: bool) -> Result<(), LeagueError> {
        let index = self.next_index;
        let mut generation: Generation<G::State, G::Move> =
            Generation::new(index, self.roster.clone());

        // Scheduling
        let matches = build_match_set(&self.roster, &self.config);
        self.emit(LeagueEvent::GenerationStarted {
            generation: index,
            scheduled: matches.len() as u32,
        });
        generation.set_matches(matches)?;

        // Running
        self.enter(&mut generation, Phase::Running)?;
        let outcomes = self.play(index, generation.matches()).await;
        generation.record_outcomes(outcomes)?;

        // Aggregating
        self.enter(&mut generation, Phase::Aggregating)?;
        let stats = self.aggregate(&generation).await?;
        generation.set_stats(stats)?;

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            self.emit(LeagueEvent::Cancelled { generation: index });
        }

        // Checks are skipped outright when cancelled
        self.enter(&mut generation, Phase::ChallengerCheck)?;
        if self.config.challenger_due(index) && !cancelled {
            let decision = self.challenger_check(index).await;
            self.decide(&mut generation, decision)?;
        }

        self.enter(&mut generation, Phase::WildcardCheck)?;
        if self.config.wildcard_due(index) && !cancelled {
            let decision = self.wildcard_check(index).await;
            self.decide(&mut generation, decision)?;
        }

        self.roster.check()?;

        self.enter(&mut generation, Phase::Checkpointing)?;
        if self.config.checkpoint_due(index) || last || self.cancel.is_cancelled() {
            self.checkpoint(index).await;
        }

        generation.seal()?;
        self.emit(LeagueEvent::GenerationSealed(generation.stats().clone()));
        self.next_index += 1;
        self.last = Some(generation);
        Ok(())
    }

    fn emit(&self, event: LeagueEvent) {
        self.collaborators.events.emit(event);
    }

    fn enter(
        &self,
        generation: &mut Generation<G::State, G::Move>,
        phase: Phase,
    ) -> Result<(), LeagueError> {
        generation.advance(phase)?;
        self.emit(LeagueEvent::PhaseEntered {
            generation: generation.index(),
            phase,
        });
        Ok(())
    }

    fn decide(
        &mut self,
        generation: &mut Generation<G::State, G::Move>,
        decision: Decision,
    ) -> Result<(), LeagueError> {
        self.statistics.record_decision(&decision);
        let event = match &decision {
            Decision::Promoted(report) | Decision::Defended(report) => {
                LeagueEvent::ChallengerDecided(report.clone())
            }
            Decision::ChallengerSkipped { reason, .. } => LeagueEvent::ChallengerIncomplete {
                generation: generation.index(),
                reason: reason.clone(),
            },
            Decision::WildcardRecorded(report) => LeagueEvent::WildcardRecorded(report.clone()),
            Decision::WildcardSkipped { reason, .. } => LeagueEvent::WildcardIncomplete {
                generation: generation.index(),
                reason: reason.clone(),
            },
        };
        self.emit(event);
        generation.decide(decision)
    }

    /// Play a set of matches concurrently and return their outcomes in
    /// match order.
    async fn play(&mut self, generation: u64, matches: &[ScheduledMatch]) -> Vec<Outcome<G>> {
        let first_id = self.statistics.allocate_episode_ids(matches.len() as u64);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_episodes));
        let mut evaluators: HashMap<AgentId, Result<Seat<G>, String>> = HashMap::new();
        let mut tasks = JoinSet::new();
        let mut outcomes = Vec::with_capacity(matches.len());

        for m in matches {
            let id = first_id + m.index as u64;
            let participants = [m.first, m.second];
            let seats = match (
                self.seat(m.first, &mut evaluators),
                self.seat(m.second, &mut evaluators),
            ) {
                (Ok(first), Ok(second)) => [first, second],
                (Err((agent, reason)), _) | (_, Err((agent, reason))) => {
                    outcomes.push(EpisodeOutcome::failed(
                        id,
                        generation,
                        m.index,
                        m.kind,
                        participants,
                        EpisodeFailure::EvaluatorLookup { agent, reason },
                    ));
                    continue;
                }
            };
            let spec = EpisodeSpec {
                id,
                generation,
                match_index: m.index,
                kind: m.kind,
                seats,
                seed: derive_seed(self.config.seed, generation, m.kind, m.index),
            };

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    outcomes.push(EpisodeOutcome::failed(
                        id,
                        generation,
                        m.index,
                        m.kind,
                        participants,
                        EpisodeFailure::Worker {
                            reason: e.to_string(),
                        },
                    ));
                    continue;
                }
            };

            let rules = Arc::clone(&self.rules);
            let config = self.config.episode.clone();
            let log = Arc::clone(&self.violation_log);
            let cancel = self.cancel.clone();
            let kind = m.kind;
            let index = m.index;
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let runner = EpisodeRunner::new(rules.as_ref(), &config, log.as_ref(), cancel);
                catch_unwind(AssertUnwindSafe(|| runner.run(spec))).unwrap_or_else(|_| {
                    EpisodeOutcome::failed(
                        id,
                        generation,
                        index,
                        kind,
                        participants,
                        EpisodeFailure::Worker {
                            reason: "episode panicked".into(),
                        },
                    )
                })
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(generation, error = %e, "Episode task did not finish"),
            }
        }

        // Tasks that vanished still count as scheduled
        if outcomes.len() < matches.len() {
            for m in matches {
                let id = first_id + m.index as u64;
                if !outcomes.iter().any(|o| o.id == id) {
                    outcomes.push(EpisodeOutcome::failed(
                        id,
                        generation,
                        m.index,
                        m.kind,
                        [m.first, m.second],
                        EpisodeFailure::Worker {
                            reason: "episode task lost".into(),
                        },
                    ));
                }
            }
        }
        outcomes.sort_by_key(|o| o.id);

        for outcome in &outcomes {
            self.emit(episode_event(outcome));
        }
        outcomes
    }

    /// Seat for `agent`, building each agent's evaluator once per call.
    fn seat(
        &self,
        agent: AgentId,
        cache: &mut HashMap<AgentId, Result<Seat<G>, String>>,
    ) -> Result<Seat<G>, (AgentId, String)> {
        let entry = cache.entry(agent).or_insert_with(|| {
            let Some(a) = self.roster.get(agent) else {
                return Err(format!("{agent} is not on the roster"));
            };
            let evaluator: Arc<dyn Evaluator<G>> = self
                .collaborators
                .evaluators
                .evaluator(&a.weights)
                .map_err(|e| e.to_string())?;
            Ok(Seat {
                agent,
                label: a.label(),
                evaluator,
            })
        });
        entry.clone().map_err(|reason| (agent, reason))
    }

    /// Update agent stats, fold counters into the league statistics and run
    /// the training step.
    async fn aggregate(
        &mut self,
        generation: &Generation<G::State, G::Move>,
    ) -> Result<GenerationStats, LeagueError> {
        let index = generation.index();
        let mut stats = GenerationStats::from_outcomes(index, generation.outcomes());

        for outcome in generation.outcomes() {
            let [first, second] = outcome.participants;
            // Self-play says nothing about relative strength
            if first == second {
                continue;
            }
            for agent in [first, second] {
                if let Some(reward) = outcome.reward_for(agent) {
                    self.roster.record_result(agent, reward)?;
                }
            }
        }

        let batch: Vec<Outcome<G>> = generation
            .outcomes()
            .iter()
            .filter(|o| o.is_completed())
            .cloned()
            .collect();

        if self.cancel.is_cancelled() {
            debug!(generation = index, "Cancelled, skipping training");
        } else if batch.is_empty() {
            warn!(generation = index, "No completed episodes, skipping training");
        } else {
            let trained = self
                .collaborators
                .trainer
                .train(index, &self.roster, &batch)
                .await;
            match trained {
                Ok(updates) => {
                    for update in updates {
                        match self.roster.apply_weights(update.agent, update.weights.clone()) {
                            Ok(()) => {
                                stats.weight_updates += 1;
                                self.emit(LeagueEvent::WeightsUpdated {
                                    generation: index,
                                    agent: update.agent,
                                    weights: update.weights,
                                });
                            }
                            Err(e) => {
                                warn!(generation = index, error = %e, "Ignoring weights update")
                            }
                        }
                    }
                    self.emit(LeagueEvent::TrainingCompleted {
                        generation: index,
                        episodes: batch.len() as u32,
                        updates: stats.weight_updates,
                    });
                }
                Err(e) => {
                    self.statistics.training_failures += 1;
                    self.emit(LeagueEvent::TrainingFailed {
                        generation: index,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.statistics.record_generation(&stats);
        Ok(stats)
    }

    /// Best training agent against the Champion. Promotes on a win rate
    /// strictly above the threshold.
    async fn challenger_check(&mut self, index: u64) -> Decision {
        let weighting = self.config.draw_weighting;
        let Some(challenger) = self.roster.best_training_agent(weighting) else {
            return skipped_challenger(index, "no training agents".into(), None);
        };
        let champion = self.roster.champion().id;
        let games = self.config.challenger_games;

        info!(
            generation = index,
            %challenger,
            %champion,
            games,
            "Running challenger check"
        );
        let matches = head_to_head(MatchKind::Challenger, challenger, champion, games);
        let outcomes = self.play(index, &matches).await;

        let mut score = SeriesScore::default();
        for outcome in &outcomes {
            score.record(outcome.reward_for(challenger));
        }
        let mut report = ChallengerReport {
            generation: index,
            challenger,
            champion,
            games,
            win_rate: score.rate(weighting),
            score,
            threshold: self.config.challenger_threshold,
            promoted: false,
        };

        if report.score.failed > 0 {
            let reason = format!("{} of {} games failed", report.score.failed, games);
            return skipped_challenger(index, reason, Some(report));
        }

        if report.win_rate > report.threshold {
            match self.roster.promote(challenger, index, report.win_rate) {
                Ok(_) => {
                    report.promoted = true;
                    info!(
                        generation = index,
                        champion = %challenger,
                        previous = %champion,
                        win_rate = format!("{:.3}", report.win_rate),
                        "New champion"
                    );
                    if self.config.sync_training_on_promotion {
                        self.sync_training_weights(index);
                    }
                    Decision::Promoted(report)
                }
                Err(e) => skipped_challenger(index, e.to_string(), Some(report)),
            }
        } else {
            self.roster
                .record_defense(challenger, index, report.win_rate);
            Decision::Defended(report)
        }
    }

    /// Point every training agent, the demoted Champion included, at the
    /// Champion's weights. Match stats are kept.
    fn sync_training_weights(&mut self, index: u64) {
        let weights = self.roster.champion().weights.clone();
        let targets: Vec<AgentId> = self.roster.training_agents().map(|a| a.id).collect();
        for agent in targets {
            match self.roster.apply_weights(agent, weights.clone()) {
                Ok(()) => self.emit(LeagueEvent::WeightsUpdated {
                    generation: index,
                    agent,
                    weights: weights.clone(),
                }),
                Err(e) => warn!(generation = index, error = %e, "Ignoring weights sync"),
            }
        }
        debug!(generation = index, tag = %weights.tag, "Training agents synced to champion");
    }

    /// A fresh baseline agent against the Champion, recorded as a trend
    /// point. Never promotes.
    async fn wildcard_check(&mut self, index: u64) -> Decision {
        let weights = self.collaborators.evaluators.fresh_weights();
        let wildcard = self.roster.replace_wildcard(weights);
        let champion = self.roster.champion().id;
        let games = self.config.wildcard_games;

        debug!(generation = index, %wildcard, games, "Running wildcard audit");
        let matches = head_to_head(MatchKind::Wildcard, wildcard, champion, games);
        let outcomes = self.play(index, &matches).await;

        let mut score = SeriesScore::default();
        for outcome in &outcomes {
            score.record(outcome.reward_for(champion));
        }
        let mut report = WildcardReport {
            generation: index,
            wildcard,
            champion,
            games,
            champion_score: score.rate(self.config.draw_weighting),
            score,
            trend: None,
        };

        if report.score.failed > 0 {
            let reason = LeagueError::WildcardCheckIncomplete {
                generation: index,
                reason: format!("{} of {} games failed", report.score.failed, games),
            };
            return Decision::WildcardSkipped {
                reason: reason.to_string(),
                partial: Some(report),
            };
        }

        let window = self.config.wildcard_trend_window;
        let history = &self.statistics.wildcard_trend;
        let mut points: Vec<TrendPoint> = history[history.len().saturating_sub(window - 1)..].to_vec();
        points.push(TrendPoint {
            generation: index,
            champion_score: report.champion_score,
            games: report.score.completed(),
        });
        report.trend = trend_slope(&points);
        Decision::WildcardRecorded(report)
    }

    async fn checkpoint(&mut self, index: u64) {
        let snapshot = self.snapshot(index);
        match self.collaborators.persistence.save(&snapshot).await {
            Ok(()) => {
                self.saved_through = Some(index);
                self.emit(LeagueEvent::CheckpointSaved { generation: index });
            }
            Err(e) => self.emit(LeagueEvent::PersistenceFailure {
                generation: index,
                error: e.to_string(),
            }),
        }
    }
}

fn skipped_challenger(index: u64, reason: String, partial: Option<ChallengerReport>) -> Decision {
    let error = LeagueError::ChallengerCheckIncomplete {
        generation: index,
        reason,
    };
    Decision::ChallengerSkipped {
        reason: error.to_string(),
        partial,
    }
}

fn episode_event<S, M>(outcome: &EpisodeOutcome<S, M>) -> LeagueEvent {
    match outcome.result() {
        Some(result) => LeagueEvent::EpisodeCompleted {
            generation: outcome.generation,
            episode_id: outcome.id,
            kind: outcome.kind,
            participants: outcome.participants,
            winner: result.winner,
            reason: result.reason,
            plies: outcome.plies.len() as u32,
        },
        None => LeagueEvent::EpisodeFailed {
            generation: outcome.generation,
            episode_id: outcome.id,
            kind: outcome.kind,
            participants: outcome.participants,
            error: outcome
                .failure()
                .cloned()
                .unwrap_or(EpisodeFailure::Cancelled),
            violations: outcome.violations.len() as u32,
        },
    }
}
