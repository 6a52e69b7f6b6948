//! One-way event stream from the league to logging and progress consumers.
//!
//! Sinks are fire-and-forget: `emit` returns nothing, and a sink that cannot
//! deliver an event drops it.

use engine_core::Side;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use validation::{ViolationLog, ViolationRecord};

use crate::agent::{AgentId, WeightsVersion};
use crate::episode::{EpisodeFailure, TerminalReason};
use crate::generation::{ChallengerReport, GenerationStats, Phase, WildcardReport};
use crate::schedule::MatchKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LeagueEvent {
    GenerationStarted {
        generation: u64,
        scheduled: u32,
    },
    PhaseEntered {
        generation: u64,
        phase: Phase,
    },
    EpisodeCompleted {
        generation: u64,
        episode_id: u64,
        kind: MatchKind,
        participants: [AgentId; 2],
        winner: Option<Side>,
        reason: TerminalReason,
        plies: u32,
    },
    EpisodeFailed {
        generation: u64,
        episode_id: u64,
        kind: MatchKind,
        participants: [AgentId; 2],
        error: EpisodeFailure,
        violations: u32,
    },
    Violation(ViolationRecord),
    TrainingCompleted {
        generation: u64,
        episodes: u32,
        updates: u32,
    },
    TrainingFailed {
        generation: u64,
        error: String,
    },
    WeightsUpdated {
        generation: u64,
        agent: AgentId,
        weights: WeightsVersion,
    },
    ChallengerDecided(ChallengerReport),
    ChallengerIncomplete {
        generation: u64,
        reason: String,
    },
    WildcardRecorded(WildcardReport),
    WildcardIncomplete {
        generation: u64,
        reason: String,
    },
    CheckpointSaved {
        generation: u64,
    },
    PersistenceFailure {
        generation: u64,
        error: String,
    },
    GenerationSealed(GenerationStats),
    Cancelled {
        generation: u64,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LeagueEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: LeagueEvent) {
        (**self).emit(event)
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LeagueEvent) {}
}

/// Forwards events over an unbounded channel. Events sent after the
/// receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<LeagueEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<LeagueEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: LeagueEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sends each event to every inner sink.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: LeagueEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

/// Writes events as structured tracing records.
///
/// Violations are skipped; `validation::TracingViolationLog` already logs
/// them with full context.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: LeagueEvent) {
        match event {
            LeagueEvent::GenerationStarted {
                generation,
                scheduled,
            } => info!(generation, scheduled, "Generation started"),
            LeagueEvent::PhaseEntered { generation, phase } => {
                debug!(generation, %phase, "Entering phase")
            }
            LeagueEvent::EpisodeCompleted {
                generation,
                episode_id,
                kind,
                winner,
                reason,
                plies,
                ..
            } => debug!(
                generation,
                episode_id,
                %kind,
                winner = ?winner,
                reason = ?reason,
                plies,
                "Episode completed"
            ),
            LeagueEvent::EpisodeFailed {
                generation,
                episode_id,
                kind,
                error,
                violations,
                ..
            } => warn!(
                generation,
                episode_id,
                %kind,
                violations,
                error = %error,
                "Episode failed, excluded from training"
            ),
            LeagueEvent::Violation(_) => {}
            LeagueEvent::TrainingCompleted {
                generation,
                episodes,
                updates,
            } => info!(generation, episodes, updates, "Training step completed"),
            LeagueEvent::TrainingFailed { generation, error } => {
                warn!(generation, error = %error, "Training failed, keeping current weights")
            }
            LeagueEvent::WeightsUpdated {
                generation,
                agent,
                weights,
            } => debug!(generation, %agent, %weights, "Weights updated"),
            LeagueEvent::ChallengerDecided(report) => info!(
                generation = report.generation,
                challenger = %report.challenger,
                champion = %report.champion,
                wins = report.score.wins,
                losses = report.score.losses,
                draws = report.score.draws,
                win_rate = format!("{:.3}", report.win_rate),
                threshold = report.threshold,
                promoted = report.promoted,
                "Challenger check"
            ),
            LeagueEvent::ChallengerIncomplete { generation, reason } => {
                warn!(generation, reason = %reason, "Challenger check skipped")
            }
            LeagueEvent::WildcardRecorded(report) => info!(
                generation = report.generation,
                champion = %report.champion,
                champion_score = format!("{:.3}", report.champion_score),
                trend = ?report.trend,
                "Wildcard audit"
            ),
            LeagueEvent::WildcardIncomplete { generation, reason } => {
                warn!(generation, reason = %reason, "Wildcard audit skipped")
            }
            LeagueEvent::CheckpointSaved { generation } => {
                info!(generation, "Checkpoint saved")
            }
            LeagueEvent::PersistenceFailure { generation, error } => warn!(
                generation,
                error = %error,
                "Checkpoint failed, generation kept in memory"
            ),
            LeagueEvent::GenerationSealed(stats) => info!(
                generation = stats.index,
                completed = stats.completed,
                failed = stats.failed,
                plies = stats.plies,
                first_wins = stats.first_wins,
                second_wins = stats.second_wins,
                draws = stats.draws,
                violations = stats.violations,
                "Generation sealed"
            ),
            LeagueEvent::Cancelled { generation } => {
                warn!(generation, "League cancelled")
            }
        }
    }
}

/// Adapts an event sink to receive violation records.
#[derive(Clone)]
pub struct SinkViolationLog {
    sink: Arc<dyn EventSink>,
}

impl SinkViolationLog {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }
}

impl ViolationLog for SinkViolationLog {
    fn record(&self, record: &ViolationRecord) {
        self.sink.emit(LeagueEvent::Violation(record.clone()));
    }
}
