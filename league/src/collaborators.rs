//! Boundaries to the systems the league drives but does not own.
//!
//! Training, evaluator construction and checkpoint storage are all behind
//! traits so the scheduler can run against real backends or the in-process
//! ones in [`crate::local`].

use async_trait::async_trait;
use engine_core::GameRules;
use mcts::{Evaluator, EvaluatorError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::agent::{AgentId, Roster, WeightsVersion};
use crate::episode::EpisodeOutcome;
use crate::error::{PersistenceError, TrainingError};
use crate::events::EventSink;
use crate::stats::LeagueStatistics;

/// New weights for one agent, produced by a training step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightsUpdate {
    pub agent: AgentId,
    pub weights: WeightsVersion,
}

/// Consumes completed trajectories and returns updated weights.
#[async_trait]
pub trait TrainingCollaborator<G: GameRules>: Send + Sync {
    /// `outcomes` only holds completed episodes.
    async fn train(
        &self,
        generation: u64,
        roster: &Roster,
        outcomes: &[EpisodeOutcome<G::State, G::Move>],
    ) -> Result<Vec<WeightsUpdate>, TrainingError>;
}

/// Builds evaluators for weight versions.
pub trait EvaluatorProvider<G: GameRules>: Send + Sync {
    fn evaluator(&self, weights: &WeightsVersion) -> Result<Arc<dyn Evaluator<G>>, EvaluatorError>;

    /// Weights for a freshly initialized, untrained agent.
    fn fresh_weights(&self) -> WeightsVersion;
}

/// Everything written to a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    /// Last generation included in this snapshot
    pub generation_index: u64,
    pub roster: Roster,
    pub statistics: LeagueStatistics,
    /// Seconds since the Unix epoch
    pub saved_at: u64,
}

#[async_trait]
pub trait PersistenceCollaborator: Send + Sync {
    async fn save(&self, snapshot: &LeagueSnapshot) -> Result<(), PersistenceError>;

    async fn load(&self, generation_index: u64) -> Result<LeagueSnapshot, PersistenceError>;

    /// Most recent snapshot, if any exist.
    async fn latest(&self) -> Result<Option<LeagueSnapshot>, PersistenceError>;
}

/// The collaborators a scheduler is built with.
pub struct Collaborators<G: GameRules> {
    pub evaluators: Arc<dyn EvaluatorProvider<G>>,
    pub trainer: Arc<dyn TrainingCollaborator<G>>,
    pub persistence: Arc<dyn PersistenceCollaborator>,
    pub events: Arc<dyn EventSink>,
}

impl<G: GameRules> Clone for Collaborators<G> {
    fn clone(&self) -> Self {
        Self {
            evaluators: Arc::clone(&self.evaluators),
            trainer: Arc::clone(&self.trainer),
            persistence: Arc::clone(&self.persistence),
            events: Arc::clone(&self.events),
        }
    }
}
