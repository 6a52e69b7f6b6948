//! In-process collaborators.
//!
//! These back the `league` binary and the tests. They need no model server
//! or database: weights are version tags, "training" bumps the version of
//! every agent that played, and evaluators are picked by version.

use async_trait::async_trait;
use engine_core::GameRules;
use mcts::{Evaluator, EvaluatorError, MaterialEvaluator, UniformEvaluator};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::agent::{Role, Roster, WeightsVersion};
use crate::collaborators::{
    EvaluatorProvider, LeagueSnapshot, PersistenceCollaborator, TrainingCollaborator,
    WeightsUpdate,
};
use crate::episode::EpisodeOutcome;
use crate::error::{PersistenceError, TrainingError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Version 0 weights evaluate with uniform priors and a neutral value.
/// Later versions use material balance, sharper with each version.
#[derive(Debug, Default)]
pub struct LocalEvaluators {
    next_tag: AtomicU64,
}

impl LocalEvaluators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Material scale for a weights version.
    pub fn scale(version: u64) -> f32 {
        (0.1 * version as f32).min(1.0)
    }
}

impl<G: GameRules> EvaluatorProvider<G> for LocalEvaluators {
    fn evaluator(&self, weights: &WeightsVersion) -> Result<Arc<dyn Evaluator<G>>, EvaluatorError> {
        if weights.version == 0 {
            Ok(Arc::new(UniformEvaluator))
        } else {
            Ok(Arc::new(MaterialEvaluator::new(Self::scale(weights.version))))
        }
    }

    fn fresh_weights(&self) -> WeightsVersion {
        let n = self.next_tag.fetch_add(1, Ordering::Relaxed);
        WeightsVersion::new(format!("w{n}"), 0)
    }
}

/// One call to [`LocalTrainer::train`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingBatch {
    pub generation: u64,
    pub episode_ids: Vec<u64>,
    pub samples: usize,
}

/// Bumps the weights version of every non-wildcard agent that played a
/// completed episode.
#[derive(Debug, Default)]
pub struct LocalTrainer {
    batches: Mutex<Vec<TrainingBatch>>,
}

impl LocalTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<TrainingBatch> {
        lock(&self.batches).clone()
    }
}

#[async_trait]
impl<G: GameRules> TrainingCollaborator<G> for LocalTrainer {
    async fn train(
        &self,
        generation: u64,
        roster: &Roster,
        outcomes: &[EpisodeOutcome<G::State, G::Move>],
    ) -> Result<Vec<WeightsUpdate>, TrainingError> {
        let samples = outcomes.iter().map(|o| o.plies.len()).sum::<usize>();
        lock(&self.batches).push(TrainingBatch {
            generation,
            episode_ids: outcomes.iter().map(|o| o.id).collect(),
            samples,
        });

        let trained: BTreeSet<_> = outcomes
            .iter()
            .filter(|o| o.is_completed())
            .flat_map(|o| o.participants)
            .collect();

        let updates = trained
            .into_iter()
            .filter_map(|id| roster.get(id))
            .filter(|agent| agent.role != Role::Wildcard)
            .map(|agent| WeightsUpdate {
                agent: agent.id,
                weights: WeightsVersion::new(agent.weights.tag.clone(), agent.weights.version + 1),
            })
            .collect::<Vec<_>>();

        debug!(generation, samples, updates = updates.len(), "Local training step");
        Ok(updates)
    }
}

/// Checkpoints kept in memory.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    snapshots: Mutex<BTreeMap<u64, LeagueSnapshot>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved generation indices, ascending.
    pub fn indices(&self) -> Vec<u64> {
        lock(&self.snapshots).keys().copied().collect()
    }
}

#[async_trait]
impl PersistenceCollaborator for MemoryCheckpointStore {
    async fn save(&self, snapshot: &LeagueSnapshot) -> Result<(), PersistenceError> {
        lock(&self.snapshots).insert(snapshot.generation_index, snapshot.clone());
        Ok(())
    }

    async fn load(&self, generation_index: u64) -> Result<LeagueSnapshot, PersistenceError> {
        lock(&self.snapshots)
            .get(&generation_index)
            .cloned()
            .ok_or(PersistenceError::NotFound(generation_index))
    }

    async fn latest(&self) -> Result<Option<LeagueSnapshot>, PersistenceError> {
        Ok(lock(&self.snapshots).values().next_back().cloned())
    }
}
