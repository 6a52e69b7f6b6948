//! Evaluator trait for position evaluation.
//!
//! An evaluator provides move priors and a value estimate for a state. In
//! training this is a network owned by an external collaborator; this crate
//! ships a uniform evaluator and a material-count heuristic.

use engine_core::{GameRules, PieceKind};
use thiserror::Error;

/// Errors that can occur during evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluatorError {
    /// The backing model could not be reached or loaded
    #[error("evaluator unavailable: {0}")]
    Unavailable(String),

    /// The evaluator returned something that cannot be used as a policy
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

/// Result of evaluating a game state.
#[derive(Debug, Clone)]
pub struct EvalResult<M> {
    /// Prior mass per move. Moves not listed get zero mass; the search
    /// masks and renormalizes over the legal set.
    pub priors: Vec<(M, f32)>,

    /// Value estimate for the side to move, in [-1, 1].
    pub value: f32,
}

impl<M: Clone> EvalResult<M> {
    /// Equal priors over `legal` with the given value.
    pub fn uniform(legal: &[M], value: f32) -> Self {
        let p = if legal.is_empty() {
            0.0
        } else {
            1.0 / legal.len() as f32
        };
        Self {
            priors: legal.iter().map(|m| (m.clone(), p)).collect(),
            value,
        }
    }
}

/// Trait for position evaluators.
pub trait Evaluator<G: GameRules>: Send + Sync {
    /// Evaluate a single state whose legal moves are `legal`.
    fn evaluate(
        &self,
        rules: &G,
        state: &G::State,
        legal: &[G::Move],
    ) -> Result<EvalResult<G::Move>, EvaluatorError>;

    /// Evaluate several states at once.
    ///
    /// The default implementation calls [`Evaluator::evaluate`] in a loop.
    /// Results must be returned in input order.
    fn evaluate_batch(
        &self,
        rules: &G,
        batch: &[(&G::State, &[G::Move])],
    ) -> Result<Vec<EvalResult<G::Move>>, EvaluatorError> {
        batch
            .iter()
            .map(|(state, legal)| self.evaluate(rules, state, legal))
            .collect()
    }
}

/// Restrict priors to the legal set and normalize.
///
/// Each legal move takes the mass of its first matching entry. Missing,
/// negative or non-finite mass counts as zero. If nothing is left the
/// result is uniform.
pub fn mask_priors<M: PartialEq>(legal: &[M], priors: &[(M, f32)]) -> Vec<f32> {
    let mut masked: Vec<f32> = legal
        .iter()
        .map(|mv| {
            priors
                .iter()
                .find(|(m, _)| m == mv)
                .map(|(_, p)| *p)
                .filter(|p| p.is_finite() && *p > 0.0)
                .unwrap_or(0.0)
        })
        .collect();

    let total: f32 = masked.iter().sum();
    if total > 0.0 && total.is_finite() {
        for p in &mut masked {
            *p /= total;
        }
    } else if !masked.is_empty() {
        let uniform = 1.0 / masked.len() as f32;
        masked.iter_mut().for_each(|p| *p = uniform);
    }
    masked
}

/// Clamp a value estimate into [-1, 1]; non-finite values become 0.
#[inline]
pub fn sanitize_value(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Uniform evaluator that assigns equal probability to all legal moves.
/// Value is always 0.0 (neutral). Useful for testing MCTS without a model.
#[derive(Debug, Clone, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl<G: GameRules> Evaluator<G> for UniformEvaluator {
    fn evaluate(
        &self,
        _rules: &G,
        _state: &G::State,
        legal: &[G::Move],
    ) -> Result<EvalResult<G::Move>, EvaluatorError> {
        Ok(EvalResult::uniform(legal, 0.0))
    }
}

/// Heuristic evaluator: uniform priors, value from the material balance.
///
/// The value is `tanh(scale * (own - opponent))` where each side's material
/// is the weighted sum of its piece counts. Kinds without an explicit weight
/// count as 1.
#[derive(Debug, Clone)]
pub struct MaterialEvaluator {
    scale: f32,
    weights: Vec<(PieceKind, f32)>,
}

impl Default for MaterialEvaluator {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl MaterialEvaluator {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            weights: Vec::new(),
        }
    }

    /// Builder: weight a piece kind.
    pub fn with_weight(mut self, kind: PieceKind, weight: f32) -> Self {
        self.weights.retain(|(k, _)| *k != kind);
        self.weights.push((kind, weight));
        self
    }

    fn weight(&self, kind: PieceKind) -> f32 {
        self.weights
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(1.0, |(_, w)| *w)
    }
}

impl<G: GameRules> Evaluator<G> for MaterialEvaluator {
    fn evaluate(
        &self,
        rules: &G,
        state: &G::State,
        legal: &[G::Move],
    ) -> Result<EvalResult<G::Move>, EvaluatorError> {
        let me = rules.side_to_move(state);
        let balance: f32 = rules
            .inventory(state)
            .iter()
            .map(|(side, kind, n)| {
                let material = self.weight(kind) * n as f32;
                if side == me {
                    material
                } else {
                    -material
                }
            })
            .sum();

        Ok(EvalResult::uniform(legal, (self.scale * balance).tanh()))
    }
}
