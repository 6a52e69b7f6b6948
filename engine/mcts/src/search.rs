//! MCTS search implementation.
//!
//! Implements the core MCTS algorithm:
//! 1. Selection: Traverse tree using PUCT to find a leaf
//! 2. Expansion: Add children to the leaf using masked evaluator priors
//! 3. Evaluation: Get value estimate from evaluator (batched)
//! 4. Backpropagation: Update statistics along the path
//!
//! After the simulation budget is spent, a root child is chosen by visit
//! count and its transition is checked by the validator. Rejected children
//! are excluded and the choice repeats over the remaining visited children.

use engine_core::{CancelToken, GameRules};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};
use validation::{validate, ValidationResult};

use crate::config::MctsConfig;
use crate::evaluator::{mask_priors, sanitize_value, Evaluator, EvaluatorError};
use crate::node::NodeId;
use crate::tree::{MctsTree, TreeStats};

/// Errors that can occur during MCTS search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("no legal moves available")]
    NoLegalMoves,

    #[error("no legal move survived validation after {attempts} attempt(s)")]
    NoLegalMoveSurvivedValidation { attempts: usize },

    #[error("search cancelled")]
    Cancelled,

    #[error("invalid search config: {0}")]
    InvalidConfig(String),
}

/// A root move the validator refused.
#[derive(Debug, Clone)]
pub struct Rejection<S, M> {
    pub mv: M,
    /// State the move would have produced; never committed
    pub after: S,
    pub result: ValidationResult,
}

/// Counters collected during one search.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// States sent to the evaluator, including the root
    pub evaluations: u32,
    /// Evaluator calls
    pub batches: u32,
    /// Simulations that ended on a terminal node
    pub terminal_hits: u32,
    pub elapsed: Duration,
    pub tree: TreeStats,
}

/// Result of an MCTS search.
#[derive(Debug, Clone)]
pub struct SearchResult<S, M> {
    /// Selected move (passed validation when enabled)
    pub mv: M,

    /// State after playing `mv`, taken from the search tree
    pub next_state: S,

    /// Visit distribution over root moves, in legal-move order
    pub policy: Vec<(M, f32)>,

    /// Root value estimate for the side to move
    pub value: f32,

    /// Root visit count
    pub simulations: u32,

    /// Candidates rejected before `mv` was accepted
    pub rejected: Vec<Rejection<S, M>>,

    pub stats: SearchStats,
}

/// MCTS search state for a single decision.
pub struct MctsSearch<'a, G: GameRules, E: Evaluator<G> + ?Sized> {
    rules: &'a G,
    evaluator: &'a E,
    config: MctsConfig,
    tree: MctsTree<G::State, G::Move>,
    root_moves: Vec<G::Move>,
    root_value: f32,
    cancel: Option<CancelToken>,
    rejected: Vec<Rejection<G::State, G::Move>>,
    stats: SearchStats,
}

impl<'a, G: GameRules, E: Evaluator<G> + ?Sized> MctsSearch<'a, G, E> {
    /// Create a new search rooted at `state`, whose legal moves are `legal_moves`.
    pub fn new(
        rules: &'a G,
        evaluator: &'a E,
        config: MctsConfig,
        state: G::State,
        legal_moves: Vec<G::Move>,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let terminal_value = rules.terminal_value(&state);
        let capacity = 1 + config.num_simulations as usize * legal_moves.len().max(1);
        let tree = MctsTree::with_capacity(state, terminal_value, capacity.min(1 << 16));

        Ok(Self {
            rules,
            evaluator,
            config,
            tree,
            root_moves: legal_moves,
            root_value: 0.0,
            cancel: None,
            rejected: Vec::new(),
            stats: SearchStats::default(),
        })
    }

    /// Builder: poll `token` before every simulation batch.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the search for the configured number of simulations and pick a move.
    pub fn run(
        &mut self,
        rng: &mut ChaCha20Rng,
    ) -> Result<SearchResult<G::State, G::Move>, SearchError> {
        let started = Instant::now();
        let root_id = self.tree.root();

        if self.root_moves.is_empty() || self.tree.get(root_id).is_terminal {
            return Err(SearchError::NoLegalMoves);
        }
        self.check_cancelled()?;

        if !self.tree.get(root_id).is_expanded() {
            self.expand_root()?;
        }

        if self.config.uses_noise() {
            self.add_dirichlet_noise(rng)?;
        }

        let mut remaining = self.config.num_simulations as usize;
        while remaining > 0 {
            self.check_cancelled()?;
            let batch = remaining.min(self.config.eval_batch_size);
            self.simulate_batch(batch)?;
            remaining -= batch;
        }

        let chosen_id = self.choose_validated(rng)?;
        let chosen = self.tree.get(chosen_id);
        let mv = chosen.mv.clone().ok_or(SearchError::NoLegalMoves)?;
        let next_state = chosen.state.clone();

        let root = self.tree.get(root_id);
        let simulations = root.visit_count;
        let value = if simulations > 0 {
            root.mean_value()
        } else {
            self.root_value
        };

        self.stats.elapsed = started.elapsed();
        self.stats.tree = self.tree.stats();

        Ok(SearchResult {
            mv,
            next_state,
            policy: self.tree.root_policy(),
            value,
            simulations,
            rejected: std::mem::take(&mut self.rejected),
            stats: self.stats.clone(),
        })
    }

    /// Rejections recorded by a failed [`MctsSearch::run`]. A successful run
    /// moves them into its result.
    pub fn rejections(&self) -> &[Rejection<G::State, G::Move>] {
        &self.rejected
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &MctsTree<G::State, G::Move> {
        &self.tree
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    fn check_cancelled(&self) -> Result<(), SearchError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(SearchError::Cancelled),
            _ => Ok(()),
        }
    }

    fn expand_root(&mut self) -> Result<(), SearchError> {
        let root_id = self.tree.root();
        let eval = self.evaluator.evaluate(
            self.rules,
            &self.tree.get(root_id).state,
            &self.root_moves,
        )?;
        self.stats.evaluations += 1;
        self.stats.batches += 1;
        self.root_value = sanitize_value(eval.value);

        let moves = self.root_moves.clone();
        self.expand(root_id, moves, &eval.priors);
        Ok(())
    }

    /// Create one child per legal move. A child's terminal status is
    /// decided here so terminal leaves never reach the evaluator.
    fn expand(&mut self, node_id: NodeId, legal: Vec<G::Move>, priors: &[(G::Move, f32)]) {
        if legal.is_empty() {
            // Ongoing state without moves: score it as a draw
            let node = self.tree.get_mut(node_id);
            node.expanded = true;
            node.is_terminal = true;
            node.terminal_value = 0.0;
            return;
        }

        let masked = mask_priors(&legal, priors);
        for (mv, prior) in legal.into_iter().zip(masked) {
            let child_state = self.rules.apply(&self.tree.get(node_id).state, &mv);
            let terminal_value = self.rules.terminal_value(&child_state);
            self.tree
                .add_child(node_id, mv, prior, child_state, terminal_value);
        }
        self.tree.get_mut(node_id).expanded = true;
    }

    /// Run `n` simulations sharing one evaluator call.
    ///
    /// Pending paths carry virtual loss until their leaf is evaluated.
    /// Terminal leaves are backed up immediately. A leaf reached by several
    /// paths is expanded once and backed up once per path.
    fn simulate_batch(&mut self, n: usize) -> Result<(), SearchError> {
        let loss = self.config.virtual_loss;
        let mut unique: Vec<NodeId> = Vec::new();
        let mut pending: Vec<(usize, NodeId, Vec<NodeId>)> = Vec::with_capacity(n);

        for _ in 0..n {
            let (leaf, path) = self.select();
            let node = self.tree.get(leaf);
            if node.is_terminal {
                let value = node.terminal_value;
                self.stats.terminal_hits += 1;
                self.tree.backpropagate(leaf, value);
                continue;
            }

            self.tree.apply_virtual_loss(&path, loss);
            let slot = match unique.iter().position(|id| *id == leaf) {
                Some(i) => i,
                None => {
                    unique.push(leaf);
                    unique.len() - 1
                }
            };
            pending.push((slot, leaf, path));
        }

        if pending.is_empty() {
            return Ok(());
        }

        let legal: Vec<Vec<G::Move>> = unique
            .iter()
            .map(|id| self.rules.legal_moves(&self.tree.get(*id).state))
            .collect();

        let evals = {
            let batch: Vec<(&G::State, &[G::Move])> = unique
                .iter()
                .zip(&legal)
                .map(|(id, moves)| (&self.tree.get(*id).state, moves.as_slice()))
                .collect();
            self.evaluator.evaluate_batch(self.rules, &batch)
        };
        self.stats.batches += 1;

        let evals = match evals {
            Ok(evals) if evals.len() == unique.len() => evals,
            Ok(evals) => {
                self.release(&pending);
                return Err(EvaluatorError::InvalidPolicy(format!(
                    "expected {} results, got {}",
                    unique.len(),
                    evals.len()
                ))
                .into());
            }
            Err(e) => {
                self.release(&pending);
                return Err(e.into());
            }
        };
        self.stats.evaluations += unique.len() as u32;

        let mut values = Vec::with_capacity(unique.len());
        for ((&id, moves), eval) in unique.iter().zip(legal).zip(evals) {
            self.expand(id, moves, &eval.priors);
            let node = self.tree.get(id);
            values.push(if node.is_terminal {
                node.terminal_value
            } else {
                sanitize_value(eval.value)
            });
        }

        for (slot, leaf, path) in &pending {
            self.tree.remove_virtual_loss(path, loss);
            self.tree.backpropagate(*leaf, values[*slot]);
        }

        trace!(
            batch = n,
            evaluated = unique.len(),
            root_visits = self.tree.get(self.tree.root()).visit_count,
            "MCTS batch complete"
        );
        Ok(())
    }

    fn release(&mut self, pending: &[(usize, NodeId, Vec<NodeId>)]) {
        for (_, _, path) in pending {
            self.tree.remove_virtual_loss(path, self.config.virtual_loss);
        }
    }

    /// Select a leaf node by traversing the tree using PUCT.
    fn select(&self) -> (NodeId, Vec<NodeId>) {
        let mut path = vec![self.tree.root()];
        let mut current = self.tree.root();

        loop {
            if self.tree.get(current).is_leaf() {
                break;
            }
            match self.tree.select_child(current, self.config.c_puct) {
                Some(child_id) => {
                    path.push(child_id);
                    current = child_id;
                }
                None => break,
            }
        }

        (current, path)
    }

    /// Mix Dirichlet noise into the root priors.
    fn add_dirichlet_noise(&mut self, rng: &mut ChaCha20Rng) -> Result<(), SearchError> {
        let children = self.tree.root_children().to_vec();
        if children.is_empty() {
            return Ok(());
        }

        let noise = dirichlet_noise(children.len(), self.config.dirichlet_alpha, rng)?;
        let eps = self.config.dirichlet_epsilon;
        for (child_id, n) in children.into_iter().zip(noise) {
            let child = self.tree.get_mut(child_id);
            child.prior = (1.0 - eps) * child.prior + eps * n;
        }
        Ok(())
    }

    /// Pick a root child, skipping `excluded`.
    ///
    /// With visits at the root the pool is the visited children, weighted by
    /// visit count; with a zero budget it is every child, weighted by prior.
    fn choose_candidate(&self, excluded: &[NodeId], rng: &mut ChaCha20Rng) -> Option<NodeId> {
        let root = self.tree.get(self.tree.root());
        let use_priors = root.visit_count == 0;

        let pool: Vec<(NodeId, f32)> = root
            .children
            .iter()
            .filter(|id| !excluded.contains(id))
            .filter_map(|&id| {
                let node = self.tree.get(id);
                if use_priors {
                    Some((id, node.prior))
                } else if node.visit_count > 0 {
                    Some((id, node.visit_count as f32))
                } else {
                    None
                }
            })
            .collect();

        let (&first, rest) = pool.split_first()?;

        if self.config.temperature < 1e-6 {
            // Greedy; the earliest child wins ties
            let mut best = first;
            for &candidate in rest {
                if candidate.1 > best.1 {
                    best = candidate;
                }
            }
            return Some(best.0);
        }

        let max = pool.iter().map(|(_, w)| *w).fold(0.0f32, f32::max);
        if max <= 0.0 {
            return Some(first.0);
        }
        let inv_t = 1.0 / self.config.temperature;
        let weights: Vec<f32> = pool.iter().map(|(_, w)| (w / max).powf(inv_t)).collect();
        sample_index(&weights, rng).map(|i| pool[i].0)
    }

    /// Choose a move and run it through the validator, retrying on rejection.
    fn choose_validated(&mut self, rng: &mut ChaCha20Rng) -> Result<NodeId, SearchError> {
        let root_id = self.tree.root();
        let before = self
            .config
            .validate_moves
            .then(|| self.rules.inventory(&self.tree.get(root_id).state));
        let mut excluded: Vec<NodeId> = Vec::new();

        loop {
            let Some(candidate) = self.choose_candidate(&excluded, rng) else {
                return Err(SearchError::NoLegalMoveSurvivedValidation {
                    attempts: excluded.len(),
                });
            };
            let Some(before) = &before else {
                return Ok(candidate);
            };

            let node = self.tree.get(candidate);
            let Some(mv) = node.mv.clone() else {
                return Ok(candidate);
            };
            let effect = self.rules.move_effect(&self.tree.get(root_id).state, &mv);
            let result = validate(before, &self.rules.inventory(&node.state), &effect);
            if result.ok {
                return Ok(candidate);
            }

            debug!(
                mv = ?mv,
                kind = ?result.primary_kind(),
                attempt = excluded.len() + 1,
                "Candidate move rejected by validator"
            );
            let after = node.state.clone();
            self.rejected.push(Rejection { mv, after, result });
            excluded.push(candidate);

            if excluded.len() > self.config.max_retries as usize {
                return Err(SearchError::NoLegalMoveSurvivedValidation {
                    attempts: excluded.len(),
                });
            }
        }
    }
}

/// Sample an index with probability proportional to `weights`.
fn sample_index(weights: &[f32], rng: &mut ChaCha20Rng) -> Option<usize> {
    let total: f32 = weights.iter().sum();
    if !(total > 0.0) {
        return None;
    }

    let r: f32 = rng.gen::<f32>() * total;
    let mut cumsum = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumsum += w;
        if r < cumsum {
            return Some(i);
        }
    }

    // Fallback to last non-zero weight (handles floating point issues)
    weights.iter().rposition(|&w| w > 0.0)
}

/// Generate Dirichlet-distributed noise using Gamma variates.
fn dirichlet_noise(
    n: usize,
    alpha: f32,
    rng: &mut ChaCha20Rng,
) -> Result<Vec<f32>, SearchError> {
    use rand_distr::{Distribution, Gamma};

    let gamma = Gamma::new(alpha as f64, 1.0)
        .map_err(|e| SearchError::InvalidConfig(format!("dirichlet_alpha {alpha}: {e}")))?;
    let mut samples: Vec<f32> = (0..n).map(|_| gamma.sample(rng) as f32).collect();

    let sum: f32 = samples.iter().sum();
    if sum > 0.0 {
        for s in &mut samples {
            *s /= sum;
        }
    } else {
        samples.iter_mut().for_each(|s| *s = 1.0 / n as f32);
    }

    Ok(samples)
}

/// Convenience function to run a single search and return the chosen move.
pub fn select_move<G: GameRules, E: Evaluator<G> + ?Sized>(
    rules: &G,
    state: &G::State,
    legal_moves: &[G::Move],
    evaluator: &E,
    config: MctsConfig,
    rng: &mut ChaCha20Rng,
) -> Result<SearchResult<G::State, G::Move>, SearchError> {
    let mut search = MctsSearch::new(rules, evaluator, config, state.clone(), legal_moves.to_vec())?;
    search.run(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvalResult, UniformEvaluator};
    use engine_core::{GameStatus, MoveEffect, PieceInventory, Side};
    use games_checkers::{Checkers, CheckersMove, CheckersState, KING};
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use validation::ViolationKind;

    /// Checkers whose inventory reports a conjured king after any `bad` move.
    #[derive(Debug)]
    struct Tampered {
        inner: Checkers,
        bad: Vec<CheckersMove>,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TamperedState {
        board: CheckersState,
        magic: bool,
    }

    impl GameRules for Tampered {
        type State = TamperedState;
        type Move = CheckersMove;

        fn name(&self) -> &'static str {
            "tampered-checkers"
        }
        fn initial_state(&self) -> TamperedState {
            TamperedState {
                board: self.inner.initial_state(),
                magic: false,
            }
        }
        fn side_to_move(&self, s: &TamperedState) -> Side {
            self.inner.side_to_move(&s.board)
        }
        fn legal_moves(&self, s: &TamperedState) -> Vec<CheckersMove> {
            self.inner.legal_moves(&s.board)
        }
        fn apply(&self, s: &TamperedState, mv: &CheckersMove) -> TamperedState {
            TamperedState {
                board: self.inner.apply(&s.board, mv),
                magic: self.bad.contains(mv),
            }
        }
        fn status(&self, s: &TamperedState) -> GameStatus {
            self.inner.status(&s.board)
        }
        fn inventory(&self, s: &TamperedState) -> PieceInventory {
            let mut inv = self.inner.inventory(&s.board);
            if s.magic {
                let mover = self.inner.side_to_move(&s.board).opponent();
                inv.add(mover, KING, 1);
            }
            inv
        }
        fn move_effect(&self, s: &TamperedState, mv: &CheckersMove) -> MoveEffect {
            self.inner.move_effect(&s.board, mv)
        }
    }

    /// Puts 0.9 of the prior on one move.
    struct Preferring(CheckersMove);

    impl<G: GameRules<Move = CheckersMove>> Evaluator<G> for Preferring {
        fn evaluate(
            &self,
            _rules: &G,
            _state: &G::State,
            legal: &[CheckersMove],
        ) -> Result<EvalResult<CheckersMove>, EvaluatorError> {
            let rest = 0.1 / legal.len().saturating_sub(1).max(1) as f32;
            Ok(EvalResult {
                priors: legal
                    .iter()
                    .map(|m| (*m, if *m == self.0 { 0.9 } else { rest }))
                    .collect(),
                value: 0.0,
            })
        }
    }

    struct Offline;

    impl<G: GameRules> Evaluator<G> for Offline {
        fn evaluate(
            &self,
            _rules: &G,
            _state: &G::State,
            _legal: &[G::Move],
        ) -> Result<EvalResult<G::Move>, EvaluatorError> {
            Err(EvaluatorError::Unavailable("model offline".into()))
        }
    }

    /// Uniform evaluator that records the largest batch it was given.
    #[derive(Default)]
    struct BatchCounter {
        largest: AtomicUsize,
        calls: AtomicUsize,
    }

    impl<G: GameRules> Evaluator<G> for BatchCounter {
        fn evaluate(
            &self,
            _rules: &G,
            _state: &G::State,
            legal: &[G::Move],
        ) -> Result<EvalResult<G::Move>, EvaluatorError> {
            Ok(EvalResult::uniform(legal, 0.0))
        }

        fn evaluate_batch(
            &self,
            _rules: &G,
            batch: &[(&G::State, &[G::Move])],
        ) -> Result<Vec<EvalResult<G::Move>>, EvaluatorError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.largest.fetch_max(batch.len(), Ordering::Relaxed);
            Ok(batch
                .iter()
                .map(|(_, legal)| EvalResult::uniform(legal, 0.0))
                .collect())
        }
    }

    fn rng(seed: u64) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(seed)
    }

    fn winning_position() -> CheckersState {
        CheckersState::from_rows(
            &["......", "......", "......", "..x...", ".o.X..", "x....."],
            Side::First,
        )
        .unwrap()
    }

    #[test]
    fn test_mcts_basic_search() {
        let rules = Checkers::mini();
        let state = rules.initial_state();
        let legal = rules.legal_moves(&state);
        let config = MctsConfig::for_testing();

        let result =
            select_move(&rules, &state, &legal, &UniformEvaluator, config, &mut rng(42)).unwrap();

        assert!(legal.contains(&result.mv));
        assert_eq!(result.next_state, rules.apply(&state, &result.mv));
        let sum: f32 = result.policy.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 0.01);
        assert_eq!(result.simulations, 50);
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_root_visit_accounting() {
        let rules = Checkers::mini();
        let state = rules.initial_state();

        for batch in [1, 4, 16] {
            let config = MctsConfig::for_testing()
                .with_simulations(64)
                .with_eval_batch_size(batch);
            let mut search = MctsSearch::new(
                &rules,
                &UniformEvaluator,
                config,
                state.clone(),
                rules.legal_moves(&state),
            )
            .unwrap();
            search.run(&mut rng(1)).unwrap();

            let tree = search.tree();
            let root = tree.get(tree.root());
            assert_eq!(root.visit_count, 64, "batch size {batch}");
            let child_visits: u32 = root
                .children
                .iter()
                .map(|id| tree.get(*id).visit_count)
                .sum();
            assert_eq!(child_visits, 64, "batch size {batch}");

            for i in 0..tree.len() {
                assert_eq!(tree.get(NodeId(i as u32)).virtual_loss, 0.0);
            }
        }
    }

    #[test]
    fn test_priors_are_normalized() {
        let rules = Checkers::mini();
        let state = rules.initial_state();

        for config in [MctsConfig::for_testing(), MctsConfig::for_training()] {
            let config = config.with_simulations(16);
            let preferring = Preferring(rules.legal_moves(&state)[0]);
            let mut search = MctsSearch::new(
                &rules,
                &preferring,
                config,
                state.clone(),
                rules.legal_moves(&state),
            )
            .unwrap();
            search.run(&mut rng(3)).unwrap();

            let tree = search.tree();
            for i in 0..tree.len() {
                let node = tree.get(NodeId(i as u32));
                if node.children.is_empty() {
                    continue;
                }
                let total: f32 = node.children.iter().map(|id| tree.get(*id).prior).sum();
                assert!((total - 1.0).abs() < 1e-4, "priors sum to {total}");
            }
        }
    }

    #[test]
    fn test_mcts_finds_winning_move() {
        let rules = Checkers::mini();
        let state = winning_position();
        let legal = rules.legal_moves(&state);
        let config = MctsConfig::for_testing().with_simulations(400);

        let mut search =
            MctsSearch::new(&rules, &UniformEvaluator, config, state, legal).unwrap();
        let result = search.run(&mut rng(42)).unwrap();

        assert_eq!(result.mv.from, 4 * 6 + 3);
        assert_eq!(result.mv.to, 5 * 6 + 2);
        assert!(
            result.value > 0.0,
            "root value should be positive, got {}",
            result.value
        );

        let tree = search.tree();
        let winning = tree
            .root_children()
            .iter()
            .map(|id| tree.get(*id))
            .find(|n| n.mv == Some(result.mv))
            .unwrap();
        assert!(winning.is_terminal);
        assert!((winning.terminal_value + 1.0).abs() < 1e-6);

        let share = result
            .policy
            .iter()
            .find(|(m, _)| *m == result.mv)
            .map(|(_, p)| *p)
            .unwrap();
        assert!(share > 0.5, "policy should favor the win, got {share}");
        assert!(result.stats.terminal_hits > 0);
    }

    #[test]
    fn test_zero_budget_uses_priors() {
        let rules = Checkers::mini();
        let state = rules.initial_state();
        let legal = rules.legal_moves(&state);
        let favourite = legal[3];
        let config = MctsConfig::for_testing().with_simulations(0);

        let result =
            select_move(&rules, &state, &legal, &Preferring(favourite), config, &mut rng(0))
                .unwrap();
        assert_eq!(result.mv, favourite);
        assert_eq!(result.simulations, 0);
        assert_eq!(result.stats.evaluations, 1);
    }

    #[test]
    fn test_validation_retry_takes_next_most_visited() {
        let rules = Checkers::mini();
        let start = rules.initial_state();
        let legal = rules.legal_moves(&start);
        let m1 = legal[1];

        let tampered = Tampered {
            inner: rules,
            bad: vec![m1],
        };
        let state = tampered.initial_state();
        let config = MctsConfig::for_testing().with_simulations(100);
        let evaluator = Preferring(m1);

        let mut search =
            MctsSearch::new(&tampered, &evaluator, config, state.clone(), legal.clone()).unwrap();
        let result = search.run(&mut rng(5)).unwrap();

        // m1 was the most visited child but produced a conjured king
        let tree = search.tree();
        let visits = |mv: CheckersMove| {
            tree.root_children()
                .iter()
                .map(|id| tree.get(*id))
                .find(|n| n.mv == Some(mv))
                .map(|n| n.visit_count)
                .unwrap()
        };
        let mut expected = None;
        for mv in legal.iter().filter(|m| **m != m1) {
            if expected.map_or(true, |(_, v)| visits(*mv) > v) {
                expected = Some((*mv, visits(*mv)));
            }
        }
        assert!(legal.iter().all(|m| visits(m1) >= visits(*m)));

        assert_eq!(result.mv, expected.unwrap().0);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].mv, m1);
        assert!(result.rejected[0].after.magic);
        assert_eq!(
            result.rejected[0].result.primary_kind(),
            Some(ViolationKind::PieceCreated)
        );
        assert!(!result.next_state.magic);
    }

    #[test]
    fn test_exhausted_retries_fail() {
        let rules = Checkers::mini();
        let legal = rules.legal_moves(&rules.initial_state());
        let tampered = Tampered {
            inner: rules,
            bad: legal.clone(),
        };
        let state = tampered.initial_state();
        let config = MctsConfig::for_testing().with_max_retries(2);

        let mut search =
            MctsSearch::new(&tampered, &UniformEvaluator, config, state, legal).unwrap();
        let err = search.run(&mut rng(9)).unwrap_err();

        assert_eq!(err, SearchError::NoLegalMoveSurvivedValidation { attempts: 3 });
        assert_eq!(search.rejections().len(), 3);
    }

    #[test]
    fn test_pool_exhaustion_stops_retries() {
        let rules = Checkers::mini();
        let legal = rules.legal_moves(&rules.initial_state());
        let tampered = Tampered {
            inner: rules,
            bad: legal.clone(),
        };
        let state = tampered.initial_state();
        let config = MctsConfig::for_testing().with_max_retries(10);

        let mut search =
            MctsSearch::new(&tampered, &UniformEvaluator, config, state, legal.clone()).unwrap();
        let err = search.run(&mut rng(9)).unwrap_err();

        assert_eq!(
            err,
            SearchError::NoLegalMoveSurvivedValidation {
                attempts: legal.len()
            }
        );
    }

    #[test]
    fn test_validation_disabled_accepts_anything() {
        let rules = Checkers::mini();
        let legal = rules.legal_moves(&rules.initial_state());
        let tampered = Tampered {
            inner: rules,
            bad: legal.clone(),
        };
        let state = tampered.initial_state();
        let config = MctsConfig::for_testing().with_validation(false);

        let result =
            select_move(&tampered, &state, &legal, &UniformEvaluator, config, &mut rng(9))
                .unwrap();
        assert!(result.rejected.is_empty());
        assert!(result.next_state.magic);
    }

    #[test]
    fn test_evaluator_failure_surfaces() {
        let rules = Checkers::mini();
        let state = rules.initial_state();
        let legal = rules.legal_moves(&state);

        let err = select_move(
            &rules,
            &state,
            &legal,
            &Offline,
            MctsConfig::for_testing(),
            &mut rng(0),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SearchError::Evaluator(EvaluatorError::Unavailable(_))
        ));
    }

    #[test]
    fn test_cancelled_search() {
        let rules = Checkers::mini();
        let state = rules.initial_state();
        let token = CancelToken::new();
        token.cancel();

        let mut search = MctsSearch::new(
            &rules,
            &UniformEvaluator,
            MctsConfig::for_testing(),
            state.clone(),
            rules.legal_moves(&state),
        )
        .unwrap()
        .with_cancel(token);
        assert_eq!(search.run(&mut rng(0)).unwrap_err(), SearchError::Cancelled);
    }

    #[test]
    fn test_no_legal_moves() {
        let rules = Checkers::mini();
        let state = rules.initial_state();
        let err = select_move(
            &rules,
            &state,
            &[],
            &UniformEvaluator,
            MctsConfig::for_testing(),
            &mut rng(0),
        )
        .unwrap_err();
        assert_eq!(err, SearchError::NoLegalMoves);
    }

    #[test]
    fn test_batches_reach_evaluator() {
        let rules = Checkers::mini();
        let state = rules.initial_state();
        let counter = BatchCounter::default();
        let config = MctsConfig::for_testing()
            .with_simulations(64)
            .with_eval_batch_size(8);

        let result = select_move(
            &rules,
            &state,
            &rules.legal_moves(&state),
            &counter,
            config,
            &mut rng(2),
        )
        .unwrap();

        assert!(counter.largest.load(Ordering::Relaxed) > 1);
        assert_eq!(counter.calls.load(Ordering::Relaxed), 8);
        assert_eq!(result.simulations, 64);
    }

    #[test]
    fn test_same_seed_same_result() {
        let rules = Checkers::mini();
        let state = rules.initial_state();
        let legal = rules.legal_moves(&state);
        let config = MctsConfig::for_training().with_simulations(64);

        let a = select_move(&rules, &state, &legal, &UniformEvaluator, config.clone(), &mut rng(7))
            .unwrap();
        let b = select_move(&rules, &state, &legal, &UniformEvaluator, config, &mut rng(7))
            .unwrap();

        assert_eq!(a.mv, b.mv);
        assert_eq!(a.policy, b.policy);
    }

    #[test]
    fn test_sample_index() {
        let mut rng = rng(42);
        let weights = vec![0.0, 0.5, 0.3, 0.2, 0.0];

        let mut counts = [0u32; 5];
        for _ in 0..1000 {
            let i = sample_index(&weights, &mut rng).unwrap();
            counts[i] += 1;
        }

        assert_eq!(counts[0], 0);
        assert_eq!(counts[4], 0);
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > counts[3]);

        assert_eq!(sample_index(&[0.0, 0.0], &mut rng), None);
    }

    #[test]
    fn test_dirichlet_noise() {
        let mut rng = rng(42);
        let noise = dirichlet_noise(5, 0.3, &mut rng).unwrap();

        let sum: f32 = noise.iter().sum();
        assert!((sum - 1.0).abs() < 0.01);
        assert!(noise.iter().all(|n| *n >= 0.0));
    }
}
