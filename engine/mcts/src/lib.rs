//! Monte Carlo Tree Search (MCTS) for AlphaZero-style game playing.
//!
//! This crate provides a game-agnostic MCTS implementation that works with any
//! game implementing the `engine-core` [`GameRules`](engine_core::GameRules) trait.
//!
//! # Overview
//!
//! MCTS is a search algorithm that builds a search tree by running simulations.
//! Each simulation consists of four phases:
//!
//! 1. **Selection**: Traverse the tree using PUCT to balance exploration and
//!    exploitation
//! 2. **Expansion**: When reaching a leaf, expand it by adding children for
//!    each legal move
//! 3. **Evaluation**: Use a policy/value evaluator (or uniform prior for testing)
//!    to estimate the value of the new state
//! 4. **Backpropagation**: Update visit counts and value estimates along the
//!    path from leaf to root
//!
//! Once the budget is spent the chosen root move is audited by the
//! `validation` crate. A rejected move is excluded and the next candidate
//! is drawn from the remaining visited children.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::GameRules;
//! use games_checkers::Checkers;
//! use mcts::{select_move, MctsConfig, UniformEvaluator};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let rules = Checkers::mini();
//! let state = rules.initial_state();
//! let legal = rules.legal_moves(&state);
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let result = select_move(
//!     &rules,
//!     &state,
//!     &legal,
//!     &UniformEvaluator::new(),
//!     MctsConfig::for_testing(),
//!     &mut rng,
//! )
//! .unwrap();
//!
//! assert!(legal.contains(&result.mv));
//! assert_eq!(result.simulations, 50);
//! ```
//!
//! # Configuration
//!
//! The [`MctsConfig`] struct controls search behavior:
//!
//! - `num_simulations`: Number of simulations per search (default: 200)
//! - `c_puct`: Exploration constant for PUCT (default: 1.25)
//! - `dirichlet_alpha` / `dirichlet_epsilon`: Root noise (default: 0.3 / 0.25)
//! - `temperature`: Temperature for move selection (1.0 = proportional, 0.0 = greedy)
//! - `eval_batch_size` / `virtual_loss`: Leaf batching
//! - `validate_moves` / `max_retries`: Validator gate on the chosen move
//!
//! # Evaluators
//!
//! The search requires an [`Evaluator`] to estimate policy and value:
//!
//! - [`UniformEvaluator`]: Uniform policy over legal moves, value 0
//! - [`MaterialEvaluator`]: Uniform policy, value from the material balance
//! - Model-backed evaluators live outside this crate
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------+
//! |                      MctsSearch                        |
//! +--------------------------------------------------------+
//! |  +-----------+   +-----------+   +------------------+  |
//! |  | MctsTree  |   | GameRules |   |    Evaluator     |  |
//! |  | (arena)   |   | (moves)   |   | (policy/value)   |  |
//! |  +-----+-----+   +-----+-----+   +--------+---------+  |
//! |        |               |                  |            |
//! |        v               v                  v            |
//! |  +--------------------------------------------------+  |
//! |  |  select -> expand -> evaluate -> backpropagate   |  |
//! |  +--------------------------------------------------+  |
//! |                          |                             |
//! |                          v                             |
//! |             choose -> validate -> retry                |
//! +--------------------------------------------------------+
//! ```

pub mod config;
pub mod evaluator;
pub mod node;
pub mod search;
pub mod tree;

// Re-export main types
pub use config::MctsConfig;
pub use evaluator::{
    mask_priors, EvalResult, Evaluator, EvaluatorError, MaterialEvaluator, UniformEvaluator,
};
pub use node::{MctsNode, NodeId};
pub use search::{select_move, MctsSearch, Rejection, SearchError, SearchResult, SearchStats};
pub use tree::{MctsTree, TreeStats};
