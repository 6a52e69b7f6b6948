//! Typed rules trait consumed by the search engine and the league.
//!
//! Game crates implement [`GameRules`] with their own state and move types.
//! The core never re-derives move generation; it only asks the rules for
//! legal moves, applies them, and reads back piece inventories so that the
//! validator can audit every transition.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::inventory::{PieceInventory, PieceKind, Side};

/// Terminal status of a position as judged by the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Ongoing,
    Won(Side),
    Drawn,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Ongoing)
    }
}

/// A piece conversion declared by a move (e.g. a man crowned as king).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub from: PieceKind,
    pub to: PieceKind,
}

/// What a move claims to do to the piece inventory.
///
/// The validator compares this declaration against the inventories of the
/// states before and after the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveEffect {
    /// Side making the move
    pub mover: Side,
    /// Number of opposing pieces removed by the move
    pub captures: u32,
    /// Declared promotion, if any
    pub promotion: Option<Promotion>,
}

impl MoveEffect {
    /// A move that neither captures nor promotes.
    pub fn quiet(mover: Side) -> Self {
        Self {
            mover,
            captures: 0,
            promotion: None,
        }
    }

    /// A move removing `n` opposing pieces.
    pub fn capture(mover: Side, n: u32) -> Self {
        Self {
            mover,
            captures: n,
            promotion: None,
        }
    }

    /// Builder: declare a promotion from one piece kind to another.
    pub fn with_promotion(mut self, from: PieceKind, to: PieceKind) -> Self {
        self.promotion = Some(Promotion { from, to });
        self
    }

    pub fn is_capture(&self) -> bool {
        self.captures > 0
    }
}

/// Rules of a two-player, zero-sum board game.
///
/// Implementations are assumed correct and total over reachable states.
/// States are immutable values: [`GameRules::apply`] returns a new state and
/// never mutates its input.
///
/// # Example
///
/// ```rust
/// use engine_core::{GameRules, GameStatus, MoveEffect, PieceInventory, PieceKind, Side};
///
/// const STONE: PieceKind = PieceKind("stone");
///
/// /// Players alternately remove one or two stones from their own heap;
/// /// whoever empties their heap first wins.
/// #[derive(Debug)]
/// struct Heaps;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct HeapState { heaps: [u32; 2], to_move: Side }
///
/// impl GameRules for Heaps {
///     type State = HeapState;
///     type Move = u32;
///
///     fn name(&self) -> &'static str { "heaps" }
///     fn initial_state(&self) -> HeapState { HeapState { heaps: [3, 3], to_move: Side::First } }
///     fn side_to_move(&self, s: &HeapState) -> Side { s.to_move }
///     fn legal_moves(&self, s: &HeapState) -> Vec<u32> {
///         (1..=2).filter(|n| *n <= s.heaps[s.to_move.index()]).collect()
///     }
///     fn apply(&self, s: &HeapState, mv: &u32) -> HeapState {
///         let mut next = s.clone();
///         next.heaps[s.to_move.index()] -= mv;
///         next.to_move = s.to_move.opponent();
///         next
///     }
///     fn status(&self, s: &HeapState) -> GameStatus {
///         match s.heaps {
///             [0, _] => GameStatus::Won(Side::First),
///             [_, 0] => GameStatus::Won(Side::Second),
///             _ => GameStatus::Ongoing,
///         }
///     }
///     fn inventory(&self, s: &HeapState) -> PieceInventory {
///         let mut inv = PieceInventory::new();
///         inv.add(Side::First, STONE, s.heaps[0]);
///         inv.add(Side::Second, STONE, s.heaps[1]);
///         inv
///     }
///     fn move_effect(&self, s: &HeapState, _mv: &u32) -> MoveEffect {
///         MoveEffect::quiet(s.to_move)
///     }
/// }
///
/// let rules = Heaps;
/// let s = rules.apply(&rules.initial_state(), &2);
/// assert_eq!(rules.side_to_move(&s), Side::Second);
/// ```
pub trait GameRules: Send + Sync + Debug + 'static {
    /// Immutable board snapshot
    type State: Clone + Debug + Send + Sync + 'static;

    /// A legal transition between states
    type Move: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Short identifier used in logs and records.
    fn name(&self) -> &'static str;

    /// Starting position.
    fn initial_state(&self) -> Self::State;

    /// Side whose turn it is.
    fn side_to_move(&self, state: &Self::State) -> Side;

    /// Legal moves in enumeration order. Empty for terminal states.
    fn legal_moves(&self, state: &Self::State) -> Vec<Self::Move>;

    /// Apply a legal move, producing the successor state.
    fn apply(&self, state: &Self::State, mv: &Self::Move) -> Self::State;

    /// Terminal status of the position.
    fn status(&self, state: &Self::State) -> GameStatus;

    /// Per-side, per-kind piece counts.
    fn inventory(&self, state: &Self::State) -> PieceInventory;

    /// Declared effect of playing `mv` from `state`.
    fn move_effect(&self, state: &Self::State, mv: &Self::Move) -> MoveEffect;

    /// Value of a terminal state from the perspective of the side to move.
    ///
    /// Returns `None` while the game is ongoing, otherwise +1 for a win,
    /// -1 for a loss and 0 for a draw.
    fn terminal_value(&self, state: &Self::State) -> Option<f32> {
        match self.status(state) {
            GameStatus::Ongoing => None,
            GameStatus::Drawn => Some(0.0),
            GameStatus::Won(winner) => {
                if winner == self.side_to_move(state) {
                    Some(1.0)
                } else {
                    Some(-1.0)
                }
            }
        }
    }
}
