//! Checkers (draughts) rules for the Ludus engine
//!
//! This crate provides a reference [`GameRules`] implementation used by the
//! league binary, the search tests and the benches. It plays on any even
//! board size with men and kings:
//!
//! - Men move one square diagonally forward; kings move in all four directions.
//! - Captures jump an adjacent opposing piece and are mandatory.
//! - A capture ends the turn (no multi-jump chains).
//! - A man reaching the far row is crowned.
//! - A side with no legal moves loses.
//! - `no_progress_limit` consecutive king moves without a capture draw the game.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{GameRules, GameStatus};
//! use games_checkers::Checkers;
//!
//! let rules = Checkers::mini();
//! let start = rules.initial_state();
//! let moves = rules.legal_moves(&start);
//! assert_eq!(moves.len(), 5);
//!
//! let next = rules.apply(&start, &moves[0]);
//! assert_eq!(rules.status(&next), GameStatus::Ongoing);
//! ```

use engine_core::{GameRules, GameStatus, MoveEffect, PieceInventory, PieceKind, Side};
use std::fmt;


/// Uncrowned piece.
pub const MAN: PieceKind = PieceKind("man");
/// Crowned piece.
pub const KING: PieceKind = PieceKind("king");

/// Contents of one board square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Man(Side),
    King(Side),
}

impl Cell {
    fn owner(self) -> Option<Side> {
        match self {
            Cell::Empty => None,
            Cell::Man(s) | Cell::King(s) => Some(s),
        }
    }

    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Man(Side::First) => 'x',
            Cell::King(Side::First) => 'X',
            Cell::Man(Side::Second) => 'o',
            Cell::King(Side::Second) => 'O',
        }
    }

    fn from_symbol(c: char) -> Option<Cell> {
        match c {
            '.' | '_' => Some(Cell::Empty),
            'x' => Some(Cell::Man(Side::First)),
            'X' => Some(Cell::King(Side::First)),
            'o' => Some(Cell::Man(Side::Second)),
            'O' => Some(Cell::King(Side::Second)),
            _ => None,
        }
    }
}

/// Error returned when parsing a board diagram fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBoardError(String);

impl fmt::Display for ParseBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid board: {}", self.0)
    }
}

impl std::error::Error for ParseBoardError {}

/// Checkers position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckersState {
    size: u8,
    cells: Vec<Cell>,
    to_move: Side,
    /// Consecutive plies without a capture or a man move
    quiet_plies: u32,
}

impl CheckersState {
    /// Parse a board diagram, one string per row starting at row 0.
    ///
    /// `x`/`X` are first-side men/kings (moving toward row 0), `o`/`O` are
    /// second-side men/kings, `.` is empty.
    pub fn from_rows(rows: &[&str], to_move: Side) -> Result<Self, ParseBoardError> {
        let size = rows.len();
        if size < 4 || size > 16 || size % 2 != 0 {
            return Err(ParseBoardError(format!("unsupported size {size}")));
        }

        let mut cells = Vec::with_capacity(size * size);
        for (r, row) in rows.iter().enumerate() {
            let chars: Vec<char> = row.chars().collect();
            if chars.len() != size {
                return Err(ParseBoardError(format!(
                    "row {r} has {} squares, expected {size}",
                    chars.len()
                )));
            }
            for c in chars {
                let cell = Cell::from_symbol(c)
                    .ok_or_else(|| ParseBoardError(format!("unknown symbol '{c}'")))?;
                cells.push(cell);
            }
        }

        Ok(Self {
            size: size as u8,
            cells,
            to_move,
            quiet_plies: 0,
        })
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn to_move(&self) -> Side {
        self.to_move
    }

    pub fn quiet_plies(&self) -> u32 {
        self.quiet_plies
    }

    /// Cell at (row, col).
    pub fn cell(&self, row: u8, col: u8) -> Cell {
        self.cells[self.index(row, col)]
    }

    #[inline]
    fn index(&self, row: u8, col: u8) -> usize {
        row as usize * self.size as usize + col as usize
    }

    #[inline]
    fn coords(&self, square: u8) -> (i16, i16) {
        let n = self.size as i16;
        (square as i16 / n, square as i16 % n)
    }

    fn square_at(&self, row: i16, col: i16) -> Option<u8> {
        let n = self.size as i16;
        if row < 0 || col < 0 || row >= n || col >= n {
            return None;
        }
        Some((row * n + col) as u8)
    }
}

impl fmt::Display for CheckersState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.size as usize) {
            let line: String = row.iter().map(|c| c.symbol()).collect();
            writeln!(f, "{line}")?;
        }
        write!(f, "to move: {}", self.to_move)
    }
}

/// A single step or single jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckersMove {
    pub from: u8,
    pub to: u8,
    /// Square of the jumped piece, for captures
    pub captured: Option<u8>,
    /// Whether the moving man is crowned on arrival
    pub promotes: bool,
}

impl fmt::Display for CheckersMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.captured.is_some() { 'x' } else { '-' };
        write!(f, "{}{}{}", self.from, sep, self.to)?;
        if self.promotes {
            write!(f, "=K")?;
        }
        Ok(())
    }
}

/// Checkers rules for a given board size.
#[derive(Debug, Clone)]
pub struct Checkers {
    size: u8,
    rows_per_side: u8,
    no_progress_limit: u32,
}

impl Checkers {
    /// Board of `size`×`size` with `rows_per_side` rows of men per side.
    pub fn new(size: u8, rows_per_side: u8) -> Self {
        Self {
            size,
            rows_per_side,
            no_progress_limit: 40,
        }
    }

    /// Standard 8×8 board with 12 men per side.
    pub fn standard() -> Self {
        Self::new(8, 3)
    }

    /// 6×6 board with 6 men per side. Fast enough for tests.
    pub fn mini() -> Self {
        Self::new(6, 2)
    }

    /// Builder: set the number of quiet plies that draws the game.
    pub fn with_no_progress_limit(mut self, plies: u32) -> Self {
        self.no_progress_limit = plies;
        self
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    fn forward(side: Side) -> i16 {
        match side {
            Side::First => -1,
            Side::Second => 1,
        }
    }

    fn crowning_row(&self, side: Side) -> i16 {
        match side {
            Side::First => 0,
            Side::Second => self.size as i16 - 1,
        }
    }

    /// All moves for the side to move, ignoring the no-progress rule.
    fn generate(&self, state: &CheckersState) -> Vec<CheckersMove> {
        let side = state.to_move;
        let mut steps = Vec::new();
        let mut jumps = Vec::new();

        for square in 0..state.cells.len() as u8 {
            let cell = state.cells[square as usize];
            let (is_king, owner) = match cell {
                Cell::Man(s) => (false, s),
                Cell::King(s) => (true, s),
                Cell::Empty => continue,
            };
            if owner != side {
                continue;
            }

            let (row, col) = state.coords(square);
            let fwd = Self::forward(side);
            let dirs: &[(i16, i16)] = if is_king {
                &[(-1, -1), (-1, 1), (1, -1), (1, 1)]
            } else if fwd < 0 {
                &[(-1, -1), (-1, 1)]
            } else {
                &[(1, -1), (1, 1)]
            };

            for &(dr, dc) in dirs {
                let Some(adjacent) = state.square_at(row + dr, col + dc) else {
                    continue;
                };
                let promotes_at = |r: i16| !is_king && r == self.crowning_row(side);

                match state.cells[adjacent as usize].owner() {
                    None => steps.push(CheckersMove {
                        from: square,
                        to: adjacent,
                        captured: None,
                        promotes: promotes_at(row + dr),
                    }),
                    Some(o) if o != side => {
                        if let Some(landing) = state.square_at(row + 2 * dr, col + 2 * dc) {
                            if state.cells[landing as usize] == Cell::Empty {
                                jumps.push(CheckersMove {
                                    from: square,
                                    to: landing,
                                    captured: Some(adjacent),
                                    promotes: promotes_at(row + 2 * dr),
                                });
                            }
                        }
                    }
                    Some(_) => {}
                }
            }
        }

        if jumps.is_empty() {
            steps
        } else {
            jumps
        }
    }
}

impl GameRules for Checkers {
    type State = CheckersState;
    type Move = CheckersMove;

    fn name(&self) -> &'static str {
        "checkers"
    }

    fn initial_state(&self) -> CheckersState {
        let n = self.size;
        let mut cells = vec![Cell::Empty; n as usize * n as usize];
        for row in 0..n {
            for col in 0..n {
                if (row + col) % 2 == 0 {
                    continue;
                }
                let idx = row as usize * n as usize + col as usize;
                if row < self.rows_per_side {
                    cells[idx] = Cell::Man(Side::Second);
                } else if row >= n - self.rows_per_side {
                    cells[idx] = Cell::Man(Side::First);
                }
            }
        }

        CheckersState {
            size: n,
            cells,
            to_move: Side::First,
            quiet_plies: 0,
        }
    }

    fn side_to_move(&self, state: &CheckersState) -> Side {
        state.to_move
    }

    fn legal_moves(&self, state: &CheckersState) -> Vec<CheckersMove> {
        if state.quiet_plies >= self.no_progress_limit {
            return Vec::new();
        }
        self.generate(state)
    }

    fn apply(&self, state: &CheckersState, mv: &CheckersMove) -> CheckersState {
        let mut next = state.clone();
        let piece = next.cells[mv.from as usize];
        next.cells[mv.from as usize] = Cell::Empty;
        if let Some(captured) = mv.captured {
            next.cells[captured as usize] = Cell::Empty;
        }
        next.cells[mv.to as usize] = match piece {
            Cell::Man(side) if mv.promotes => Cell::King(side),
            other => other,
        };

        let progress = mv.captured.is_some() || matches!(piece, Cell::Man(_));
        next.quiet_plies = if progress { 0 } else { state.quiet_plies + 1 };
        next.to_move = state.to_move.opponent();
        next
    }

    fn status(&self, state: &CheckersState) -> GameStatus {
        if state.quiet_plies >= self.no_progress_limit {
            return GameStatus::Drawn;
        }
        if self.generate(state).is_empty() {
            return GameStatus::Won(state.to_move.opponent());
        }
        GameStatus::Ongoing
    }

    fn inventory(&self, state: &CheckersState) -> PieceInventory {
        state
            .cells
            .iter()
            .filter_map(|cell| match *cell {
                Cell::Man(s) => Some((s, MAN)),
                Cell::King(s) => Some((s, KING)),
                Cell::Empty => None,
            })
            .collect()
    }

    fn move_effect(&self, state: &CheckersState, mv: &CheckersMove) -> MoveEffect {
        let mover = state.to_move;
        let effect = if mv.captured.is_some() {
            MoveEffect::capture(mover, 1)
        } else {
            MoveEffect::quiet(mover)
        };
        if mv.promotes {
            effect.with_promotion(MAN, KING)
        } else {
            effect
        }
    }
}
