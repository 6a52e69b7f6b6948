//! Per-side piece inventories.
//!
//! An inventory is a derived view of a board: how many pieces of each kind
//! each side holds. The validator compares inventories before and after a
//! move to detect pieces that appear without legal provenance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    First,
    Second,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::First, Side::Second];

    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }

    /// 0 for the first player, 1 for the second.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::First => write!(f, "first"),
            Side::Second => write!(f, "second"),
        }
    }
}

/// Game-defined piece type, named by a static identifier (e.g. `"man"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PieceKind(pub &'static str);

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Counts of pieces keyed by (side, kind).
///
/// Zero counts are never stored, so a key's presence means at least one
/// piece of that kind is on the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceInventory {
    counts: BTreeMap<(Side, PieceKind), u32>,
}

impl PieceInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` pieces of `kind` for `side`.
    pub fn add(&mut self, side: Side, kind: PieceKind, n: u32) {
        if n == 0 {
            return;
        }
        *self.counts.entry((side, kind)).or_insert(0) += n;
    }

    /// Remove up to `n` pieces, dropping the entry when it reaches zero.
    pub fn remove(&mut self, side: Side, kind: PieceKind, n: u32) {
        if let Some(count) = self.counts.get_mut(&(side, kind)) {
            *count = count.saturating_sub(n);
            if *count == 0 {
                self.counts.remove(&(side, kind));
            }
        }
    }

    #[inline]
    pub fn count(&self, side: Side, kind: PieceKind) -> u32 {
        self.counts.get(&(side, kind)).copied().unwrap_or(0)
    }

    /// Total pieces held by a side across all kinds.
    pub fn total(&self, side: Side) -> u32 {
        self.counts
            .iter()
            .filter(|((s, _), _)| *s == side)
            .map(|(_, n)| *n)
            .sum()
    }

    /// Whether any piece of this kind is present for the side.
    #[inline]
    pub fn contains(&self, side: Side, kind: PieceKind) -> bool {
        self.counts.contains_key(&(side, kind))
    }

    /// Iterate over non-zero entries in (side, kind) order.
    pub fn iter(&self) -> impl Iterator<Item = (Side, PieceKind, u32)> + '_ {
        self.counts.iter().map(|((s, k), n)| (*s, *k, *n))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(Side, PieceKind)> for PieceInventory {
    fn from_iter<I: IntoIterator<Item = (Side, PieceKind)>>(iter: I) -> Self {
        let mut inv = PieceInventory::new();
        for (side, kind) in iter {
            inv.add(side, kind, 1);
        }
        inv
    }
}

impl fmt::Display for PieceInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(side, kind, n)| format!("{side}:{kind}={n}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
