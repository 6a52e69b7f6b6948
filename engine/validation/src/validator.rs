//! Inventory-based transition checks.

use engine_core::{MoveEffect, PieceInventory, PieceKind, Side};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Category of an illegal transition.
///
/// Variants are ordered by precedence: when a transition has several
/// violations, the smallest kind is reported as the primary one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A (side, kind) pair with no prior presence appeared
    PieceCreated,
    /// A declared promotion did not match the inventories
    IllegalPromotion,
    /// A count rose without justification
    CountIncreased,
    /// A side total dropped by something other than the declared captures
    CaptureMismatch,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::PieceCreated => "piece_created",
            ViolationKind::IllegalPromotion => "illegal_promotion",
            ViolationKind::CountIncreased => "count_increased",
            ViolationKind::CaptureMismatch => "capture_mismatch",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub side: Side,
    /// Piece type involved; `None` for side-total checks
    pub piece: Option<PieceKind>,
    pub description: String,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub violations: Vec<Violation>,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
}

impl ValidationResult {
    /// Highest-precedence violation kind, if any.
    pub fn primary_kind(&self) -> Option<ViolationKind> {
        self.violations.iter().map(|v| v.kind).min()
    }

    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// All violation descriptions joined into one line.
    pub fn summary(&self) -> String {
        if self.violations.is_empty() {
            return "no violations".to_string();
        }
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.kind, v.description))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Check a transition between two inventories against a move's declared effect.
///
/// Checks run in order and every failure is collected:
///
/// 1. No per-type count may rise, except the mover's promotion target when
///    the declared promotion holds (target +1, source -1).
/// 2. The opponent's total drops by exactly `effect.captures`; the mover's
///    total is unchanged.
/// 3. A (side, type) pair absent before may not appear, except the target of
///    a valid promotion.
///
/// The function is pure apart from reading the clock for the timestamp.
pub fn validate(
    before: &PieceInventory,
    after: &PieceInventory,
    effect: &MoveEffect,
) -> ValidationResult {
    let mut violations = Vec::new();
    let mover = effect.mover;

    let promotion_ok = effect.promotion.map(|p| {
        let from_before = before.count(mover, p.from);
        from_before >= 1
            && after.count(mover, p.from) + 1 == from_before
            && after.count(mover, p.to) == before.count(mover, p.to) + 1
    });

    if let (Some(p), Some(false)) = (effect.promotion, promotion_ok) {
        violations.push(Violation {
            kind: ViolationKind::IllegalPromotion,
            side: mover,
            piece: Some(p.to),
            description: format!(
                "declared {}->{} promotion for {} does not match ({} {}->{}, {} {}->{})",
                p.from,
                p.to,
                mover,
                p.from,
                before.count(mover, p.from),
                after.count(mover, p.from),
                p.to,
                before.count(mover, p.to),
                after.count(mover, p.to),
            ),
        });
    }

    let keys: BTreeSet<(Side, PieceKind)> = before
        .iter()
        .chain(after.iter())
        .map(|(side, kind, _)| (side, kind))
        .collect();

    // (a) per-type counts
    let mut appeared = Vec::new();
    for &(side, kind) in &keys {
        let (b, a) = (before.count(side, kind), after.count(side, kind));
        if a <= b {
            continue;
        }
        let is_promotion_target =
            side == mover && effect.promotion.map_or(false, |p| p.to == kind);
        if is_promotion_target {
            // Either justified, or already reported as an illegal promotion
            continue;
        }
        if b == 0 {
            appeared.push((side, kind, a));
            continue;
        }
        violations.push(Violation {
            kind: ViolationKind::CountIncreased,
            side,
            piece: Some(kind),
            description: format!("{side} {kind} count rose from {b} to {a}"),
        });
    }

    // (b) side totals
    for side in Side::BOTH {
        let (b, a) = (before.total(side), after.total(side));
        let expected = if side == mover {
            i64::from(b)
        } else {
            i64::from(b) - i64::from(effect.captures)
        };
        if a > b {
            violations.push(Violation {
                kind: ViolationKind::CountIncreased,
                side,
                piece: None,
                description: format!("{side} total rose from {b} to {a}"),
            });
        } else if i64::from(a) != expected {
            violations.push(Violation {
                kind: ViolationKind::CaptureMismatch,
                side,
                piece: None,
                description: format!(
                    "{side} total went from {b} to {a}, expected {expected} for {} declared capture(s)",
                    effect.captures
                ),
            });
        }
    }

    // (c) ex nihilo creation
    for (side, kind, a) in appeared {
        violations.push(Violation {
            kind: ViolationKind::PieceCreated,
            side,
            piece: Some(kind),
            description: format!("{a} {side} {kind} appeared with no prior presence"),
        });
    }

    ValidationResult {
        ok: violations.is_empty(),
        violations,
        timestamp: unix_now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAN: PieceKind = PieceKind("man");
    const KING: PieceKind = PieceKind("king");

    fn inv(entries: &[(Side, PieceKind, u32)]) -> PieceInventory {
        let mut inv = PieceInventory::new();
        for &(side, kind, n) in entries {
            inv.add(side, kind, n);
        }
        inv
    }

    #[test]
    fn test_quiet_move_is_ok() {
        let before = inv(&[(Side::First, MAN, 6), (Side::Second, MAN, 6)]);
        let result = validate(&before, &before.clone(), &MoveEffect::quiet(Side::First));
        assert!(result.ok);
        assert!(result.violations.is_empty());
        assert!(result.timestamp > 0);
        assert_eq!(result.primary_kind(), None);
    }

    #[test]
    fn test_capture_is_ok() {
        let before = inv(&[(Side::First, MAN, 6), (Side::Second, MAN, 6)]);
        let after = inv(&[(Side::First, MAN, 6), (Side::Second, MAN, 5)]);
        let result = validate(&before, &after, &MoveEffect::capture(Side::First, 1));
        assert!(result.ok, "{}", result.summary());
    }

    #[test]
    fn test_first_promotion_is_ok() {
        let before = inv(&[(Side::First, MAN, 3), (Side::Second, MAN, 2)]);
        let after = inv(&[
            (Side::First, MAN, 2),
            (Side::First, KING, 1),
            (Side::Second, MAN, 2),
        ]);
        let effect = MoveEffect::quiet(Side::First).with_promotion(MAN, KING);
        assert!(validate(&before, &after, &effect).ok);
    }

    #[test]
    fn test_capture_with_promotion_is_ok() {
        let before = inv(&[(Side::Second, MAN, 1), (Side::First, MAN, 1)]);
        let after = inv(&[(Side::Second, KING, 1)]);
        let effect = MoveEffect::capture(Side::Second, 1).with_promotion(MAN, KING);
        let result = validate(&before, &after, &effect);
        assert!(result.ok, "{}", result.summary());
    }

    #[test]
    fn test_created_piece_is_detected() {
        let before = inv(&[(Side::First, MAN, 6), (Side::Second, MAN, 6)]);
        let after = inv(&[
            (Side::First, MAN, 6),
            (Side::First, KING, 1),
            (Side::Second, MAN, 6),
        ]);
        let result = validate(&before, &after, &MoveEffect::quiet(Side::First));
        assert!(!result.ok);
        assert!(result.has_kind(ViolationKind::PieceCreated));
        assert_eq!(result.primary_kind(), Some(ViolationKind::PieceCreated));

        let created = result
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::PieceCreated)
            .unwrap();
        assert_eq!(created.side, Side::First);
        assert_eq!(created.piece, Some(KING));
    }

    #[test]
    fn test_count_increase_is_detected() {
        let before = inv(&[(Side::First, MAN, 2), (Side::Second, MAN, 2)]);
        let after = inv(&[(Side::First, MAN, 2), (Side::Second, MAN, 3)]);
        let result = validate(&before, &after, &MoveEffect::quiet(Side::First));
        assert!(!result.ok);
        assert_eq!(result.primary_kind(), Some(ViolationKind::CountIncreased));
        // Per-type and side-total checks both fire
        assert_eq!(result.violations.len(), 2);
    }

    #[test]
    fn test_promotion_without_source_is_illegal() {
        // King appears but no man was consumed
        let before = inv(&[(Side::First, MAN, 2), (Side::First, KING, 1)]);
        let after = inv(&[(Side::First, MAN, 2), (Side::First, KING, 2)]);
        let effect = MoveEffect::quiet(Side::First).with_promotion(MAN, KING);
        let result = validate(&before, &after, &effect);
        assert!(!result.ok);
        assert_eq!(result.primary_kind(), Some(ViolationKind::IllegalPromotion));
        assert!(result.has_kind(ViolationKind::CountIncreased));
    }

    #[test]
    fn test_undeclared_promotion_is_detected() {
        let before = inv(&[(Side::First, MAN, 2), (Side::First, KING, 1)]);
        let after = inv(&[(Side::First, MAN, 1), (Side::First, KING, 2)]);
        let result = validate(&before, &after, &MoveEffect::quiet(Side::First));
        assert!(!result.ok);
        assert_eq!(result.primary_kind(), Some(ViolationKind::CountIncreased));
    }

    #[test]
    fn test_missing_capture_is_mismatch() {
        let before = inv(&[(Side::First, MAN, 2), (Side::Second, MAN, 2)]);
        let result = validate(&before, &before.clone(), &MoveEffect::capture(Side::First, 1));
        assert!(!result.ok);
        assert_eq!(result.primary_kind(), Some(ViolationKind::CaptureMismatch));
        assert_eq!(result.violations[0].side, Side::Second);
    }

    #[test]
    fn test_unexplained_loss_is_mismatch() {
        let before = inv(&[(Side::First, MAN, 2), (Side::Second, MAN, 2)]);
        let after = inv(&[(Side::First, MAN, 1), (Side::Second, MAN, 2)]);
        let result = validate(&before, &after, &MoveEffect::quiet(Side::First));
        assert_eq!(result.primary_kind(), Some(ViolationKind::CaptureMismatch));
    }

    #[test]
    fn test_summary_lists_all_violations() {
        let before = inv(&[(Side::First, MAN, 1)]);
        let after = inv(&[(Side::First, MAN, 1), (Side::Second, KING, 1)]);
        let result = validate(&before, &after, &MoveEffect::quiet(Side::First));
        let summary = result.summary();
        assert!(summary.contains("count_increased"));
        assert!(summary.contains("piece_created"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ViolationKind::PieceCreated).unwrap();
        assert_eq!(json, "\"piece_created\"");
    }
}
