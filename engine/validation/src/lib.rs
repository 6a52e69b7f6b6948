//! Move legality enforcement for the Ludus engine
//!
//! Every candidate move is checked by comparing the piece inventories of
//! the states before and after it. A transition that creates pieces, raises
//! counts without a declared promotion, or removes pieces other than the
//! declared captures is rejected; the candidate state is discarded by the
//! caller and never committed.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{MoveEffect, PieceInventory, PieceKind, Side};
//! use validation::{validate, ViolationKind};
//!
//! const MAN: PieceKind = PieceKind("man");
//! const KING: PieceKind = PieceKind("king");
//!
//! let mut before = PieceInventory::new();
//! before.add(Side::First, MAN, 2);
//!
//! let mut after = before.clone();
//! after.add(Side::First, KING, 1);
//!
//! let result = validate(&before, &after, &MoveEffect::quiet(Side::First));
//! assert!(!result.ok);
//! assert_eq!(result.primary_kind(), Some(ViolationKind::PieceCreated));
//! ```

pub mod record;
pub mod validator;

pub use record::{
    Severity, TracingViolationLog, ViolationContext, ViolationFanout, ViolationLog,
    ViolationRecord, ViolationStats, ViolationSummary, RECENT_VIOLATIONS,
};
pub use validator::{validate, ValidationResult, Violation, ViolationKind};
