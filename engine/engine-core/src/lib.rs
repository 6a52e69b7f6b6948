//! Core traits and types for the Ludus game engine
//!
//! This crate provides the fundamental abstractions shared by search and the league:
//! - `GameRules`: Typed rules trait (legal moves, apply, terminal status)
//! - `PieceInventory`: Per-side piece counts used for move validation
//! - `MoveEffect`: What a move declares it does (captures, promotion)
//! - `CancelToken`: Cooperative cancellation flag

pub mod cancel;
pub mod inventory;
pub mod rules;

// Re-export main types for convenience
pub use cancel::CancelToken;
pub use inventory::{PieceInventory, PieceKind, Side};
pub use rules::{GameRules, GameStatus, MoveEffect, Promotion};
