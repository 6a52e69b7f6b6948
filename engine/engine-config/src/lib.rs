//! Centralized configuration loading from config.toml.
//!
//! This crate provides configuration structs and loading logic shared
//! across all Ludus components (search, validation, league binary).
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`LUDUS_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (config.defaults.toml, embedded at compile time)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! LUDUS_<SECTION>_<KEY>=value
//!
//! Examples:
//!     LUDUS_COMMON_BOARD=standard
//!     LUDUS_MCTS_NUM_SIMULATIONS=400
//!     LUDUS_VALIDATION_MAX_RETRIES=5
//!     LUDUS_LEAGUE_DRAW_WEIGHTING=zero
//!     LUDUS_LEAGUE_TRAINING_AGENTS=Alpha,Beta,Gamma
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, load_config, load_from_path, CONFIG_ENV_VAR, CONFIG_SEARCH_PATHS,
};
pub use structs::*;
