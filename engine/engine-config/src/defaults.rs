//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so that every binary and
//! test sees the same values without touching the filesystem.

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::DrawWeighting;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    mcts: MctsDefaults,
    validation: ValidationDefaults,
    league: LeagueDefaults,
    persistence: PersistenceDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    game: String,
    board: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct MctsDefaults {
    num_simulations: u32,
    c_puct: f64,
    dirichlet_alpha: f64,
    dirichlet_epsilon: f64,
    temperature: f64,
    temp_threshold: u32,
    eval_batch_size: usize,
    virtual_loss: f64,
}

#[derive(Debug, Deserialize)]
struct ValidationDefaults {
    enabled: bool,
    max_retries: u32,
    log_violations: bool,
}

#[derive(Debug, Deserialize)]
struct LeagueDefaults {
    training_agents: Vec<String>,
    champion_self_play_games: u32,
    paired_games: u32,
    challenger_interval: u64,
    challenger_games: u32,
    challenger_threshold: f64,
    sync_training_on_promotion: bool,
    draw_weighting: DrawWeighting,
    wildcard_interval: u64,
    wildcard_games: u32,
    wildcard_trend_window: usize,
    generations: u64,
    max_moves_per_game: u32,
    max_concurrent_episodes: usize,
    checkpoint_interval: u64,
    seed: u64,
    evaluator_retries: u32,
    uniform_fallback: bool,
}

#[derive(Debug, Deserialize)]
struct PersistenceDefaults {
    checkpoint_dir: String,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn game() -> &'static str {
    &DEFAULTS.common.game
}
pub fn board() -> &'static str {
    &DEFAULTS.common.board
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// MCTS
pub fn num_simulations() -> u32 {
    DEFAULTS.mcts.num_simulations
}
pub fn c_puct() -> f64 {
    DEFAULTS.mcts.c_puct
}
pub fn dirichlet_alpha() -> f64 {
    DEFAULTS.mcts.dirichlet_alpha
}
pub fn dirichlet_epsilon() -> f64 {
    DEFAULTS.mcts.dirichlet_epsilon
}
pub fn temperature() -> f64 {
    DEFAULTS.mcts.temperature
}
pub fn temp_threshold() -> u32 {
    DEFAULTS.mcts.temp_threshold
}
pub fn eval_batch_size() -> usize {
    DEFAULTS.mcts.eval_batch_size
}
pub fn virtual_loss() -> f64 {
    DEFAULTS.mcts.virtual_loss
}

// Validation
pub fn validation_enabled() -> bool {
    DEFAULTS.validation.enabled
}
pub fn max_retries() -> u32 {
    DEFAULTS.validation.max_retries
}
pub fn log_violations() -> bool {
    DEFAULTS.validation.log_violations
}

// League
pub fn training_agents() -> &'static [String] {
    &DEFAULTS.league.training_agents
}
pub fn champion_self_play_games() -> u32 {
    DEFAULTS.league.champion_self_play_games
}
pub fn paired_games() -> u32 {
    DEFAULTS.league.paired_games
}
pub fn challenger_interval() -> u64 {
    DEFAULTS.league.challenger_interval
}
pub fn challenger_games() -> u32 {
    DEFAULTS.league.challenger_games
}
pub fn challenger_threshold() -> f64 {
    DEFAULTS.league.challenger_threshold
}
pub fn sync_training_on_promotion() -> bool {
    DEFAULTS.league.sync_training_on_promotion
}
pub fn draw_weighting() -> DrawWeighting {
    DEFAULTS.league.draw_weighting
}
pub fn wildcard_interval() -> u64 {
    DEFAULTS.league.wildcard_interval
}
pub fn wildcard_games() -> u32 {
    DEFAULTS.league.wildcard_games
}
pub fn wildcard_trend_window() -> usize {
    DEFAULTS.league.wildcard_trend_window
}
pub fn generations() -> u64 {
    DEFAULTS.league.generations
}
pub fn max_moves_per_game() -> u32 {
    DEFAULTS.league.max_moves_per_game
}
pub fn max_concurrent_episodes() -> usize {
    DEFAULTS.league.max_concurrent_episodes
}
pub fn checkpoint_interval() -> u64 {
    DEFAULTS.league.checkpoint_interval
}
pub fn seed() -> u64 {
    DEFAULTS.league.seed
}
pub fn evaluator_retries() -> u32 {
    DEFAULTS.league.evaluator_retries
}
pub fn uniform_fallback() -> bool {
    DEFAULTS.league.uniform_fallback
}

// Persistence
pub fn checkpoint_dir() -> &'static str {
    &DEFAULTS.persistence.checkpoint_dir
}
