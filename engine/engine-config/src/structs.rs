//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// ============================================================================

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_game() -> String {
    defaults::game().into()
}
fn d_board() -> String {
    defaults::board().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_num_sims() -> u32 {
    defaults::num_simulations()
}
fn d_c_puct() -> f64 {
    defaults::c_puct()
}
fn d_dirichlet_alpha() -> f64 {
    defaults::dirichlet_alpha()
}
fn d_dirichlet_epsilon() -> f64 {
    defaults::dirichlet_epsilon()
}
fn d_temperature() -> f64 {
    defaults::temperature()
}
fn d_temp_threshold() -> u32 {
    defaults::temp_threshold()
}
fn d_eval_batch_size() -> usize {
    defaults::eval_batch_size()
}
fn d_virtual_loss() -> f64 {
    defaults::virtual_loss()
}
fn d_validation_enabled() -> bool {
    defaults::validation_enabled()
}
fn d_max_retries() -> u32 {
    defaults::max_retries()
}
fn d_log_violations() -> bool {
    defaults::log_violations()
}
fn d_training_agents() -> Vec<String> {
    defaults::training_agents().to_vec()
}
fn d_champion_games() -> u32 {
    defaults::champion_self_play_games()
}
fn d_paired_games() -> u32 {
    defaults::paired_games()
}
fn d_challenger_interval() -> u64 {
    defaults::challenger_interval()
}
fn d_challenger_games() -> u32 {
    defaults::challenger_games()
}
fn d_challenger_threshold() -> f64 {
    defaults::challenger_threshold()
}
fn d_draw_weighting() -> DrawWeighting {
    defaults::draw_weighting()
}
fn d_wildcard_interval() -> u64 {
    defaults::wildcard_interval()
}
fn d_wildcard_games() -> u32 {
    defaults::wildcard_games()
}
fn d_wildcard_window() -> usize {
    defaults::wildcard_trend_window()
}
fn d_generations() -> u64 {
    defaults::generations()
}
fn d_max_moves() -> u32 {
    defaults::max_moves_per_game()
}
fn d_max_concurrent() -> usize {
    defaults::max_concurrent_episodes()
}
fn d_ckpt_interval() -> u64 {
    defaults::checkpoint_interval()
}
fn d_seed() -> u64 {
    defaults::seed()
}
fn d_evaluator_retries() -> u32 {
    defaults::evaluator_retries()
}
fn d_sync_training_on_promotion() -> bool {
    defaults::sync_training_on_promotion()
}
fn d_uniform_fallback() -> bool {
    defaults::uniform_fallback()
}
fn d_checkpoint_dir() -> String {
    defaults::checkpoint_dir().into()
}

// ============================================================================
// Enums
// ============================================================================

/// How drawn games count toward a challenger's win rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawWeighting {
    /// A draw is worth half a win
    #[default]
    Half,
    /// Draws do not count
    Zero,
}

impl DrawWeighting {
    /// Fraction of a win credited for one draw.
    pub fn weight(self) -> f64 {
        match self {
            DrawWeighting::Half => 0.5,
            DrawWeighting::Zero => 0.0,
        }
    }
}

impl FromStr for DrawWeighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "half" => Ok(DrawWeighting::Half),
            "zero" => Ok(DrawWeighting::Zero),
            other => Err(format!(
                "unknown draw weighting '{other}', expected 'half' or 'zero'"
            )),
        }
    }
}

impl fmt::Display for DrawWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawWeighting::Half => write!(f, "half"),
            DrawWeighting::Zero => write!(f, "zero"),
        }
    }
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub mcts: MctsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub league: LeagueConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_game")]
    pub game: String,
    #[serde(default = "d_board")]
    pub board: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            game: defaults::game().into(),
            board: defaults::board().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// MCTS (Monte Carlo Tree Search) configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MctsConfig {
    #[serde(default = "d_num_sims")]
    pub num_simulations: u32,
    #[serde(default = "d_c_puct")]
    pub c_puct: f64,
    #[serde(default = "d_dirichlet_alpha")]
    pub dirichlet_alpha: f64,
    #[serde(default = "d_dirichlet_epsilon")]
    pub dirichlet_epsilon: f64,
    #[serde(default = "d_temperature")]
    pub temperature: f64,
    #[serde(default = "d_temp_threshold")]
    pub temp_threshold: u32,
    #[serde(default = "d_eval_batch_size")]
    pub eval_batch_size: usize,
    #[serde(default = "d_virtual_loss")]
    pub virtual_loss: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: defaults::num_simulations(),
            c_puct: defaults::c_puct(),
            dirichlet_alpha: defaults::dirichlet_alpha(),
            dirichlet_epsilon: defaults::dirichlet_epsilon(),
            temperature: defaults::temperature(),
            temp_threshold: defaults::temp_threshold(),
            eval_batch_size: defaults::eval_batch_size(),
            virtual_loss: defaults::virtual_loss(),
        }
    }
}

/// Move validation configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValidationConfig {
    #[serde(default = "d_validation_enabled")]
    pub enabled: bool,
    /// Retries after the first rejected candidate
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    #[serde(default = "d_log_violations")]
    pub log_violations: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::validation_enabled(),
            max_retries: defaults::max_retries(),
            log_violations: defaults::log_violations(),
        }
    }
}

/// League scheduling configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LeagueConfig {
    #[serde(default = "d_training_agents")]
    pub training_agents: Vec<String>,
    #[serde(default = "d_champion_games")]
    pub champion_self_play_games: u32,
    /// Games per ordered pair of training agents
    #[serde(default = "d_paired_games")]
    pub paired_games: u32,
    #[serde(default = "d_challenger_interval")]
    pub challenger_interval: u64,
    #[serde(default = "d_challenger_games")]
    pub challenger_games: u32,
    #[serde(default = "d_challenger_threshold")]
    pub challenger_threshold: f64,
    #[serde(default = "d_sync_training_on_promotion")]
    pub sync_training_on_promotion: bool,
    #[serde(default = "d_draw_weighting")]
    pub draw_weighting: DrawWeighting,
    #[serde(default = "d_wildcard_interval")]
    pub wildcard_interval: u64,
    #[serde(default = "d_wildcard_games")]
    pub wildcard_games: u32,
    #[serde(default = "d_wildcard_window")]
    pub wildcard_trend_window: usize,
    #[serde(default = "d_generations")]
    pub generations: u64,
    #[serde(default = "d_max_moves")]
    pub max_moves_per_game: u32,
    #[serde(default = "d_max_concurrent")]
    pub max_concurrent_episodes: usize,
    #[serde(default = "d_ckpt_interval")]
    pub checkpoint_interval: u64,
    #[serde(default = "d_seed")]
    pub seed: u64,
    #[serde(default = "d_evaluator_retries")]
    pub evaluator_retries: u32,
    #[serde(default = "d_uniform_fallback")]
    pub uniform_fallback: bool,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            training_agents: defaults::training_agents().to_vec(),
            champion_self_play_games: defaults::champion_self_play_games(),
            paired_games: defaults::paired_games(),
            challenger_interval: defaults::challenger_interval(),
            challenger_games: defaults::challenger_games(),
            challenger_threshold: defaults::challenger_threshold(),
            sync_training_on_promotion: defaults::sync_training_on_promotion(),
            draw_weighting: defaults::draw_weighting(),
            wildcard_interval: defaults::wildcard_interval(),
            wildcard_games: defaults::wildcard_games(),
            wildcard_trend_window: defaults::wildcard_trend_window(),
            generations: defaults::generations(),
            max_moves_per_game: defaults::max_moves_per_game(),
            max_concurrent_episodes: defaults::max_concurrent_episodes(),
            checkpoint_interval: defaults::checkpoint_interval(),
            seed: defaults::seed(),
            evaluator_retries: defaults::evaluator_retries(),
            uniform_fallback: defaults::uniform_fallback(),
        }
    }
}

/// Checkpoint persistence configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PersistenceConfig {
    #[serde(default = "d_checkpoint_dir")]
    pub checkpoint_dir: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: defaults::checkpoint_dir().into(),
        }
    }
}
