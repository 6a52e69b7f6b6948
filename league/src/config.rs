//! Command-line configuration for the league binary.
//!
//! Defaults come from the central config (config.toml, then `LUDUS_*`
//! environment overrides). CLI flags take highest priority.

use anyhow::{anyhow, Result};
use clap::Parser;
use engine_config::{load_config, CentralConfig};
use games_checkers::Checkers;
use league::LeagueConfig;
use once_cell::sync::Lazy;
use tracing::level_filters::LevelFilter;

// Load central config once at startup
pub static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

// Default value functions that read from central config
fn default_board() -> String {
    CENTRAL_CONFIG.common.board.clone()
}

fn default_generations() -> u64 {
    CENTRAL_CONFIG.league.generations
}

fn default_seed() -> u64 {
    CENTRAL_CONFIG.league.seed
}

fn default_num_simulations() -> u32 {
    CENTRAL_CONFIG.mcts.num_simulations
}

fn default_c_puct() -> f64 {
    CENTRAL_CONFIG.mcts.c_puct
}

fn default_dirichlet_alpha() -> f64 {
    CENTRAL_CONFIG.mcts.dirichlet_alpha
}

fn default_dirichlet_epsilon() -> f64 {
    CENTRAL_CONFIG.mcts.dirichlet_epsilon
}

fn default_max_retries() -> u32 {
    CENTRAL_CONFIG.validation.max_retries
}

fn default_max_moves() -> u32 {
    CENTRAL_CONFIG.league.max_moves_per_game
}

fn default_challenger_interval() -> u64 {
    CENTRAL_CONFIG.league.challenger_interval
}

fn default_challenger_threshold() -> f64 {
    CENTRAL_CONFIG.league.challenger_threshold
}

fn default_wildcard_interval() -> u64 {
    CENTRAL_CONFIG.league.wildcard_interval
}

fn default_concurrency() -> usize {
    CENTRAL_CONFIG.league.max_concurrent_episodes
}

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_data_dir() -> String {
    CENTRAL_CONFIG.common.data_dir.clone()
}

fn default_checkpoint_dir() -> String {
    CENTRAL_CONFIG.persistence.checkpoint_dir.clone()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "league")]
#[command(about = "Ludus league - generational self-play training")]
#[command(
    long_about = "Runs a league of checkers agents: self-play and paired games each
generation, periodic challenger checks against the Champion, wildcard audits
and JSON checkpoints.

Configuration is loaded from config.toml with environment variable overrides.
CLI arguments take highest priority."
)]
pub struct Config {
    /// Board preset (mini or standard)
    #[arg(long, default_value_t = default_board())]
    pub board: String,

    /// Generations to run
    #[arg(long, default_value_t = default_generations())]
    pub generations: u64,

    /// League seed; every episode seed is derived from it
    #[arg(long, default_value_t = default_seed())]
    pub seed: u64,

    /// Resume from the checkpoint of this generation
    #[arg(long, conflicts_with = "resume_latest")]
    pub resume: Option<u64>,

    /// Resume from the newest checkpoint, if there is one
    #[arg(long)]
    pub resume_latest: bool,

    /// Number of MCTS simulations per move
    #[arg(long, default_value_t = default_num_simulations())]
    pub num_simulations: u32,

    /// PUCT exploration constant
    #[arg(long, default_value_t = default_c_puct())]
    pub c_puct: f64,

    /// Dirichlet noise concentration (0 disables root noise)
    #[arg(long, default_value_t = default_dirichlet_alpha())]
    pub dirichlet_alpha: f64,

    /// Fraction of root priors replaced by noise
    #[arg(long, default_value_t = default_dirichlet_epsilon())]
    pub dirichlet_epsilon: f64,

    /// Skip move validation
    #[arg(long)]
    pub no_validation: bool,

    /// Extra candidates tried after a move fails validation
    #[arg(long, default_value_t = default_max_retries())]
    pub max_retries: u32,

    /// Ply cap per game; reaching it is a draw
    #[arg(long, default_value_t = default_max_moves())]
    pub max_moves: u32,

    /// Run the challenger check every N generations (0 to disable)
    #[arg(long, default_value_t = default_challenger_interval())]
    pub challenger_interval: u64,

    /// Win rate a challenger must exceed to be promoted
    #[arg(long, default_value_t = default_challenger_threshold())]
    pub challenger_threshold: f64,

    /// Run the wildcard audit every N generations (0 to disable)
    #[arg(long, default_value_t = default_wildcard_interval())]
    pub wildcard_interval: u64,

    /// Episodes played at the same time
    #[arg(long, default_value_t = default_concurrency())]
    pub concurrency: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Data directory
    #[arg(long, default_value_t = default_data_dir())]
    pub data_dir: String,

    /// Checkpoint directory
    #[arg(long, default_value_t = default_checkpoint_dir())]
    pub checkpoint_dir: String,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.rules()?;

        if self.generations == 0 {
            return Err(anyhow!("generations must be greater than 0"));
        }

        if self.num_simulations == 0 {
            return Err(anyhow!("num_simulations must be greater than 0"));
        }

        if self.concurrency == 0 {
            return Err(anyhow!("concurrency must be greater than 0"));
        }

        if self.max_moves == 0 {
            return Err(anyhow!("max_moves must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.challenger_threshold) {
            return Err(anyhow!(
                "challenger_threshold must be in [0, 1], got {}",
                self.challenger_threshold
            ));
        }

        if self.checkpoint_dir.is_empty() {
            return Err(anyhow!("checkpoint_dir cannot be empty"));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        Ok(())
    }

    /// Game rules for the selected board.
    pub fn rules(&self) -> Result<Checkers> {
        match self.board.as_str() {
            "mini" => Ok(Checkers::mini()),
            "standard" => Ok(Checkers::standard()),
            other => Err(anyhow!(
                "unknown board '{other}', expected 'mini' or 'standard'"
            )),
        }
    }

    /// Scheduler settings: central config with CLI overrides applied.
    pub fn league_config(&self, central: &CentralConfig) -> LeagueConfig {
        let mut config = LeagueConfig::from_central(central);
        config.seed = self.seed;
        config.challenger_interval = self.challenger_interval;
        config.challenger_threshold = self.challenger_threshold;
        config.wildcard_interval = self.wildcard_interval;
        config.max_concurrent_episodes = self.concurrency;
        config.episode.max_moves = self.max_moves;

        let search = &mut config.episode.search;
        search.num_simulations = self.num_simulations;
        search.c_puct = self.c_puct as f32;
        search.dirichlet_alpha = self.dirichlet_alpha as f32;
        search.dirichlet_epsilon = self.dirichlet_epsilon as f32;
        search.max_retries = self.max_retries;
        if self.no_validation {
            search.validate_moves = false;
        }
        config
    }
}
