//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LUDUS_CONFIG";

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",      // Current directory
    "../config.toml",   // Parent directory (when running from a crate dir)
    "/app/config.toml", // Container image
];

/// Load the central configuration.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the `LUDUS_CONFIG` environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
/// 4. Container path (/app/config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_ENV_VAR, path.display());
            return load_from_path(&path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
///
/// Unreadable or malformed files fall back to the built-in defaults with a
/// warning; environment overrides are applied either way.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u32, f64, bool, enums with FromStr)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(raw) = std::env::var($key) {
            match raw.parse() {
                Ok(v) => $config.$section.$field = v,
                Err(_) => warn!("Ignoring {}={}: not a valid value", $key, raw),
            }
        }
    };
    // Comma-separated list of strings
    ($config:expr, $section:ident . $field:ident, $key:expr, list) => {
        if let Ok(raw) = std::env::var($key) {
            $config.$section.$field = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: `LUDUS_<SECTION>_<KEY>`
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.data_dir, "LUDUS_COMMON_DATA_DIR");
    env_override!(config, common.game, "LUDUS_COMMON_GAME");
    env_override!(config, common.board, "LUDUS_COMMON_BOARD");
    env_override!(config, common.log_level, "LUDUS_COMMON_LOG_LEVEL");

    // MCTS
    env_override!(
        config,
        mcts.num_simulations,
        "LUDUS_MCTS_NUM_SIMULATIONS",
        parse
    );
    env_override!(config, mcts.c_puct, "LUDUS_MCTS_C_PUCT", parse);
    env_override!(
        config,
        mcts.dirichlet_alpha,
        "LUDUS_MCTS_DIRICHLET_ALPHA",
        parse
    );
    env_override!(
        config,
        mcts.dirichlet_epsilon,
        "LUDUS_MCTS_DIRICHLET_EPSILON",
        parse
    );
    env_override!(config, mcts.temperature, "LUDUS_MCTS_TEMPERATURE", parse);
    env_override!(
        config,
        mcts.temp_threshold,
        "LUDUS_MCTS_TEMP_THRESHOLD",
        parse
    );
    env_override!(
        config,
        mcts.eval_batch_size,
        "LUDUS_MCTS_EVAL_BATCH_SIZE",
        parse
    );
    env_override!(config, mcts.virtual_loss, "LUDUS_MCTS_VIRTUAL_LOSS", parse);

    // Validation
    env_override!(
        config,
        validation.enabled,
        "LUDUS_VALIDATION_ENABLED",
        parse
    );
    env_override!(
        config,
        validation.max_retries,
        "LUDUS_VALIDATION_MAX_RETRIES",
        parse
    );
    env_override!(
        config,
        validation.log_violations,
        "LUDUS_VALIDATION_LOG_VIOLATIONS",
        parse
    );

    // League
    env_override!(
        config,
        league.training_agents,
        "LUDUS_LEAGUE_TRAINING_AGENTS",
        list
    );
    env_override!(
        config,
        league.champion_self_play_games,
        "LUDUS_LEAGUE_CHAMPION_SELF_PLAY_GAMES",
        parse
    );
    env_override!(
        config,
        league.paired_games,
        "LUDUS_LEAGUE_PAIRED_GAMES",
        parse
    );
    env_override!(
        config,
        league.challenger_interval,
        "LUDUS_LEAGUE_CHALLENGER_INTERVAL",
        parse
    );
    env_override!(
        config,
        league.challenger_games,
        "LUDUS_LEAGUE_CHALLENGER_GAMES",
        parse
    );
    env_override!(
        config,
        league.challenger_threshold,
        "LUDUS_LEAGUE_CHALLENGER_THRESHOLD",
        parse
    );
    env_override!(
        config,
        league.sync_training_on_promotion,
        "LUDUS_LEAGUE_SYNC_TRAINING_ON_PROMOTION",
        parse
    );
    env_override!(
        config,
        league.draw_weighting,
        "LUDUS_LEAGUE_DRAW_WEIGHTING",
        parse
    );
    env_override!(
        config,
        league.wildcard_interval,
        "LUDUS_LEAGUE_WILDCARD_INTERVAL",
        parse
    );
    env_override!(
        config,
        league.wildcard_games,
        "LUDUS_LEAGUE_WILDCARD_GAMES",
        parse
    );
    env_override!(
        config,
        league.wildcard_trend_window,
        "LUDUS_LEAGUE_WILDCARD_TREND_WINDOW",
        parse
    );
    env_override!(
        config,
        league.generations,
        "LUDUS_LEAGUE_GENERATIONS",
        parse
    );
    env_override!(
        config,
        league.max_moves_per_game,
        "LUDUS_LEAGUE_MAX_MOVES_PER_GAME",
        parse
    );
    env_override!(
        config,
        league.max_concurrent_episodes,
        "LUDUS_LEAGUE_MAX_CONCURRENT_EPISODES",
        parse
    );
    env_override!(
        config,
        league.checkpoint_interval,
        "LUDUS_LEAGUE_CHECKPOINT_INTERVAL",
        parse
    );
    env_override!(config, league.seed, "LUDUS_LEAGUE_SEED", parse);
    env_override!(
        config,
        league.evaluator_retries,
        "LUDUS_LEAGUE_EVALUATOR_RETRIES",
        parse
    );
    env_override!(
        config,
        league.uniform_fallback,
        "LUDUS_LEAGUE_UNIFORM_FALLBACK",
        parse
    );

    // Persistence
    env_override!(
        config,
        persistence.checkpoint_dir,
        "LUDUS_PERSISTENCE_CHECKPOINT_DIR"
    );

    config
}
