//! Scheduler configuration.
//!
//! [`LeagueConfig`] is the one structured object the scheduler is built
//! from. It is usually derived from the central config and then adjusted by
//! CLI flags.

use engine_config::{CentralConfig, DrawWeighting};
use mcts::MctsConfig;

use crate::episode::EpisodeConfig;
use crate::error::LeagueError;

#[derive(Debug, Clone)]
pub struct LeagueConfig {
    /// Names of the initial training agents
    pub training_agents: Vec<String>,
    pub champion_self_play_games: u32,
    /// Games per ordered pair of training agents
    pub paired_games: u32,
    /// 0 disables the challenger check
    pub challenger_interval: u64,
    pub challenger_games: u32,
    pub challenger_threshold: f64,
    /// Point every training agent at the new Champion's weights after a
    /// promotion
    pub sync_training_on_promotion: bool,
    pub draw_weighting: DrawWeighting,
    /// 0 disables the wildcard audit
    pub wildcard_interval: u64,
    pub wildcard_games: u32,
    pub wildcard_trend_window: usize,
    /// 0 only checkpoints on the last generation and on cancellation
    pub checkpoint_interval: u64,
    pub max_concurrent_episodes: usize,
    pub seed: u64,
    /// Write each violation record as a tracing event
    pub log_violations: bool,
    pub episode: EpisodeConfig,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self::from_central(&CentralConfig::default())
    }
}

impl LeagueConfig {
    pub fn from_central(config: &CentralConfig) -> Self {
        let m = &config.mcts;
        let search = MctsConfig {
            num_simulations: m.num_simulations,
            c_puct: m.c_puct as f32,
            dirichlet_alpha: m.dirichlet_alpha as f32,
            dirichlet_epsilon: m.dirichlet_epsilon as f32,
            temperature: m.temperature as f32,
            virtual_loss: m.virtual_loss as f32,
            eval_batch_size: m.eval_batch_size,
            validate_moves: config.validation.enabled,
            max_retries: config.validation.max_retries,
        };

        let l = &config.league;
        Self {
            training_agents: l.training_agents.clone(),
            champion_self_play_games: l.champion_self_play_games,
            paired_games: l.paired_games,
            challenger_interval: l.challenger_interval,
            challenger_games: l.challenger_games,
            challenger_threshold: l.challenger_threshold,
            sync_training_on_promotion: l.sync_training_on_promotion,
            draw_weighting: l.draw_weighting,
            wildcard_interval: l.wildcard_interval,
            wildcard_games: l.wildcard_games,
            wildcard_trend_window: l.wildcard_trend_window,
            checkpoint_interval: l.checkpoint_interval,
            max_concurrent_episodes: l.max_concurrent_episodes,
            seed: l.seed,
            log_violations: config.validation.log_violations,
            episode: EpisodeConfig {
                search,
                temp_threshold: m.temp_threshold,
                max_moves: l.max_moves_per_game,
                evaluator_retries: l.evaluator_retries,
                uniform_fallback: l.uniform_fallback,
            },
        }
    }

    pub fn validate(&self) -> Result<(), LeagueError> {
        let invalid =
            |msg: String| -> Result<(), LeagueError> { Err(LeagueError::InvalidSettings(msg)) };

        if self.training_agents.is_empty() {
            return invalid("at least one training agent is required".into());
        }
        if !(0.0..=1.0).contains(&self.challenger_threshold) {
            return invalid(format!(
                "challenger_threshold must be in [0, 1], got {}",
                self.challenger_threshold
            ));
        }
        if self.challenger_interval > 0 && self.challenger_games == 0 {
            return invalid("challenger_games must be > 0 when the check is enabled".into());
        }
        if self.wildcard_interval > 0 && self.wildcard_games == 0 {
            return invalid("wildcard_games must be > 0 when the audit is enabled".into());
        }
        if self.wildcard_trend_window < 2 {
            return invalid(format!(
                "wildcard_trend_window must be at least 2, got {}",
                self.wildcard_trend_window
            ));
        }
        if self.max_concurrent_episodes == 0 {
            return invalid("max_concurrent_episodes must be at least 1".into());
        }
        if self.episode.max_moves == 0 {
            return invalid("max_moves_per_game must be at least 1".into());
        }
        self.episode
            .search
            .validate()
            .map_err(|e| LeagueError::InvalidSettings(e.to_string()))
    }

    pub fn challenger_due(&self, generation: u64) -> bool {
        is_due(self.challenger_interval, generation)
    }

    pub fn wildcard_due(&self, generation: u64) -> bool {
        is_due(self.wildcard_interval, generation)
    }

    pub fn checkpoint_due(&self, generation: u64) -> bool {
        is_due(self.checkpoint_interval, generation)
    }
}

/// Periodic checks run after every `interval`-th generation, counting from
/// one. An interval of 0 never fires.
pub fn is_due(interval: u64, generation: u64) -> bool {
    interval > 0 && (generation + 1) % interval == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_central_defaults() {
        let config = LeagueConfig::default();
        assert_eq!(config.training_agents, vec!["Alpha", "Beta"]);
        assert_eq!(config.challenger_games, 20);
        assert!((config.challenger_threshold - 0.55).abs() < 1e-9);
        assert!(config.sync_training_on_promotion);
        assert_eq!(config.draw_weighting, DrawWeighting::Half);
        assert_eq!(config.episode.search.num_simulations, 200);
        assert_eq!(config.episode.search.max_retries, 3);
        assert!(config.episode.search.validate_moves);
        assert_eq!(config.episode.max_moves, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_flag_flows_into_search() {
        let mut central = CentralConfig::default();
        central.validation.enabled = false;
        central.validation.max_retries = 7;
        let config = LeagueConfig::from_central(&central);
        assert!(!config.episode.search.validate_moves);
        assert_eq!(config.episode.search.max_retries, 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            LeagueConfig {
                training_agents: vec![],
                ..LeagueConfig::default()
            },
            LeagueConfig {
                challenger_threshold: 1.5,
                ..LeagueConfig::default()
            },
            LeagueConfig {
                challenger_games: 0,
                ..LeagueConfig::default()
            },
            LeagueConfig {
                max_concurrent_episodes: 0,
                ..LeagueConfig::default()
            },
            LeagueConfig {
                wildcard_trend_window: 1,
                ..LeagueConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(LeagueError::InvalidSettings(_))
            ));
        }

        let mut config = LeagueConfig::default();
        config.episode.search.c_puct = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_challenger_needs_no_games() {
        let config = LeagueConfig {
            challenger_interval: 0,
            challenger_games: 0,
            ..LeagueConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(!config.challenger_due(4));
    }

    #[test]
    fn test_is_due() {
        assert!(!is_due(0, 0));
        assert!(is_due(1, 0));
        assert!(!is_due(5, 3));
        assert!(is_due(5, 4));
        assert!(is_due(5, 9));
        assert!(!is_due(5, 10));
    }
}
