//! MCTS configuration parameters.

use crate::search::SearchError;

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Number of simulations to run per search.
    pub num_simulations: u32,

    /// Exploration constant for the PUCT formula.
    /// Higher values encourage exploration, lower values favor exploitation.
    pub c_puct: f32,

    /// Dirichlet noise alpha for root exploration.
    /// Set to 0.0 to disable noise (for evaluation).
    pub dirichlet_alpha: f32,

    /// Fraction of each root prior that comes from Dirichlet noise.
    pub dirichlet_epsilon: f32,

    /// Temperature for move selection after search.
    /// 1.0 = sample proportional to visit counts
    /// 0.0 = always pick the most visited child
    pub temperature: f32,

    /// Penalty added along a path while its leaf awaits batched evaluation.
    pub virtual_loss: f32,

    /// Leaves collected per evaluator call. 1 disables batching.
    pub eval_batch_size: usize,

    /// Check the chosen move's transition with the validator.
    pub validate_moves: bool,

    /// Extra candidates tried after the first is rejected.
    pub max_retries: u32,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: 200,
            c_puct: 1.25,
            dirichlet_alpha: 0.3,
            dirichlet_epsilon: 0.25,
            temperature: 1.0,
            virtual_loss: 1.0,
            eval_batch_size: 1,
            validate_moves: true,
            max_retries: 3,
        }
    }
}

impl MctsConfig {
    /// Create config for training (with exploration noise).
    pub fn for_training() -> Self {
        Self::default()
    }

    /// Create config for evaluation games (no noise, greedy selection).
    pub fn for_evaluation() -> Self {
        Self {
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.0,
            temperature: 0.0,
            ..Self::default()
        }
    }

    /// Create a fast deterministic config for testing.
    pub fn for_testing() -> Self {
        Self {
            num_simulations: 50,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.0,
            temperature: 0.0,
            ..Self::default()
        }
    }

    /// Builder pattern: set number of simulations.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Builder pattern: set c_puct exploration constant.
    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.c_puct = c;
        self
    }

    /// Builder pattern: set temperature.
    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    /// Builder pattern: set root noise. Alpha 0 disables it.
    pub fn with_dirichlet(mut self, alpha: f32, epsilon: f32) -> Self {
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }

    /// Builder pattern: set evaluation batch size.
    pub fn with_eval_batch_size(mut self, size: usize) -> Self {
        self.eval_batch_size = size;
        self
    }

    /// Builder pattern: set virtual loss per pending path.
    pub fn with_virtual_loss(mut self, loss: f32) -> Self {
        self.virtual_loss = loss;
        self
    }

    /// Builder pattern: enable or disable move validation.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_moves = enabled;
        self
    }

    /// Builder pattern: set validation retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Whether root noise is mixed in.
    pub fn uses_noise(&self) -> bool {
        self.dirichlet_alpha > 0.0 && self.dirichlet_epsilon > 0.0
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |msg: String| -> Result<(), SearchError> {
            Err(SearchError::InvalidConfig(msg))
        };

        if !(self.c_puct.is_finite() && self.c_puct >= 0.0) {
            return invalid(format!("c_puct must be >= 0, got {}", self.c_puct));
        }
        if !(self.dirichlet_alpha.is_finite() && self.dirichlet_alpha >= 0.0) {
            return invalid(format!(
                "dirichlet_alpha must be >= 0, got {}",
                self.dirichlet_alpha
            ));
        }
        if !(0.0..=1.0).contains(&self.dirichlet_epsilon) {
            return invalid(format!(
                "dirichlet_epsilon must be in [0, 1], got {}",
                self.dirichlet_epsilon
            ));
        }
        if !(self.temperature.is_finite() && self.temperature >= 0.0) {
            return invalid(format!(
                "temperature must be >= 0, got {}",
                self.temperature
            ));
        }
        if self.eval_batch_size == 0 {
            return invalid("eval_batch_size must be at least 1".into());
        }
        if !(self.virtual_loss.is_finite() && self.virtual_loss >= 0.0) {
            return invalid(format!(
                "virtual_loss must be >= 0, got {}",
                self.virtual_loss
            ));
        }
        Ok(())
    }
}
