use crate::{ScoreWeights, SolverError};
use craftplan_core::ActionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SolverAlgorithm {
    Oneshot,
    OneshotForked,
    Stepwise,
    StepwiseForked,
    StepwiseGenetic,
    Optimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub algorithm: SolverAlgorithm,
    pub seed: u64,
    pub iterations: u32,
    pub max_iterations: u32,
    pub max_step_count: u32,
    pub exploration_constant: f64,
    pub max_score_weighting_constant: f64,
    pub fork_count: u32,
    pub furcated_action_count: u32,
    pub max_thread_count: u32,
    pub max_rollout_steps: u32,
    pub reliability_trials: u32,
    pub strict_actions: bool,
    pub backload_progress: bool,
    pub adversarial: bool,
    pub action_pool: Vec<ActionId>,
    pub weights: ScoreWeights,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            algorithm: SolverAlgorithm::Oneshot,
            seed: 0xC0FFEE,
            iterations: 2_000,
            max_iterations: 8_000,
            max_step_count: 30,
            exploration_constant: 1.5,
            max_score_weighting_constant: 0.1,
            fork_count: 4,
            furcated_action_count: 4,
            max_thread_count: 4,
            max_rollout_steps: 20,
            reliability_trials: 200,
            strict_actions: false,
            backload_progress: false,
            adversarial: false,
            action_pool: ActionId::ALL.to_vec(),
            weights: ScoreWeights::default(),
        }
    }
}

impl SolverConfig {
    /// Rejects configuration violations before any search runs.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.max_iterations < self.iterations {
            return Err(SolverError::Config(format!(
                "max_iterations {} is below iterations {}",
                self.max_iterations, self.iterations
            )));
        }
        if self.max_step_count == 0 {
            return Err(SolverError::Config("max_step_count must be >= 1".into()));
        }
        if !(0.0..=10.0).contains(&self.exploration_constant) {
            return Err(SolverError::Config(format!(
                "exploration_constant must be in [0, 10], got {}",
                self.exploration_constant
            )));
        }
        if !(0.0..=1.0).contains(&self.max_score_weighting_constant) {
            return Err(SolverError::Config(format!(
                "max_score_weighting_constant must be in [0, 1], got {}",
                self.max_score_weighting_constant
            )));
        }
        if self.fork_count == 0 {
            return Err(SolverError::Config("fork_count must be >= 1".into()));
        }
        if self.furcated_action_count == 0 {
            return Err(SolverError::Config(
                "furcated_action_count must be >= 1".into(),
            ));
        }
        if self.max_thread_count == 0 {
            return Err(SolverError::Config("max_thread_count must be >= 1".into()));
        }
        if self.max_rollout_steps == 0 {
            return Err(SolverError::Config("max_rollout_steps must be >= 1".into()));
        }
        if self.action_pool.is_empty() {
            return Err(SolverError::Config("action_pool must not be empty".into()));
        }
        self.weights.validate()
    }

    /// Equal share of the iteration budget for one fork; the remainder goes
    /// to the first fork.
    pub fn iteration_share(&self, total: u32, fork: u32) -> u32 {
        let share = total / self.fork_count;
        if fork == 0 {
            share + total % self.fork_count
        } else {
            share
        }
    }
}
