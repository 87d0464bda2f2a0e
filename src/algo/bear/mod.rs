//! Bootstrapping Error Accumulation Reduction (Kumar et al., 2019)
//!
//! Each training step runs, in order: behavior model, critic 1, critic 2,
//! `alpha_prime`, policy, temperature, then the soft target sync.

mod agent;
mod config;
mod learn;
pub mod mmd;
mod model;
mod multiplier;
mod target;

pub use agent::{compose_policy_loss, BearAgent};
pub use config::{BearAgentConfig, BearOptimizer};
pub use mmd::{mmd_distance, KernelType};
pub use model::{BearCriticModel, BearPolicyModel, BehaviorModel, BehaviorOutput};
pub use multiplier::{
    LogMultiplier, SupportDistance, SupportMultiplier, Temperature, LOG_ALPHA_PRIME_MAX,
    LOG_ALPHA_PRIME_MIN,
};
pub use target::{
    bootstrap_target, max_over_target_samples, repeat_interleave_rows, soft_clipped_double_q,
    TargetCritics,
};
