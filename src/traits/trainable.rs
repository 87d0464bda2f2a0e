//! Offline agent trait for step-by-step training control
//!
//! Offline agents never collect experience themselves: each call to
//! [`OfflineAgent::train_step`] consumes one minibatch from a fixed dataset.
//! This trait gives orchestration code (evaluation, logging, checkpoint cadence)
//! a uniform handle on any such agent.

use crate::dataset::TransitionBatch;

/// Losses returned after each training update
///
/// Every field is a plain `f32` read back from the device after the update, so the
/// metrics can be logged or checked for NaN/Inf without touching the autodiff graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingMetrics {
    /// MSE of the first critic against the bootstrapped target
    pub critic1_loss: f32,

    /// MSE of the second critic against the same target
    pub critic2_loss: f32,

    /// Entropy-regularised actor-critic term `mean(α·log π - min Q)`
    ///
    /// Reported even during warm-up, when it does not reach the gradient.
    pub policy_loss: f32,

    /// Temperature loss (zero when the temperature is fixed)
    pub temperature_loss: f32,

    /// Lagrangian loss of the support-constraint multiplier
    pub alpha_prime_loss: f32,

    /// Loss of the behavior model (reconstruction + KL)
    pub behavior_loss: f32,

    /// Mean MMD between behavior samples and policy samples
    pub support_distance: f32,

    /// Current value of `exp(log_alpha_prime)`
    pub alpha_prime: f32,

    /// Current entropy temperature
    pub temperature: f32,
}

impl TrainingMetrics {
    /// The five scalars emitted to metric sinks, in their canonical names
    pub fn scalars(&self) -> [(&'static str, f32); 5] {
        [
            ("q_loss_1", self.critic1_loss),
            ("q_loss_2", self.critic2_loss),
            ("policy_loss", self.policy_loss),
            ("alpha_loss", self.temperature_loss),
            ("alpha_prime_loss", self.alpha_prime_loss),
        ]
    }

    /// True when none of the reported values is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.scalars().iter().all(|(_, v)| v.is_finite())
            && self.behavior_loss.is_finite()
            && self.support_distance.is_finite()
    }
}

/// An agent trained from a fixed dataset
///
/// # Example
///
/// ```ignore
/// while agent.train_steps() < max_steps {
///     let metrics = agent.train_step(dataset.sample());
///     if agent.train_steps() % 1000 == 0 {
///         println!("policy loss: {}", metrics.policy_loss);
///     }
/// }
/// let action = agent.select_action(&observation);
/// ```
pub trait OfflineAgent {
    /// Run one full update on a minibatch and advance the step counter
    fn train_step(&mut self, batch: TransitionBatch) -> TrainingMetrics;

    /// Greedy action for a single observation
    fn select_action(&self, observation: &[f32]) -> Vec<f32>;

    /// Number of completed training steps
    fn train_steps(&self) -> usize;
}
