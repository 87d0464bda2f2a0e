use burn::{module::AutodiffModule, prelude::*, tensor::backend::AutodiffBackend};

/// A burn module used as BEAR's stochastic policy
///
/// The policy is a Gaussian over pre-squash actions followed by a tanh squash.
///
/// ### Generics
/// - `B` - A burn autodiff backend
pub trait BearPolicyModel<B: AutodiffBackend>: AutodiffModule<B> {
    /// Sample one action per observation with the reparameterisation trick
    ///
    /// Returns: (action, log_prob, mean_action)
    /// - action: [batch_size, action_dim] - squashed
    /// - log_prob: [batch_size, 1] - log probability of the squashed action
    /// - mean_action: [batch_size, action_dim] - squashed mean (deterministic action)
    fn sample_action(&self, observation: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>);

    /// Sample `num_samples` raw actions per observation, *before* the squash
    ///
    /// Returns: [batch_size, num_samples, action_dim]
    fn sample_multiple_without_squash(&self, observation: Tensor<B, 2>, num_samples: usize) -> Tensor<B, 3>;
}

/// A burn module used as one of BEAR's Q-value critics
pub trait BearCriticModel<B: AutodiffBackend>: AutodiffModule<B> {
    /// Args:
    ///   - observation: [batch_size, obs_dim]
    ///   - action: [batch_size, action_dim]
    /// Returns: Q-value [batch_size, 1]
    fn forward(&self, observation: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Polyak-average towards `online` and return the new target
    ///
    /// θ′ ← τθ + (1 − τ)θ′
    ///
    /// ```ignore
    /// target_critic = target_critic.soft_update(&critic, tau);
    /// ```
    fn soft_update(self, online: &Self, tau: f32) -> Self;
}

/// What a behavior model produces for a batch of (observation, action) pairs
#[derive(Debug, Clone)]
pub struct BehaviorOutput<B: Backend> {
    /// [batch_size, action_dim]
    pub reconstruction: Tensor<B, 2>,
    /// Latent mean [batch_size, latent_dim]
    pub mean: Tensor<B, 2>,
    /// Latent standard deviation [batch_size, latent_dim]
    pub std: Tensor<B, 2>,
}

/// A conditional generative model of the dataset's actions
///
/// BEAR trains it on its own objective and uses it as a sampler of in-distribution
/// actions for the support constraint.
pub trait BehaviorModel<B: AutodiffBackend>: AutodiffModule<B> {
    fn forward(&self, observation: Tensor<B, 2>, action: Tensor<B, 2>) -> BehaviorOutput<B>;

    /// The model's training objective (scalar)
    fn loss(&self, output: BehaviorOutput<B>, action: Tensor<B, 2>) -> Tensor<B, 1>;

    /// Decode `num_samples` candidate actions per observation, without the output squash
    ///
    /// Returns: [batch_size, num_samples, action_dim]
    fn decode_multiple_without_squash(&self, observation: Tensor<B, 2>, num_samples: usize) -> Tensor<B, 3>;
}
