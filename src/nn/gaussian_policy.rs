use burn::{
    module::Module,
    prelude::*,
    tensor::{backend::AutodiffBackend, Distribution},
};

use super::mlp::{MLPConfig, MLP};
use crate::algo::bear::BearPolicyModel;

const LOG_STD_MIN: f32 = -20.0;
const LOG_STD_MAX: f32 = 2.0;

/// Configuration for [`SquashedGaussianPolicy`]
#[derive(Config, Debug)]
pub struct SquashedGaussianPolicyConfig {
    pub obs_dim: usize,
    pub action_dim: usize,
    pub hidden_layers: Vec<usize>,
    /// Actions are squashed into `[-max_action, max_action]`
    #[config(default = 1.0)]
    pub max_action: f32,
}

/// Gaussian policy with a tanh squash
///
/// Architecture: observation → MLP → (mean, log_std), each of size `action_dim`
#[derive(Module, Debug)]
pub struct SquashedGaussianPolicy<B: Backend> {
    mlp: MLP<B>,
    action_dim: usize,
    max_action: f32,
}

impl SquashedGaussianPolicyConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SquashedGaussianPolicy<B> {
        SquashedGaussianPolicy {
            mlp: MLPConfig::new(self.obs_dim, self.hidden_layers.clone(), 2 * self.action_dim).init(device),
            action_dim: self.action_dim,
            max_action: self.max_action,
        }
    }
}

impl<B: Backend> SquashedGaussianPolicy<B> {
    /// Returns: (mean, log_std), both [batch_size, action_dim]
    pub fn forward(&self, observation: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let output = self.mlp.forward(observation);
        let [batch_size, _] = output.dims();

        let mean = output.clone().slice([0..batch_size, 0..self.action_dim]);
        let log_std = output
            .slice([0..batch_size, self.action_dim..2 * self.action_dim])
            .clamp(LOG_STD_MIN, LOG_STD_MAX);

        (mean, log_std)
    }

    pub fn flat_params(&self) -> Vec<f32> {
        self.mlp.flat_params()
    }
}

impl<B: AutodiffBackend> BearPolicyModel<B> for SquashedGaussianPolicy<B> {
    fn sample_action(&self, observation: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>) {
        let (mean, log_std) = self.forward(observation);
        let std = log_std.clone().exp();

        // u = μ + σ·ε
        let epsilon = Tensor::random_like(&mean, Distribution::Normal(0.0, 1.0));
        let action_unbounded = mean.clone() + std * epsilon.clone();
        let squashed = action_unbounded.tanh();

        // log N(u; μ, σ) with (u - μ)/σ = ε
        let log_prob_gaussian = epsilon
            .powf_scalar(2.0)
            .mul_scalar(-0.5)
            .sub(log_std)
            .sub_scalar(0.5 * (2.0 * std::f32::consts::PI).ln())
            .sum_dim(1);

        // tanh and scale corrections
        let tanh_correction = squashed
            .clone()
            .powf_scalar(2.0)
            .neg()
            .add_scalar(1.0 + 1e-6)
            .log()
            .sum_dim(1);
        let log_prob = log_prob_gaussian
            .sub(tanh_correction)
            .sub_scalar(self.action_dim as f32 * self.max_action.ln());

        let action = squashed.mul_scalar(self.max_action);
        let mean_action = mean.tanh().mul_scalar(self.max_action);

        (action, log_prob, mean_action)
    }

    fn sample_multiple_without_squash(&self, observation: Tensor<B, 2>, num_samples: usize) -> Tensor<B, 3> {
        let (mean, log_std) = self.forward(observation);

        let mean = mean.unsqueeze_dim::<3>(1).repeat_dim(1, num_samples);
        let std = log_std.exp().unsqueeze_dim::<3>(1).repeat_dim(1, num_samples);
        let epsilon = Tensor::random_like(&mean, Distribution::Normal(0.0, 1.0));

        mean + std * epsilon
    }
}
