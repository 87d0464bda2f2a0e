use burn::{module::Module, prelude::*, tensor::backend::AutodiffBackend};

use super::mlp::{MLPConfig, MLP};
use crate::algo::bear::BearCriticModel;

/// Q-value network over `concat(observation, action)`
#[derive(Module, Debug)]
pub struct MlpCritic<B: Backend> {
    mlp: MLP<B>,
}

impl<B: Backend> MlpCritic<B> {
    /// Create a new MLP-based critic
    ///
    /// # Arguments
    /// - `obs_dim` - Dimension of the observation
    /// - `action_dim` - Dimension of the action
    /// - `hidden_layers` - Hidden layer sizes (e.g., [256, 256])
    /// - `device` - Device to create the network on
    pub fn new(obs_dim: usize, action_dim: usize, hidden_layers: Vec<usize>, device: &B::Device) -> Self {
        Self {
            mlp: MLPConfig::new(obs_dim + action_dim, hidden_layers, 1).init(device),
        }
    }

    pub fn flat_params(&self) -> Vec<f32> {
        self.mlp.flat_params()
    }
}

impl<B: AutodiffBackend> BearCriticModel<B> for MlpCritic<B> {
    fn forward(&self, observation: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(Tensor::cat(vec![observation, action], 1))
    }

    fn soft_update(self, online: &Self, tau: f32) -> Self {
        Self {
            mlp: self.mlp.soft_update(&online.mlp, tau),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use burn::tensor::Distribution;

    #[test]
    fn one_value_per_row() {
        let device = NdArrayDevice::default();
        let critic = MlpCritic::<Autodiff<NdArray>>::new(3, 2, vec![8, 8], &device);

        let observation = Tensor::random([4, 3], Distribution::Default, &device);
        let action = Tensor::random([4, 2], Distribution::Default, &device);

        assert_eq!(critic.forward(observation, action).dims(), [4, 1]);
    }
}
