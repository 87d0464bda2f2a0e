/// Multi-Layer Perceptron (MLP) - Generic feedforward neural network
///
/// The shared building block of the policy, critic, and behavior-model networks.
use burn::{
    module::{Module, Param},
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, backend::Backend},
};

/// Configuration for Multi-Layer Perceptron
#[derive(Config, Debug)]
pub struct MLPConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Hidden layer dimensions (e.g., [256, 256] for two hidden layers of 256 units each)
    pub hidden_layers: Vec<usize>,
    /// Output dimension
    pub output_dim: usize,
}

/// Multi-Layer Perceptron implementation
///
/// Hidden layers use ReLU activation, the output layer is linear.
#[derive(Module, Debug)]
pub struct MLP<B: Backend> {
    layers: Vec<Linear<B>>,
}

impl MLPConfig {
    /// Initialize the MLP with the given configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLP<B> {
        let mut dims = Vec::with_capacity(self.hidden_layers.len() + 2);
        dims.push(self.input_dim);
        dims.extend_from_slice(&self.hidden_layers);
        dims.push(self.output_dim);

        let layers = dims
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();

        MLP { layers }
    }
}

impl<B: Backend> MLP<B> {
    /// Forward pass over the last dimension of `input`
    ///
    /// Works with any tensor rank: `[features]`, `[batch, features]`,
    /// `[batch, samples, features]`, ...
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let output_layer = self.layers.len().saturating_sub(1);

        self.layers
            .iter()
            .enumerate()
            .fold(input, |x, (i, layer)| {
                let x = layer.forward(x);
                if i < output_layer {
                    relu(x)
                } else {
                    x
                }
            })
    }

    /// Polyak averaging: returns `τ·online + (1 − τ)·self`
    ///
    /// `self` is the target network. The online parameters are detached, so the
    /// returned module never carries autodiff history from the online network.
    pub fn soft_update(self, online: &Self, tau: f32) -> Self {
        let layers = self
            .layers
            .into_iter()
            .zip(online.layers.iter())
            .map(|(target, online)| soft_update_linear(target, online, tau))
            .collect();

        Self { layers }
    }

    /// All parameters flattened in layer order (weight then bias)
    ///
    /// Meant for inspection and comparison, not for the training path.
    pub fn flat_params(&self) -> Vec<f32> {
        let mut values = Vec::new();
        for layer in &self.layers {
            values.extend(layer.weight.val().into_data().iter::<f32>());
            if let Some(bias) = &layer.bias {
                values.extend(bias.val().into_data().iter::<f32>());
            }
        }
        values
    }
}

/// θ′ ← τθ + (1 − τ)θ′
pub fn soft_update_tensor<B: Backend, const D: usize>(
    target: Param<Tensor<B, D>>,
    online: &Param<Tensor<B, D>>,
    tau: f32,
) -> Param<Tensor<B, D>> {
    // Detach both sides: the target must not accumulate an autodiff graph across steps.
    target.map(|tensor| {
        tensor.detach().mul_scalar(1.0 - tau) + online.val().detach().mul_scalar(tau)
    })
}

pub fn soft_update_linear<B: Backend>(mut target: Linear<B>, online: &Linear<B>, tau: f32) -> Linear<B> {
    target.weight = soft_update_tensor(target.weight, &online.weight, tau);
    target.bias = match (target.bias, &online.bias) {
        (Some(b1), Some(b2)) => Some(soft_update_tensor(b1, b2, tau)),
        (bias, _) => bias,
    };

    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_mlp_forward_2d() {
        let device = NdArrayDevice::default();

        // 4 → [64, 64] → 2
        let mlp = MLPConfig::new(4, vec![64, 64], 2).init::<NdArray>(&device);

        let input = Tensor::<NdArray, 2>::random(
            [8, 4],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let output: Tensor<NdArray, 2> = mlp.forward(input);

        assert_eq!(output.shape().dims, [8, 2]);
    }

    #[test]
    fn test_mlp_forward_3d() {
        let device = NdArrayDevice::default();
        let mlp = MLPConfig::new(4, vec![16], 2).init::<NdArray>(&device);

        // [batch, samples, features]
        let input = Tensor::<NdArray, 3>::random(
            [5, 7, 4],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let output: Tensor<NdArray, 3> = mlp.forward(input);

        assert_eq!(output.shape().dims, [5, 7, 2]);
    }

    #[test]
    fn test_mlp_no_hidden_layers() {
        let device = NdArrayDevice::default();
        let mlp = MLPConfig::new(4, vec![], 2).init::<NdArray>(&device);

        let input = Tensor::<NdArray, 2>::random([1, 4], burn::tensor::Distribution::Default, &device);
        let output = mlp.forward(input);

        assert_eq!(output.shape().dims, [1, 2]);
        // one 4x2 weight + 2 biases
        assert_eq!(mlp.flat_params().len(), 10);
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "expected {e}, got {a}");
        }
    }

    #[test]
    fn test_soft_update_moves_tau_fraction() {
        let device = NdArrayDevice::default();
        let config = MLPConfig::new(3, vec![8], 1);
        let online = config.init::<NdArray>(&device);
        let target = config.init::<NdArray>(&device);

        let before = target.flat_params();
        let online_params = online.flat_params();

        let updated = target.soft_update(&online, 0.05).flat_params();
        let expected: Vec<f32> = before
            .iter()
            .zip(&online_params)
            .map(|(t, o)| t + 0.05 * (o - t))
            .collect();

        assert_close(&updated, &expected);
    }

    #[test]
    fn test_soft_update_extremes() {
        let device = NdArrayDevice::default();
        let config = MLPConfig::new(3, vec![8], 1);
        let online = config.init::<NdArray>(&device);
        let target = config.init::<NdArray>(&device);
        let before = target.flat_params();

        let unchanged = target.clone().soft_update(&online, 0.0).flat_params();
        assert_close(&unchanged, &before);

        let copied = target.soft_update(&online, 1.0).flat_params();
        assert_close(&copied, &online.flat_params());
    }
}
