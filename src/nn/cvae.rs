use burn::{
    module::Module,
    nn::loss::{MseLoss, Reduction},
    prelude::*,
    tensor::{backend::AutodiffBackend, Distribution},
};

use super::mlp::{MLPConfig, MLP};
use crate::algo::bear::{BehaviorModel, BehaviorOutput};

const LOG_STD_MIN: f32 = -4.0;
const LOG_STD_MAX: f32 = 15.0;
/// Latent codes drawn for decoding are clipped to `[-LATENT_CLIP, LATENT_CLIP]`
const LATENT_CLIP: f32 = 0.5;
const KL_WEIGHT: f32 = 0.5;

/// Configuration for [`Cvae`]
#[derive(Config, Debug)]
pub struct CvaeConfig {
    pub obs_dim: usize,
    pub action_dim: usize,
    pub latent_dim: usize,
    /// Hidden layers of both the encoder and the decoder
    pub hidden_layers: Vec<usize>,
    #[config(default = 1.0)]
    pub max_action: f32,
}

/// Conditional VAE over actions given observations
///
/// Encoder: (observation, action) → (latent mean, latent log_std)
/// Decoder: (observation, latent) → action
#[derive(Module, Debug)]
pub struct Cvae<B: Backend> {
    encoder: MLP<B>,
    decoder: MLP<B>,
    latent_dim: usize,
    max_action: f32,
}

impl CvaeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Cvae<B> {
        Cvae {
            encoder: MLPConfig::new(
                self.obs_dim + self.action_dim,
                self.hidden_layers.clone(),
                2 * self.latent_dim,
            )
            .init(device),
            decoder: MLPConfig::new(
                self.obs_dim + self.latent_dim,
                self.hidden_layers.clone(),
                self.action_dim,
            )
            .init(device),
            latent_dim: self.latent_dim,
            max_action: self.max_action,
        }
    }
}

impl<B: Backend> Cvae<B> {
    /// Decoder output before the tanh squash; works on `[batch, ..]` and `[batch, n, ..]`
    pub fn decode_without_squash<const D: usize>(&self, observation: Tensor<B, D>, latent: Tensor<B, D>) -> Tensor<B, D> {
        self.decoder.forward(Tensor::cat(vec![observation, latent], D - 1))
    }

    pub fn decode(&self, observation: Tensor<B, 2>, latent: Tensor<B, 2>) -> Tensor<B, 2> {
        self.decode_without_squash(observation, latent)
            .tanh()
            .mul_scalar(self.max_action)
    }

    pub fn flat_params(&self) -> Vec<f32> {
        [self.encoder.flat_params(), self.decoder.flat_params()].concat()
    }
}

impl<B: AutodiffBackend> BehaviorModel<B> for Cvae<B> {
    fn forward(&self, observation: Tensor<B, 2>, action: Tensor<B, 2>) -> BehaviorOutput<B> {
        let encoded = self
            .encoder
            .forward(Tensor::cat(vec![observation.clone(), action], 1));
        let [batch_size, _] = encoded.dims();

        let mean = encoded.clone().slice([0..batch_size, 0..self.latent_dim]);
        let log_std = encoded
            .slice([0..batch_size, self.latent_dim..2 * self.latent_dim])
            .clamp(LOG_STD_MIN, LOG_STD_MAX);
        let std = log_std.exp();

        let latent = mean.clone() + std.clone() * Tensor::random_like(&mean, Distribution::Normal(0.0, 1.0));
        let reconstruction = self.decode(observation, latent);

        BehaviorOutput {
            reconstruction,
            mean,
            std,
        }
    }

    /// Reconstruction MSE + 0.5 · KL(q(z | s, a) ‖ N(0, I))
    fn loss(&self, output: BehaviorOutput<B>, action: Tensor<B, 2>) -> Tensor<B, 1> {
        let reconstruction = MseLoss::new().forward(output.reconstruction, action, Reduction::Mean);

        let variance = output.std.powf_scalar(2.0);
        let kl = (variance.clone().log().add_scalar(1.0) - output.mean.powf_scalar(2.0) - variance)
            .mean()
            .mul_scalar(-0.5);

        reconstruction + kl.mul_scalar(KL_WEIGHT)
    }

    fn decode_multiple_without_squash(&self, observation: Tensor<B, 2>, num_samples: usize) -> Tensor<B, 3> {
        let [batch_size, _] = observation.dims();
        let latent = Tensor::random(
            [batch_size, num_samples, self.latent_dim],
            Distribution::Normal(0.0, 1.0),
            &observation.device(),
        )
        .clamp(-LATENT_CLIP, LATENT_CLIP);
        let observation = observation.unsqueeze_dim::<3>(1).repeat_dim(1, num_samples);

        self.decode_without_squash(observation, latent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use burn::optim::{AdamConfig, GradientsParams, Optimizer};
    use burn::tensor::ElementConversion;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn output_shapes() {
        let device = NdArrayDevice::default();
        let cvae = CvaeConfig::new(3, 2, 4, vec![16]).init::<TestBackend>(&device);
        let observation = Tensor::random([6, 3], Distribution::Default, &device);
        let action = Tensor::random([6, 2], Distribution::Uniform(-1.0, 1.0), &device);

        let output = cvae.forward(observation.clone(), action.clone());
        assert_eq!(output.reconstruction.dims(), [6, 2]);
        assert_eq!(output.mean.dims(), [6, 4]);
        assert_eq!(output.std.dims(), [6, 4]);
        assert_eq!(cvae.loss(output, action).dims(), [1]);

        assert_eq!(cvae.decode_multiple_without_squash(observation, 5).dims(), [6, 5, 2]);
    }

    #[test]
    fn a_few_steps_reduce_the_loss() {
        let device = NdArrayDevice::default();
        let mut cvae = CvaeConfig::new(2, 1, 2, vec![32]).init::<TestBackend>(&device);
        let mut optimizer = AdamConfig::new().init();

        let observation = Tensor::<TestBackend, 2>::random([32, 2], Distribution::Uniform(-1.0, 1.0), &device);
        let action = observation.clone().slice([0..32, 0..1]).mul_scalar(0.5);

        let loss_of = |cvae: &Cvae<TestBackend>| {
            let output = cvae.forward(observation.clone(), action.clone());
            cvae.loss(output, action.clone())
        };

        let initial: f32 = loss_of(&cvae).into_scalar().elem();
        for _ in 0..100 {
            let loss = loss_of(&cvae);
            let grads = GradientsParams::from_grads(loss.backward(), &cvae);
            cvae = optimizer.step(1e-2, cvae, grads);
        }
        let trained: f32 = loss_of(&cvae).into_scalar().elem();

        assert!(trained < initial, "loss went from {initial} to {trained}");
    }
}
