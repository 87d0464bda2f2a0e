use std::{fs, path::Path, path::PathBuf};

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use super::mmd::KernelType;
use crate::error::BearError;

/// Optimizer used for every learnable part of a [`BearAgent`](super::BearAgent)
pub type BearOptimizer<M, B> = OptimizerAdaptor<Adam, M, B>;

/// Configuration for the [`BearAgent`](super::BearAgent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearAgentConfig {
    // Learning rates
    /// The learning rate for the policy
    ///
    /// **Default:** `1e-4`
    pub lr_policy: f64,
    /// The learning rate for both critics
    ///
    /// **Default:** `3e-4`
    pub lr_critic: f64,
    /// The learning rate for the behavior model
    ///
    /// **Default:** `3e-4`
    pub lr_behavior: f64,
    /// The learning rate for `log_alpha_prime`
    ///
    /// **Default:** `1e-3`
    pub lr_alpha_prime: f64,
    /// The learning rate for the temperature when `auto_entropy_tuning` is set
    ///
    /// **Default:** `1e-4`
    pub lr_temperature: f64,
    /// Clip gradients element-wise to `[-c, c]` for every optimizer
    ///
    /// **Default:** `None`
    pub gradient_clip: Option<f32>,

    // Actor-critic
    /// The discount factor γ
    ///
    /// **Default:** `0.99`
    pub gamma: f32,
    /// The soft update rate τ for the target critics
    ///
    /// **Default:** `0.05`
    pub tau: f32,
    /// The entropy temperature, fixed or initial depending on `auto_entropy_tuning`
    ///
    /// **Default:** `0.5`
    pub temperature: f32,
    /// Learn the temperature to match `target_entropy`
    ///
    /// **Default:** `false`
    pub auto_entropy_tuning: bool,
    /// Target entropy for the temperature; `None` means `-action_dim`
    ///
    /// **Default:** `None`
    pub target_entropy: Option<f32>,

    // BEAR
    /// Weight of `min` against `max` in the soft-clipped double-Q target
    ///
    /// **Default:** `0.75`
    pub lambda: f32,
    /// Kernel bandwidth σ of the MMD (10 suits hopper/cheetah, 20 walker/ant)
    ///
    /// **Default:** `20.0`
    pub mmd_sigma: f32,
    /// **Default:** [`KernelType::Gaussian`]
    pub kernel_type: KernelType,
    /// MMD threshold ε of the support constraint `MMD ≤ ε`
    ///
    /// **Default:** `0.05`
    pub lagrange_threshold: f32,
    /// Initial value of `log_alpha_prime`
    ///
    /// **Default:** `0.0`
    pub initial_log_alpha_prime: f32,
    /// Candidates drawn by greedy action selection
    ///
    /// **Default:** `100`
    pub n_action_samples: usize,
    /// Policy actions drawn per next observation for the critic target
    ///
    /// **Default:** `10`
    pub n_target_samples: usize,
    /// Samples per observation from each side of the MMD
    ///
    /// **Default:** `4`
    pub n_mmd_action_samples: usize,
    /// Steps of pure support matching before the Q-value term joins the policy loss
    ///
    /// **Default:** `40_000`
    pub warmup_step: usize,

    // Orchestration
    /// Total number of training steps
    ///
    /// **Default:** `1_000_000`
    pub max_train_step: usize,
    /// Steps between metric logs and checkpoints
    ///
    /// **Default:** `1000`
    pub log_interval: usize,
    /// Steps between evaluation rollouts
    ///
    /// **Default:** `5000`
    pub eval_freq: usize,
    /// Episodes per evaluation
    ///
    /// **Default:** `5`
    pub eval_episodes: usize,
    /// Directory for checkpoints and the saved config; nothing is written when `None`
    ///
    /// **Default:** `None`
    pub result_dir: Option<PathBuf>,
    /// Checkpoints kept on disk (0 keeps all)
    ///
    /// **Default:** `5`
    pub keep_last_checkpoints: usize,
    /// Restore the latest checkpoint in `result_dir` before training
    ///
    /// **Default:** `false`
    pub resume: bool,
}

impl Default for BearAgentConfig {
    fn default() -> Self {
        Self {
            lr_policy: 1e-4,
            lr_critic: 3e-4,
            lr_behavior: 3e-4,
            lr_alpha_prime: 1e-3,
            lr_temperature: 1e-4,
            gradient_clip: None,
            gamma: 0.99,
            tau: 0.05,
            temperature: 0.5,
            auto_entropy_tuning: false,
            target_entropy: None,
            lambda: 0.75,
            mmd_sigma: 20.0,
            kernel_type: KernelType::Gaussian,
            lagrange_threshold: 0.05,
            initial_log_alpha_prime: 0.0,
            n_action_samples: 100,
            n_target_samples: 10,
            n_mmd_action_samples: 4,
            warmup_step: 40_000,
            max_train_step: 1_000_000,
            log_interval: 1000,
            eval_freq: 5000,
            eval_episodes: 5,
            result_dir: None,
            keep_last_checkpoints: 5,
            resume: false,
        }
    }
}

impl BearAgentConfig {
    /// A fresh Adam optimizer honouring `gradient_clip`
    pub fn optimizer<B, M>(&self) -> BearOptimizer<M, B>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        AdamConfig::new()
            .with_grad_clipping(self.gradient_clip.map(GradientClippingConfig::Value))
            .init()
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), BearError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BearError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_hyperparameters() {
        let config = BearAgentConfig::default();
        assert_eq!(config.n_target_samples, 10);
        assert_eq!(config.n_mmd_action_samples, 4);
        assert_eq!(config.kernel_type, KernelType::Gaussian);
        assert!((config.tau - 0.05).abs() < f32::EPSILON);
        assert!(!config.auto_entropy_tuning);
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = BearAgentConfig {
            kernel_type: KernelType::Laplacian,
            auto_entropy_tuning: true,
            gradient_clip: Some(1.0),
            result_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        config.save_json(&path).unwrap();

        assert_eq!(BearAgentConfig::load_json(&path).unwrap(), config);
    }

    #[test]
    fn loading_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(BearAgentConfig::load_json(&path), Err(BearError::Json(_))));
    }
}
