use burn::{
    module::Param,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};

use super::config::{BearAgentConfig, BearOptimizer};
use crate::checkpoint::{CheckpointDir, CheckpointError};

/// Lower clamp bound of `log_alpha_prime`
pub const LOG_ALPHA_PRIME_MIN: f32 = -5.0;
/// Upper clamp bound of `log_alpha_prime`
pub const LOG_ALPHA_PRIME_MAX: f32 = 10.0;

/// A learnable scalar stored in log space
#[derive(Module, Debug)]
pub struct LogMultiplier<B: Backend> {
    log_value: Param<Tensor<B, 1>>,
}

impl<B: Backend> LogMultiplier<B> {
    pub fn new(initial_log_value: f32, device: &B::Device) -> Self {
        Self {
            log_value: Param::from_tensor(Tensor::from_floats([initial_log_value], device)),
        }
    }

    /// Shape `[1]`, attached to the graph
    pub fn log_value(&self) -> Tensor<B, 1> {
        self.log_value.val()
    }

    pub fn log_scalar(&self) -> f32 {
        self.log_value.val().into_scalar().elem()
    }

    /// `exp(log_value)` read back as a plain number
    pub fn value(&self) -> f32 {
        self.log_scalar().exp()
    }

    /// Clamp the stored log value into `[min, max]`
    pub fn clamp(self, min: f32, max: f32) -> Self {
        Self {
            log_value: self
                .log_value
                .map(|t| t.clamp(min, max).detach().require_grad()),
        }
    }
}

/// Per-item MMD of one training step
///
/// Produced once per step. The multiplier update only borrows it (and reads its mean);
/// the policy update then consumes it, so its graph stays alive until the policy's
/// backward pass.
#[derive(Debug)]
pub struct SupportDistance<B: Backend> {
    per_item: Tensor<B, 1>,
}

impl<B: Backend> SupportDistance<B> {
    /// `per_item` is `[batch]`
    pub fn new(per_item: Tensor<B, 1>) -> Self {
        Self { per_item }
    }

    pub fn mean(&self) -> f32 {
        self.per_item.clone().mean().into_scalar().elem()
    }

    /// `mean(weight · distance)`, still attached to the policy's graph
    pub fn into_penalty(self, weight: f32) -> Tensor<B, 1> {
        self.per_item.mul_scalar(weight).mean()
    }
}

/// Lagrange multiplier `alpha_prime` enforcing `MMD ≤ threshold`
pub struct SupportMultiplier<B: AutodiffBackend> {
    log_alpha_prime: LogMultiplier<B>,
    optimizer: BearOptimizer<LogMultiplier<B>, B>,
    threshold: f32,
    lr: f64,
}

impl<B: AutodiffBackend> SupportMultiplier<B> {
    pub const RECORD: &'static str = "log_alpha_prime";
    pub const OPTIMIZER_RECORD: &'static str = "log_alpha_prime_optim";

    pub fn new(config: &BearAgentConfig, device: &B::Device) -> Self {
        let initial = config
            .initial_log_alpha_prime
            .clamp(LOG_ALPHA_PRIME_MIN, LOG_ALPHA_PRIME_MAX);

        Self {
            log_alpha_prime: LogMultiplier::new(initial, device),
            optimizer: config.optimizer(),
            threshold: config.lagrange_threshold,
            lr: config.lr_alpha_prime,
        }
    }

    /// `exp(log_alpha_prime)`
    pub fn value(&self) -> f32 {
        self.log_alpha_prime.value()
    }

    pub fn log_value(&self) -> f32 {
        self.log_alpha_prime.log_scalar()
    }

    /// One step on `-alpha_prime · (mean MMD - threshold)`, then clamp
    ///
    /// Returns the loss. A distance above the threshold raises `alpha_prime`, one below
    /// lowers it.
    pub fn update(&mut self, distance: &SupportDistance<B>) -> f32 {
        let violation = distance.mean() - self.threshold;

        let loss = self
            .log_alpha_prime
            .log_value()
            .exp()
            .mul_scalar(-violation)
            .mean();
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let grads = GradientsParams::from_grads(loss.backward(), &self.log_alpha_prime);
        let updated = self
            .optimizer
            .step(self.lr, self.log_alpha_prime.clone(), grads);
        self.log_alpha_prime = updated.clamp(LOG_ALPHA_PRIME_MIN, LOG_ALPHA_PRIME_MAX);

        loss_value
    }

    pub(crate) fn save_to(&self, dir: &CheckpointDir) -> Result<(), CheckpointError> {
        dir.save_module(Self::RECORD, &self.log_alpha_prime)?;
        dir.save_optimizer(Self::OPTIMIZER_RECORD, &self.optimizer)
    }

    /// Read both records without touching `self`; [`SupportMultiplier::restore`] applies them
    pub(crate) fn load_parts(
        &self,
        dir: &CheckpointDir,
        config: &BearAgentConfig,
        device: &B::Device,
    ) -> Result<(LogMultiplier<B>, BearOptimizer<LogMultiplier<B>, B>), CheckpointError> {
        let log_alpha_prime = dir.load_module(Self::RECORD, self.log_alpha_prime.clone(), device)?;
        let optimizer = dir.load_optimizer(Self::OPTIMIZER_RECORD, config.optimizer(), device)?;
        Ok((log_alpha_prime, optimizer))
    }

    pub(crate) fn restore(&mut self, (log_alpha_prime, optimizer): (LogMultiplier<B>, BearOptimizer<LogMultiplier<B>, B>)) {
        self.log_alpha_prime = log_alpha_prime;
        self.optimizer = optimizer;
    }
}

/// Entropy temperature of the policy objective
pub enum Temperature<B: AutodiffBackend> {
    Fixed(f32),
    Adaptive {
        log_temperature: LogMultiplier<B>,
        optimizer: BearOptimizer<LogMultiplier<B>, B>,
        target_entropy: f32,
        lr: f64,
    },
}

impl<B: AutodiffBackend> Temperature<B> {
    pub const RECORD: &'static str = "log_temperature";
    pub const OPTIMIZER_RECORD: &'static str = "log_temperature_optim";

    pub fn new(config: &BearAgentConfig, action_dim: usize, device: &B::Device) -> Self {
        if !config.auto_entropy_tuning {
            return Temperature::Fixed(config.temperature);
        }

        Temperature::Adaptive {
            log_temperature: LogMultiplier::new(config.temperature.ln(), device),
            optimizer: config.optimizer(),
            target_entropy: config
                .target_entropy
                .unwrap_or_else(|| -(action_dim as f32)),
            lr: config.lr_temperature,
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, Temperature::Adaptive { .. })
    }

    pub fn value(&self) -> f32 {
        match self {
            Temperature::Fixed(value) => *value,
            Temperature::Adaptive { log_temperature, .. } => log_temperature.value(),
        }
    }

    /// One step on `-log_temperature · (log_prob + target_entropy)`
    ///
    /// `log_prob` is read as data only. Returns the loss, or 0 for a fixed temperature.
    pub fn update(&mut self, log_prob: Tensor<B, 2>) -> f32 {
        let Temperature::Adaptive {
            log_temperature,
            optimizer,
            target_entropy,
            lr,
        } = self
        else {
            return 0.0;
        };

        let mean_log_prob: f32 = log_prob.detach().mean().into_scalar().elem();
        let loss = log_temperature
            .log_value()
            .mul_scalar(-(mean_log_prob + *target_entropy))
            .mean();
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let grads = GradientsParams::from_grads(loss.backward(), &*log_temperature);
        *log_temperature = optimizer.step(*lr, log_temperature.clone(), grads);

        loss_value
    }

    pub(crate) fn save_to(&self, dir: &CheckpointDir) -> Result<(), CheckpointError> {
        if let Temperature::Adaptive {
            log_temperature,
            optimizer,
            ..
        } = self
        {
            dir.save_module(Self::RECORD, log_temperature)?;
            dir.save_optimizer(Self::OPTIMIZER_RECORD, optimizer)?;
        }
        Ok(())
    }

    /// Rebuild the temperature from `dir` without touching `self`
    pub(crate) fn load_from(
        &self,
        dir: &CheckpointDir,
        config: &BearAgentConfig,
        device: &B::Device,
    ) -> Result<Self, CheckpointError> {
        match self {
            Temperature::Fixed(value) => Ok(Temperature::Fixed(*value)),
            Temperature::Adaptive {
                log_temperature,
                target_entropy,
                lr,
                ..
            } => Ok(Temperature::Adaptive {
                log_temperature: dir.load_module(Self::RECORD, log_temperature.clone(), device)?,
                optimizer: dir.load_optimizer(Self::OPTIMIZER_RECORD, config.optimizer(), device)?,
                target_entropy: *target_entropy,
                lr: *lr,
            }),
        }
    }
}
