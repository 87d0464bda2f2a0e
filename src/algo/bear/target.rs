use burn::{prelude::*, tensor::backend::AutodiffBackend};

use super::model::BearCriticModel;

/// Target copies of the two critics
///
/// Created once from the online critics and afterwards only moved by Polyak averaging.
#[derive(Debug, Clone)]
pub struct TargetCritics<C> {
    pub critic1: C,
    pub critic2: C,
}

impl<C> TargetCritics<C> {
    pub const RECORDS: [&'static str; 2] = ["target_critic1", "target_critic2"];

    /// One-time hard copy of the online critics
    pub fn snapshot<B>(critic1: &C, critic2: &C) -> Self
    where
        B: AutodiffBackend,
        C: BearCriticModel<B>,
    {
        Self {
            critic1: critic1.clone().no_grad(),
            critic2: critic2.clone().no_grad(),
        }
    }

    pub fn soft_update<B>(self, critic1: &C, critic2: &C, tau: f32) -> Self
    where
        B: AutodiffBackend,
        C: BearCriticModel<B>,
    {
        Self {
            critic1: self.critic1.soft_update(critic1, tau),
            critic2: self.critic2.soft_update(critic2, tau),
        }
    }

    /// Soft-clipped double-Q of both targets, detached
    ///
    /// Returns: [batch_size, 1]
    pub fn value<B>(&self, observation: Tensor<B, 2>, action: Tensor<B, 2>, lambda: f32) -> Tensor<B, 2>
    where
        B: AutodiffBackend,
        C: BearCriticModel<B>,
    {
        let q1 = self.critic1.forward(observation.clone(), action.clone());
        let q2 = self.critic2.forward(observation, action);
        soft_clipped_double_q(q1, q2, lambda).detach()
    }
}

/// `λ·min(q1, q2) + (1 − λ)·max(q1, q2)`
pub fn soft_clipped_double_q<B: Backend>(q1: Tensor<B, 2>, q2: Tensor<B, 2>, lambda: f32) -> Tensor<B, 2> {
    let min = q1.clone().min_pair(q2.clone());
    let max = q1.max_pair(q2);
    min.mul_scalar(lambda) + max.mul_scalar(1.0 - lambda)
}

/// Repeat every row `n` times in place: `[a, b]` becomes `[a, a, .., b, b, ..]`
pub fn repeat_interleave_rows<B: Backend>(x: Tensor<B, 2>, n: usize) -> Tensor<B, 2> {
    let [rows, cols] = x.dims();
    x.unsqueeze_dim::<3>(1)
        .repeat_dim(1, n)
        .reshape([rows * n, cols])
}

/// Max over each group of `n` consecutive rows
///
/// `q` is `[batch * n, 1]` as produced from [`repeat_interleave_rows`] inputs; the
/// result is `[batch, 1]`.
pub fn max_over_target_samples<B: Backend>(q: Tensor<B, 2>, batch: usize, n: usize) -> Tensor<B, 2> {
    q.reshape([batch, n]).max_dim(1)
}

/// `r + γ·(1 − done)·max_target_q`
///
/// `done` is a 0/1 float mask; all inputs are `[batch, 1]`.
pub fn bootstrap_target<B: Backend>(
    rewards: Tensor<B, 2>,
    done: Tensor<B, 2>,
    max_target_q: Tensor<B, 2>,
    gamma: f32,
) -> Tensor<B, 2> {
    let not_done = done.neg().add_scalar(1.0);
    rewards + not_done * max_target_q.mul_scalar(gamma)
}
