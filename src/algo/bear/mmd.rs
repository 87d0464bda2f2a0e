//! Maximum Mean Discrepancy between two sets of sampled actions
//!
//! BEAR constrains the policy's *support* rather than its density: the policy's
//! samples only need to land where the behavior model puts mass. A sample-based
//! MMD with a narrow kernel estimates exactly that.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Added under the square root so cancellation can never produce a negative argument
pub const MMD_EPSILON: f32 = 1e-6;

/// Kernel used to compare two action samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelType {
    /// `exp(-‖a - b‖² / (2σ²))`
    #[default]
    Gaussian,
    /// `exp(-‖a - b‖₁ / (2σ))`
    Laplacian,
}

/// Per-item MMD between `samples1` and `samples2`
///
/// Both inputs are `[batch, n_samples, action_dim]`; the result is `[batch]` and
/// is `sqrt(k(x,x) + k(y,y) - 2k(x,y) + ε)`, each term the mean kernel value over all
/// sample pairs of one batch item.
pub fn mmd_distance<B: Backend>(
    samples1: Tensor<B, 3>,
    samples2: Tensor<B, 3>,
    kernel: KernelType,
    sigma: f32,
) -> Tensor<B, 1> {
    let within1 = mean_pairwise_kernel(samples1.clone(), samples1.clone(), kernel, sigma);
    let cross = mean_pairwise_kernel(samples1, samples2.clone(), kernel, sigma);
    let within2 = mean_pairwise_kernel(samples2.clone(), samples2, kernel, sigma);

    (within1 + within2 - cross.mul_scalar(2.0))
        .add_scalar(MMD_EPSILON)
        .sqrt()
}

fn mean_pairwise_kernel<B: Backend>(
    a: Tensor<B, 3>,
    b: Tensor<B, 3>,
    kernel: KernelType,
    sigma: f32,
) -> Tensor<B, 1> {
    let [batch, n, _] = a.dims();
    let [_, m, _] = b.dims();

    // [batch, n, m, action_dim]
    let a = a.unsqueeze_dim::<4>(2).repeat_dim(2, m);
    let b = b.unsqueeze_dim::<4>(1).repeat_dim(1, n);
    let diff = a - b;

    let exponent = match kernel {
        KernelType::Gaussian => diff
            .powf_scalar(2.0)
            .sum_dim(3)
            .mul_scalar(-1.0 / (2.0 * sigma * sigma)),
        KernelType::Laplacian => diff.abs().sum_dim(3).mul_scalar(-1.0 / (2.0 * sigma)),
    };

    exponent
        .exp()
        .reshape([batch, n * m])
        .mean_dim(1)
        .reshape([batch])
}
