pub mod critic;
pub mod cvae;
pub mod gaussian_policy;
pub mod mlp;

pub use critic::MlpCritic;
pub use cvae::{Cvae, CvaeConfig};
pub use gaussian_policy::{SquashedGaussianPolicy, SquashedGaussianPolicyConfig};
pub use mlp::{MLPConfig, MLP};
