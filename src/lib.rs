//! Offline reinforcement learning on top of burn.
//!
//! The main entry point is [`algo::bear::BearAgent`], an implementation of
//! Bootstrapping Error Accumulation Reduction (Kumar et al., 2019): a SAC-style
//! actor-critic trained purely from a fixed dataset, with an MMD support constraint
//! keeping the policy close to a learned behavior model.

pub mod algo;
pub mod checkpoint;
pub mod dataset;
pub mod env;
pub mod error;
pub mod eval;
pub mod gym;
pub mod metrics;
pub mod nn;
pub mod traits;
