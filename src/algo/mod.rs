/// Bootstrapping Error Accumulation Reduction
pub mod bear;
