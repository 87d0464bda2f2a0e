//! Reference environments used for evaluation rollouts and demos

pub mod pendulum;

pub use pendulum::{Pendulum, PendulumAction, PendulumState};
