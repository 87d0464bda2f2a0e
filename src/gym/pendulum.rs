//! Inverted pendulum swing-up with a continuous torque action
//!
//! Dynamics and reward match the classic-control Pendulum: θ = 0 is upright, the
//! observation is `[cos θ, sin θ, θ̇]` and the reward is `-(θ² + 0.1·θ̇² + 0.001·u²)`.
//! Episodes never terminate early; they are truncated after `max_steps`.

use std::f32::consts::PI;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::env::{ContinuousActionSpace, Environment};

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const GRAVITY: f32 = 10.0;
const MASS: f32 = 1.0;
const LENGTH: f32 = 1.0;

/// `[cos θ, sin θ, θ̇]`
pub type PendulumState = [f32; 3];

/// Torque, clamped to `[-2, 2]` when applied
pub type PendulumAction = [f32; 1];

#[derive(Debug, Clone)]
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl Pendulum {
    /// Episodes are truncated after `max_steps` (200 in the usual setting)
    pub fn new(max_steps: usize) -> Self {
        Self::from_rng(max_steps, StdRng::from_entropy())
    }

    /// Reproducible initial states and random actions
    pub fn with_seed(max_steps: usize, seed: u64) -> Self {
        Self::from_rng(max_steps, StdRng::seed_from_u64(seed))
    }

    fn from_rng(max_steps: usize, rng: StdRng) -> Self {
        Self {
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            max_steps,
            rng,
        }
    }

    /// Steps taken in the current episode
    pub fn episode_steps(&self) -> usize {
        self.steps
    }

    fn observation(&self) -> PendulumState {
        [self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

/// Wrap an angle into `[-π, π)`
fn wrap_angle(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

/// One semi-implicit Euler step: θ̈ = 3g/(2l)·sin θ + 3/(ml²)·u
fn integrate(theta: f32, theta_dot: f32, torque: f32) -> (f32, f32) {
    let theta_acc = 3.0 * GRAVITY / (2.0 * LENGTH) * theta.sin() + 3.0 / (MASS * LENGTH * LENGTH) * torque;
    let theta_dot = (theta_dot + theta_acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
    (wrap_angle(theta + theta_dot * DT), theta_dot)
}

impl Environment for Pendulum {
    type State = PendulumState;
    type Action = PendulumAction;

    fn step(&mut self, action: Self::Action) -> (Option<Self::State>, f32) {
        let torque = action[0].clamp(-MAX_TORQUE, MAX_TORQUE);
        (self.theta, self.theta_dot) = integrate(self.theta, self.theta_dot, torque);

        let reward = -(self.theta * self.theta
            + 0.1 * self.theta_dot * self.theta_dot
            + 0.001 * torque * torque);

        self.steps += 1;
        let next = (self.steps < self.max_steps).then(|| self.observation());
        (next, reward)
    }

    fn reset(&mut self) -> Self::State {
        self.theta = self.rng.gen_range(-PI..PI);
        self.theta_dot = self.rng.gen_range(-1.0..1.0);
        self.steps = 0;
        self.observation()
    }

    fn random_action(&mut self) -> Self::Action {
        [self.rng.gen_range(-MAX_TORQUE..MAX_TORQUE)]
    }
}

impl ContinuousActionSpace for Pendulum {
    fn observation_dim(&self) -> usize {
        3
    }

    fn action_dim(&self) -> usize {
        1
    }

    fn max_action(&self) -> f32 {
        MAX_TORQUE
    }
}
