//! Fixed offline datasets of transitions
//!
//! [`OfflineBuffer`] keeps every transition in memory and serves uniformly sampled
//! minibatches (with replacement). Agents only depend on the [`OfflineDataset`] trait,
//! so any other storage can be plugged in.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::env::Environment;

/// A single recorded transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub next_observation: Vec<f32>,
    pub done: bool,
}

/// A minibatch of transitions, one row per item
///
/// All fields share the same leading (batch) dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionBatch {
    pub observations: Vec<Vec<f32>>,
    pub actions: Vec<Vec<f32>>,
    pub rewards: Vec<f32>,
    pub next_observations: Vec<Vec<f32>>,
    pub dones: Vec<bool>,
}

impl TransitionBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            next_observations: Vec::with_capacity(capacity),
            dones: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, transition: &Transition) {
        self.observations.push(transition.observation.clone());
        self.actions.push(transition.action.clone());
        self.rewards.push(transition.reward);
        self.next_observations.push(transition.next_observation.clone());
        self.dones.push(transition.done);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// A source of training minibatches
pub trait OfflineDataset {
    /// Draw one minibatch
    fn sample(&mut self) -> TransitionBatch;

    /// Number of stored transitions
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory offline dataset with uniform sampling
#[derive(Debug, Clone)]
pub struct OfflineBuffer {
    transitions: Vec<Transition>,
    batch_size: usize,
    rng: StdRng,
}

impl OfflineBuffer {
    /// Create an empty buffer that serves batches of `batch_size`
    pub fn new(batch_size: usize) -> Self {
        Self {
            transitions: Vec::new(),
            batch_size,
            rng: StdRng::from_entropy(),
        }
    }

    /// Same as [`OfflineBuffer::new`] with a deterministic sampling order
    pub fn with_seed(batch_size: usize, seed: u64) -> Self {
        Self {
            transitions: Vec::new(),
            batch_size,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_transitions(transitions: Vec<Transition>, batch_size: usize) -> Self {
        Self {
            transitions,
            ..Self::new(batch_size)
        }
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Fill the buffer by running `env` with uniformly random actions for `n_steps`
    pub fn collect<E>(&mut self, env: &mut E, n_steps: usize)
    where
        E: Environment,
        E::State: Into<Vec<f32>>,
        E::Action: Into<Vec<f32>>,
    {
        let mut state = env.reset();
        for _ in 0..n_steps {
            let action = env.random_action();
            let (next, reward) = env.step(action.clone());
            let done = next.is_none();
            // Terminal rows keep the last observation; the done flag masks the bootstrap.
            let next_observation = next.clone().unwrap_or_else(|| state.clone());

            self.push(Transition {
                observation: state.into(),
                action: action.into(),
                reward,
                next_observation: next_observation.into(),
                done,
            });

            state = match next {
                Some(s) => s,
                None => env.reset(),
            };
        }
    }
}

impl OfflineDataset for OfflineBuffer {
    /// # Panics
    /// If the buffer is empty.
    fn sample(&mut self) -> TransitionBatch {
        assert!(!self.transitions.is_empty(), "cannot sample from an empty dataset");

        let mut batch = TransitionBatch::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let index = self.rng.gen_range(0..self.transitions.len());
            batch.push(&self.transitions[index]);
        }
        batch
    }

    fn len(&self) -> usize {
        self.transitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gym::Pendulum;

    fn transition(i: usize) -> Transition {
        Transition {
            observation: vec![i as f32, 0.0],
            action: vec![0.1 * i as f32],
            reward: i as f32,
            next_observation: vec![i as f32 + 1.0, 0.0],
            done: i % 10 == 9,
        }
    }

    #[test]
    fn sample_has_aligned_rows() {
        let mut buffer = OfflineBuffer::with_seed(8, 7);
        for i in 0..20 {
            buffer.push(transition(i));
        }

        let batch = buffer.sample();
        assert_eq!(batch.len(), 8);
        assert_eq!(batch.actions.len(), 8);
        assert_eq!(batch.rewards.len(), 8);
        assert_eq!(batch.next_observations.len(), 8);
        assert_eq!(batch.dones.len(), 8);

        for row in 0..batch.len() {
            // reward doubles as the source index
            let source = transition(batch.rewards[row] as usize);
            assert_eq!(batch.observations[row], source.observation);
            assert_eq!(batch.dones[row], source.done);
        }
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let transitions: Vec<_> = (0..50).map(transition).collect();
        let mut a = OfflineBuffer::with_seed(4, 42);
        let mut b = OfflineBuffer::with_seed(4, 42);
        for t in &transitions {
            a.push(t.clone());
            b.push(t.clone());
        }

        assert_eq!(a.sample(), b.sample());
    }

    #[test]
    #[should_panic(expected = "empty dataset")]
    fn sampling_empty_buffer_panics() {
        OfflineBuffer::new(4).sample();
    }

    #[test]
    fn collect_records_episode_ends() {
        let mut env = Pendulum::new(10);
        let mut buffer = OfflineBuffer::new(4);
        buffer.collect(&mut env, 25);

        assert_eq!(buffer.len(), 25);
        let dones = buffer.transitions().iter().filter(|t| t.done).count();
        assert_eq!(dones, 2);
        assert!(buffer.transitions().iter().all(|t| t.observation.len() == 3));
        assert!(buffer.transitions().iter().all(|t| t.action.len() == 1));
    }
}
