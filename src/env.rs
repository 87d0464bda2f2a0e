use std::collections::BTreeMap;

/// An episodic environment
///
/// `step` returns `None` as the next state once the episode has ended.
pub trait Environment {
    type State: Clone;
    type Action: Clone;

    fn step(&mut self, action: Self::Action) -> (Option<Self::State>, f32);

    fn reset(&mut self) -> Self::State;

    /// Uniformly random action, used to collect offline datasets
    fn random_action(&mut self) -> Self::Action;
}

/// Flat observation and symmetric, bounded continuous action space
///
/// Sizes the networks of an agent trained for the environment.
pub trait ContinuousActionSpace {
    fn observation_dim(&self) -> usize;

    fn action_dim(&self) -> usize;

    /// Every action component lies in `[-max_action, max_action]`
    fn max_action(&self) -> f32;
}

/// Named scalar values collected over a run (e.g. evaluation results)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    values: BTreeMap<String, f64>,
}

impl Report {
    /// Create a report with every key initialised to zero
    pub fn new(keys: Vec<&str>) -> Self {
        Self {
            values: keys.into_iter().map(|k| (k.to_string(), 0.0)).collect(),
        }
    }

    pub fn entry(&mut self, key: &str) -> std::collections::btree_map::Entry<'_, String, f64> {
        self.values.entry(key.to_string())
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
