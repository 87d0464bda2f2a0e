use std::path::{Path, PathBuf};

use burn::{
    nn::loss::{MseLoss, Reduction},
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};

use super::{
    config::{BearAgentConfig, BearOptimizer},
    mmd::mmd_distance,
    model::{BearCriticModel, BearPolicyModel, BehaviorModel},
    multiplier::{SupportDistance, SupportMultiplier, Temperature},
    target::{bootstrap_target, max_over_target_samples, repeat_interleave_rows, TargetCritics},
};
use crate::{
    checkpoint::{CheckpointDir, CheckpointError, CheckpointMeta, Checkpointer},
    dataset::TransitionBatch,
    traits::{BoolToTensor, OfflineAgent, ToTensor, TrainingMetrics},
};

const POLICY: &str = "policy";
const POLICY_OPTIMIZER: &str = "policy_optim";
const CRITIC1: &str = "critic1";
const CRITIC1_OPTIMIZER: &str = "critic1_optim";
const CRITIC2: &str = "critic2";
const CRITIC2_OPTIMIZER: &str = "critic2_optim";
const BEHAVIOR: &str = "behavior";
const BEHAVIOR_OPTIMIZER: &str = "behavior_optim";

/// A Bootstrapping Error Accumulation Reduction (BEAR) agent
///
/// BEAR is an offline actor-critic: it never interacts with an environment while
/// training, only with minibatches of a fixed dataset. To keep the policy from
/// exploiting Q-value errors on actions the dataset never contains, the policy's
/// samples are held within the *support* of a learned behavior model, measured by MMD
/// and weighted by a Lagrange multiplier (`alpha_prime`).
///
/// ### Features
/// - Conditional VAE behavior model trained alongside the agent
/// - Soft-clipped double-Q target, maximised over several policy proposals
/// - Dual-gradient tuning of the support constraint weight, clamped in log space
/// - Warm-up phase of pure support matching before the Q-value term is used
/// - Optional automatic entropy temperature tuning
///
/// ### Generics
/// - `B` - A burn autodiff backend
/// - `P` - Policy network implementing [`BearPolicyModel`]
/// - `C` - Critic network implementing [`BearCriticModel`]
/// - `V` - Behavior model implementing [`BehaviorModel`]
pub struct BearAgent<B, P, C, V>
where
    B: AutodiffBackend,
    P: BearPolicyModel<B>,
    C: BearCriticModel<B>,
    V: BehaviorModel<B>,
{
    // Networks
    policy: P,
    critic1: C,
    critic2: C,
    targets: TargetCritics<C>,
    behavior: V,

    // Optimizers
    policy_optimizer: BearOptimizer<P, B>,
    critic1_optimizer: BearOptimizer<C, B>,
    critic2_optimizer: BearOptimizer<C, B>,
    behavior_optimizer: BearOptimizer<V, B>,

    // Multipliers
    support_multiplier: SupportMultiplier<B>,
    temperature: Temperature<B>,

    config: BearAgentConfig,
    action_dim: usize,
    device: B::Device,
    train_step: usize,
}

impl<B, P, C, V> BearAgent<B, P, C, V>
where
    B: AutodiffBackend,
    P: BearPolicyModel<B>,
    C: BearCriticModel<B>,
    V: BehaviorModel<B>,
{
    /// Create a new BEAR agent
    ///
    /// The target critics are snapshots of `critic1` and `critic2` taken here.
    ///
    /// # Arguments
    /// - `policy` - The stochastic policy
    /// - `critic1` - The first critic network
    /// - `critic2` - The second critic network
    /// - `behavior` - The behavior model fitted to the dataset's actions
    /// - `action_dim` - Dimension of the action space
    /// - `config` - Configuration for the agent
    /// - `device` - The device to run computations on
    pub fn new(
        policy: P,
        critic1: C,
        critic2: C,
        behavior: V,
        action_dim: usize,
        config: BearAgentConfig,
        device: B::Device,
    ) -> Self {
        let targets = TargetCritics::snapshot(&critic1, &critic2);

        Self {
            policy,
            critic1,
            critic2,
            targets,
            behavior,
            policy_optimizer: config.optimizer(),
            critic1_optimizer: config.optimizer(),
            critic2_optimizer: config.optimizer(),
            behavior_optimizer: config.optimizer(),
            support_multiplier: SupportMultiplier::new(&config, &device),
            temperature: Temperature::new(&config, action_dim, &device),
            config,
            action_dim,
            device,
            train_step: 0,
        }
    }

    pub fn config(&self) -> &BearAgentConfig {
        &self.config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn critics(&self) -> (&C, &C) {
        (&self.critic1, &self.critic2)
    }

    pub fn target_critics(&self) -> &TargetCritics<C> {
        &self.targets
    }

    pub fn behavior(&self) -> &V {
        &self.behavior
    }

    /// Current `exp(log_alpha_prime)`
    pub fn alpha_prime(&self) -> f32 {
        self.support_multiplier.value()
    }

    pub fn log_alpha_prime(&self) -> f32 {
        self.support_multiplier.log_value()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.value()
    }

    /// Fit the behavior model to the batch's actions
    fn update_behavior(&mut self, observations: Tensor<B, 2>, actions: Tensor<B, 2>) -> f32 {
        let output = self.behavior.forward(observations, actions.clone());
        let loss = self.behavior.loss(output, actions);
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let grads = GradientsParams::from_grads(loss.backward(), &self.behavior);
        self.behavior = self
            .behavior_optimizer
            .step(self.config.lr_behavior, self.behavior.clone(), grads);

        loss_value
    }

    /// Bootstrapped target `r + γ(1 − done)·max_k Q̃(s′, a′_k)`
    ///
    /// Each next observation is repeated `n_target_samples` times, each copy gets its own
    /// policy action, and the soft-clipped target value is maximised per observation.
    fn critic_target(&self, rewards: Tensor<B, 2>, done: Tensor<B, 2>, next_observations: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, _] = next_observations.dims();
        let n = self.config.n_target_samples;

        let repeated = repeat_interleave_rows(next_observations, n);
        let (next_actions, _, _) = self.policy.sample_action(repeated.clone());
        let target_q = self
            .targets
            .value(repeated, next_actions.detach(), self.config.lambda);
        let max_target_q = max_over_target_samples(target_q, batch_size, n);

        bootstrap_target(rewards, done, max_target_q, self.config.gamma).detach()
    }

    /// Regress both critics to the same target
    fn update_critics(&mut self, observations: Tensor<B, 2>, actions: Tensor<B, 2>, td_target: Tensor<B, 2>) -> (f32, f32) {
        let q1_pred = self.critic1.forward(observations.clone(), actions.clone());
        let q2_pred = self.critic2.forward(observations, actions);

        let loss1 = MseLoss::new().forward(q1_pred, td_target.clone(), Reduction::Mean);
        let loss2 = MseLoss::new().forward(q2_pred, td_target, Reduction::Mean);
        let losses = (
            loss1.clone().into_scalar().elem::<f32>(),
            loss2.clone().into_scalar().elem::<f32>(),
        );

        let grads1 = GradientsParams::from_grads(loss1.backward(), &self.critic1);
        self.critic1 = self
            .critic1_optimizer
            .step(self.config.lr_critic, self.critic1.clone(), grads1);

        let grads2 = GradientsParams::from_grads(loss2.backward(), &self.critic2);
        self.critic2 = self
            .critic2_optimizer
            .step(self.config.lr_critic, self.critic2.clone(), grads2);

        losses
    }

    /// MMD between behavior-model samples and policy samples (both pre-squash)
    ///
    /// Only the policy side carries a graph.
    fn support_distance(&self, observations: Tensor<B, 2>) -> SupportDistance<B> {
        let n = self.config.n_mmd_action_samples;

        let behavior_actions = self
            .behavior
            .decode_multiple_without_squash(observations.clone(), n)
            .detach();
        let policy_actions = self.policy.sample_multiple_without_squash(observations, n);

        SupportDistance::new(mmd_distance(
            behavior_actions,
            policy_actions,
            self.config.kernel_type,
            self.config.mmd_sigma,
        ))
    }

    /// One policy step on the support penalty, plus the actor-critic term after warm-up
    ///
    /// Returns the actor-critic term (reported whether or not it was applied) and the
    /// log-probabilities of the fresh policy sample.
    fn update_policy(&mut self, observations: Tensor<B, 2>, support: SupportDistance<B>) -> (f32, Tensor<B, 2>) {
        let (actions, log_prob, _) = self.policy.sample_action(observations.clone());
        let q1 = self.critic1.forward(observations.clone(), actions.clone());
        let q2 = self.critic2.forward(observations, actions);

        let value_term = log_prob
            .clone()
            .mul_scalar(self.temperature.value())
            .sub(q1.min_pair(q2))
            .mean();
        let policy_loss = value_term.clone().into_scalar().elem::<f32>();

        let penalty = support.into_penalty(self.support_multiplier.value());
        let apply_value_term = self.train_step > self.config.warmup_step;
        if self.train_step == self.config.warmup_step + 1 {
            log::info!("warm-up finished at step {}, value term enabled", self.train_step);
        }

        let loss = compose_policy_loss(value_term, penalty, apply_value_term);
        let grads = GradientsParams::from_grads(loss.backward(), &self.policy);
        self.policy = self
            .policy_optimizer
            .step(self.config.lr_policy, self.policy.clone(), grads);

        (policy_loss, log_prob)
    }

    /// Greedy action: the best of `n_action_samples` policy samples under critic 1
    pub fn act(&self, observation: &[f32]) -> Vec<f32> {
        let n = self.config.n_action_samples;
        let observation: Tensor<B, 2> = vec![observation.to_vec()].to_tensor(&self.device);
        let repeated = observation.repeat_dim(0, n);

        let (candidates, _, _) = self.policy.sample_action(repeated.clone());
        let q1 = self.critic1.forward(repeated, candidates.clone());

        best_candidate(candidates, q1)
            .detach()
            .into_data()
            .iter::<f32>()
            .collect()
    }

    /// Write every learnable, every optimizer state and the step counter into `dir`
    ///
    /// Temperature records are written only when the temperature is adaptive.
    pub fn save_to(&self, dir: &CheckpointDir) -> Result<(), CheckpointError> {
        dir.save_module(POLICY, &self.policy)?;
        dir.save_optimizer(POLICY_OPTIMIZER, &self.policy_optimizer)?;
        dir.save_module(CRITIC1, &self.critic1)?;
        dir.save_optimizer(CRITIC1_OPTIMIZER, &self.critic1_optimizer)?;
        dir.save_module(CRITIC2, &self.critic2)?;
        dir.save_optimizer(CRITIC2_OPTIMIZER, &self.critic2_optimizer)?;
        let [target1, target2] = TargetCritics::<C>::RECORDS;
        dir.save_module(target1, &self.targets.critic1)?;
        dir.save_module(target2, &self.targets.critic2)?;
        dir.save_module(BEHAVIOR, &self.behavior)?;
        dir.save_optimizer(BEHAVIOR_OPTIMIZER, &self.behavior_optimizer)?;
        self.support_multiplier.save_to(dir)?;
        self.temperature.save_to(dir)?;

        dir.write_meta(&CheckpointMeta {
            train_step: self.train_step,
            auto_entropy_tuning: self.temperature.is_adaptive(),
        })
    }

    /// Restore the agent from `dir`, all or nothing
    ///
    /// Every record is read before anything is replaced, so on error the agent is left
    /// exactly as it was.
    pub fn load_from(&mut self, dir: &CheckpointDir) -> Result<(), CheckpointError> {
        let meta = dir.read_meta()?;
        if meta.auto_entropy_tuning != self.temperature.is_adaptive() {
            return Err(CheckpointError::FlagMismatch {
                saved: meta.auto_entropy_tuning,
                configured: self.temperature.is_adaptive(),
            });
        }

        let mut required = vec![
            POLICY,
            POLICY_OPTIMIZER,
            CRITIC1,
            CRITIC1_OPTIMIZER,
            CRITIC2,
            CRITIC2_OPTIMIZER,
            BEHAVIOR,
            BEHAVIOR_OPTIMIZER,
            SupportMultiplier::<B>::RECORD,
            SupportMultiplier::<B>::OPTIMIZER_RECORD,
        ];
        required.extend(TargetCritics::<C>::RECORDS);
        if self.temperature.is_adaptive() {
            required.extend([Temperature::<B>::RECORD, Temperature::<B>::OPTIMIZER_RECORD]);
        }
        dir.require(&required)?;

        let device = &self.device;
        let [target1, target2] = TargetCritics::<C>::RECORDS;

        let policy = dir.load_module(POLICY, self.policy.clone(), device)?;
        let policy_optimizer = dir.load_optimizer(POLICY_OPTIMIZER, self.config.optimizer(), device)?;
        let critic1 = dir.load_module(CRITIC1, self.critic1.clone(), device)?;
        let critic1_optimizer = dir.load_optimizer(CRITIC1_OPTIMIZER, self.config.optimizer(), device)?;
        let critic2 = dir.load_module(CRITIC2, self.critic2.clone(), device)?;
        let critic2_optimizer = dir.load_optimizer(CRITIC2_OPTIMIZER, self.config.optimizer(), device)?;
        let targets = TargetCritics {
            critic1: dir.load_module(target1, self.targets.critic1.clone(), device)?,
            critic2: dir.load_module(target2, self.targets.critic2.clone(), device)?,
        };
        let behavior = dir.load_module(BEHAVIOR, self.behavior.clone(), device)?;
        let behavior_optimizer = dir.load_optimizer(BEHAVIOR_OPTIMIZER, self.config.optimizer(), device)?;
        let multiplier_parts = self.support_multiplier.load_parts(dir, &self.config, device)?;
        let temperature = self.temperature.load_from(dir, &self.config, device)?;

        self.policy = policy;
        self.policy_optimizer = policy_optimizer;
        self.critic1 = critic1;
        self.critic1_optimizer = critic1_optimizer;
        self.critic2 = critic2;
        self.critic2_optimizer = critic2_optimizer;
        self.targets = targets;
        self.behavior = behavior;
        self.behavior_optimizer = behavior_optimizer;
        self.support_multiplier.restore(multiplier_parts);
        self.temperature = temperature;
        self.train_step = meta.train_step;

        log::info!("loaded checkpoint {} at step {}", dir.path().display(), self.train_step);
        Ok(())
    }

    /// Save into `checkpointer` under the current step
    pub fn save_checkpoint(&self, checkpointer: &Checkpointer) -> Result<PathBuf, CheckpointError> {
        checkpointer.save(self.train_step, |dir| self.save_to(dir))
    }

    /// Restore from the checkpoint directory at `path`
    pub fn load_checkpoint(&mut self, path: impl AsRef<Path>) -> Result<(), CheckpointError> {
        let dir = CheckpointDir::open(path.as_ref())?;
        self.load_from(&dir)
    }
}

/// The objective actually differentiated by the policy update
///
/// The support penalty always applies; the actor-critic term joins it once warm-up is
/// over.
/// The row of `candidates` (`[n, action_dim]`) whose value (`[n, 1]`) is highest
fn best_candidate<B: Backend>(candidates: Tensor<B, 2>, values: Tensor<B, 2>) -> Tensor<B, 2> {
    let [n, _] = values.dims();
    candidates.select(0, values.reshape([n]).argmax(0))
}

pub fn compose_policy_loss<B: Backend>(
    value_term: Tensor<B, 1>,
    support_penalty: Tensor<B, 1>,
    apply_value_term: bool,
) -> Tensor<B, 1> {
    if apply_value_term {
        value_term + support_penalty
    } else {
        support_penalty
    }
}

impl<B, P, C, V> OfflineAgent for BearAgent<B, P, C, V>
where
    B: AutodiffBackend,
    P: BearPolicyModel<B>,
    C: BearCriticModel<B>,
    V: BehaviorModel<B>,
{
    /// Behavior model, critics, `alpha_prime`, policy, temperature, then target sync
    fn train_step(&mut self, batch: TransitionBatch) -> TrainingMetrics {
        let observations: Tensor<B, 2> = batch.observations.to_tensor(&self.device);
        let actions: Tensor<B, 2> = batch.actions.to_tensor(&self.device);
        let rewards: Tensor<B, 1> = batch.rewards.to_tensor(&self.device);
        let done_mask: Tensor<B, 1> = batch.dones.to_float_mask(&self.device);
        let next_observations: Tensor<B, 2> = batch.next_observations.to_tensor(&self.device);

        let behavior_loss = self.update_behavior(observations.clone(), actions.clone());

        let td_target = self.critic_target(
            rewards.unsqueeze_dim(1),
            done_mask.unsqueeze_dim(1),
            next_observations,
        );
        let (critic1_loss, critic2_loss) = self.update_critics(observations.clone(), actions, td_target);

        let support = self.support_distance(observations.clone());
        let support_distance = support.mean();
        let alpha_prime_loss = self.support_multiplier.update(&support);

        let (policy_loss, log_prob) = self.update_policy(observations, support);
        let temperature_loss = self.temperature.update(log_prob);

        self.targets = self
            .targets
            .clone()
            .soft_update(&self.critic1, &self.critic2, self.config.tau);

        self.train_step += 1;

        TrainingMetrics {
            critic1_loss,
            critic2_loss,
            policy_loss,
            temperature_loss,
            alpha_prime_loss,
            behavior_loss,
            support_distance,
            alpha_prime: self.support_multiplier.value(),
            temperature: self.temperature.value(),
        }
    }

    fn select_action(&self, observation: &[f32]) -> Vec<f32> {
        self.act(observation)
    }

    fn train_steps(&self) -> usize {
        self.train_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{OfflineBuffer, OfflineDataset, Transition};
    use crate::nn::mlp::soft_update_tensor;
    use crate::nn::{Cvae, CvaeConfig, MlpCritic, SquashedGaussianPolicy, SquashedGaussianPolicyConfig};
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use burn::module::Param;
    use tempfile::tempdir;

    type TestBackend = Autodiff<NdArray>;
    type TestAgent = BearAgent<TestBackend, SquashedGaussianPolicy<TestBackend>, MlpCritic<TestBackend>, Cvae<TestBackend>>;

    const OBS_DIM: usize = 2;
    const ACTION_DIM: usize = 1;

    fn test_config() -> BearAgentConfig {
        BearAgentConfig {
            n_action_samples: 5,
            n_target_samples: 3,
            n_mmd_action_samples: 4,
            warmup_step: 2,
            ..Default::default()
        }
    }

    fn agent(config: BearAgentConfig) -> TestAgent {
        let device = NdArrayDevice::default();
        let policy = SquashedGaussianPolicyConfig::new(OBS_DIM, ACTION_DIM, vec![16]).init(&device);
        let critic1 = MlpCritic::new(OBS_DIM, ACTION_DIM, vec![16], &device);
        let critic2 = MlpCritic::new(OBS_DIM, ACTION_DIM, vec![16], &device);
        let behavior = CvaeConfig::new(OBS_DIM, ACTION_DIM, 2, vec![16]).init(&device);

        BearAgent::new(policy, critic1, critic2, behavior, ACTION_DIM, config, device)
    }

    fn dataset() -> OfflineBuffer {
        let mut buffer = OfflineBuffer::with_seed(8, 3);
        for i in 0..32 {
            let x = i as f32 / 32.0;
            buffer.push(Transition {
                observation: vec![x, -x],
                action: vec![(x - 0.5).tanh()],
                reward: x,
                next_observation: vec![x + 0.03, -x - 0.03],
                done: i % 8 == 7,
            });
        }
        buffer
    }

    fn all_params(agent: &TestAgent) -> Vec<u32> {
        let (critic1, critic2) = agent.critics();
        let targets = agent.target_critics();
        [
            agent.policy().flat_params(),
            critic1.flat_params(),
            critic2.flat_params(),
            targets.critic1.flat_params(),
            targets.critic2.flat_params(),
            agent.behavior().flat_params(),
            vec![agent.log_alpha_prime(), agent.temperature().ln()],
        ]
        .concat()
        .into_iter()
        .map(f32::to_bits)
        .collect()
    }

    #[test]
    fn warm_up_keeps_the_value_term_out_of_the_gradient() {
        let device = NdArrayDevice::default();
        let value_param = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0], &device).require_grad();
        let penalty_param = Tensor::<TestBackend, 1>::from_floats([0.5], &device).require_grad();

        let value_term = || value_param.clone().mul_scalar(2.0).mean();
        let penalty = || penalty_param.clone().mul_scalar(3.0).mean();

        let grads = compose_policy_loss(value_term(), penalty(), false).backward();
        assert!(value_param.grad(&grads).is_none());
        assert!(penalty_param.grad(&grads).is_some());

        let grads = compose_policy_loss(value_term(), penalty(), true).backward();
        assert!(value_param.grad(&grads).is_some());
        assert!(penalty_param.grad(&grads).is_some());
    }

    #[test]
    fn train_step_advances_counter_and_reports_finite_losses() {
        let mut agent = agent(test_config());
        let mut data = dataset();

        for step in 1..=5 {
            let metrics = agent.train_step(data.sample());
            assert!(metrics.is_finite(), "non-finite metrics at step {step}: {metrics:?}");
            assert_eq!(agent.train_steps(), step);
        }
        assert_eq!(agent.temperature(), 0.5);
    }

    #[test]
    fn targets_follow_the_online_critics_slowly() {
        let mut agent = agent(test_config());
        let target_before = agent.target_critics().critic1.flat_params();
        assert_eq!(target_before, agent.critics().0.flat_params());

        agent.train_step(dataset().sample());

        let target_after = agent.target_critics().critic1.flat_params();
        let online_after = agent.critics().0.flat_params();
        assert_ne!(target_after, target_before);
        assert_ne!(target_after, online_after);
    }

    #[test]
    fn selected_action_has_action_dim_and_is_bounded() {
        let agent = agent(test_config());
        let action = agent.select_action(&[0.1, -0.2]);

        assert_eq!(action.len(), ACTION_DIM);
        assert!(action.iter().all(|a| (-1.0..=1.0).contains(a)));
    }

    #[test]
    fn best_candidate_is_the_highest_valued_row() {
        let device = NdArrayDevice::default();
        let candidates = Tensor::<NdArray, 2>::from_floats([[0.1, 0.2], [-0.7, 0.9], [0.4, -0.3]], &device);
        let values = Tensor::<NdArray, 2>::from_floats([[1.0], [3.5], [-2.0]], &device);

        let best: Vec<f32> = best_candidate(candidates, values).into_data().iter::<f32>().collect();

        assert_eq!(best, vec![-0.7, 0.9]);
    }

    /// `Q(s, a) = weight · Σa`, so the ranking of candidates is known
    #[derive(Module, Debug)]
    struct LinearActionCritic<B: Backend> {
        weight: Param<Tensor<B, 1>>,
    }

    impl<B: Backend> LinearActionCritic<B> {
        fn new(weight: f32, device: &B::Device) -> Self {
            Self {
                weight: Param::from_tensor(Tensor::from_floats([weight], device)),
            }
        }
    }

    impl<B: AutodiffBackend> BearCriticModel<B> for LinearActionCritic<B> {
        fn forward(&self, _observation: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 2> {
            action.sum_dim(1) * self.weight.val().unsqueeze::<2>()
        }

        fn soft_update(self, online: &Self, tau: f32) -> Self {
            Self {
                weight: soft_update_tensor(self.weight, &online.weight, tau),
            }
        }
    }

    fn act_with_critic_weight(weight: f32) -> f32 {
        let device = NdArrayDevice::default();
        let policy = SquashedGaussianPolicyConfig::new(OBS_DIM, ACTION_DIM, vec![16]).init(&device);
        let behavior = CvaeConfig::new(OBS_DIM, ACTION_DIM, 2, vec![16]).init(&device);
        let config = BearAgentConfig {
            n_action_samples: 64,
            ..test_config()
        };
        let agent: BearAgent<TestBackend, _, _, Cvae<TestBackend>> = BearAgent::new(
            policy,
            LinearActionCritic::new(weight, &device),
            LinearActionCritic::new(weight, &device),
            behavior,
            ACTION_DIM,
            config,
            device,
        );

        agent.select_action(&[0.1, -0.2])[0]
    }

    #[test]
    fn action_selection_follows_critic_one() {
        // the largest of 64 samples against the smallest of another 64
        let highest = act_with_critic_weight(1.0);
        let lowest = act_with_critic_weight(-1.0);

        assert!(highest > lowest, "highest {highest} should exceed lowest {lowest}");
    }

    #[test]
    fn checkpoint_round_trip_is_bit_identical() {
        let dir = tempdir().unwrap();
        let config = BearAgentConfig {
            auto_entropy_tuning: true,
            ..test_config()
        };

        let mut trained = agent(config.clone());
        let mut data = dataset();
        for _ in 0..3 {
            trained.train_step(data.sample());
        }
        let checkpoint = CheckpointDir::create(dir.path().join("ckpt")).unwrap();
        trained.save_to(&checkpoint).unwrap();

        let mut restored = agent(config);
        assert_ne!(all_params(&restored), all_params(&trained));
        restored.load_from(&checkpoint).unwrap();

        assert_eq!(restored.train_steps(), 3);
        assert_eq!(all_params(&restored), all_params(&trained));
    }

    #[test]
    fn temperature_flag_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let checkpoint = CheckpointDir::create(dir.path()).unwrap();
        agent(test_config()).save_to(&checkpoint).unwrap();

        let mut adaptive = agent(BearAgentConfig {
            auto_entropy_tuning: true,
            ..test_config()
        });
        let before = all_params(&adaptive);

        match adaptive.load_from(&checkpoint) {
            Err(CheckpointError::FlagMismatch { saved, configured }) => {
                assert!(!saved);
                assert!(configured);
            }
            other => panic!("expected a flag mismatch, got {other:?}"),
        }
        assert_eq!(all_params(&adaptive), before);
    }

    #[test]
    fn missing_component_fails_without_partial_load() {
        let dir = tempdir().unwrap();
        let checkpoint = CheckpointDir::create(dir.path()).unwrap();
        let mut trained = agent(test_config());
        trained.train_step(dataset().sample());
        trained.save_to(&checkpoint).unwrap();
        std::fs::remove_file(dir.path().join("critic2_optim.bin")).unwrap();

        let mut fresh = agent(test_config());
        let before = all_params(&fresh);

        assert!(matches!(
            fresh.load_from(&checkpoint),
            Err(CheckpointError::MissingComponent { ref component, .. }) if component == "critic2_optim"
        ));
        assert_eq!(all_params(&fresh), before);
        assert_eq!(fresh.train_steps(), 0);
    }
}
