// Offline training on a random-policy Pendulum dataset.
// The agent never acts in the environment while training; Pendulum is only used to
// collect the dataset up front and for the periodic evaluation rollouts.

use std::path::PathBuf;

use burn::backend::{Autodiff, NdArray};
use once_cell::sync::Lazy;
use offline_rl::{
    algo::bear::{BearAgent, BearAgentConfig, KernelType},
    dataset::{OfflineBuffer, OfflineDataset},
    env::ContinuousActionSpace,
    gym::Pendulum,
    metrics::{ConsoleLogger, CsvLogger, MultiLogger},
    nn::{CvaeConfig, MlpCritic, SquashedGaussianPolicyConfig},
};

type BearBackend = Autodiff<NdArray>;

static DEVICE: Lazy<<NdArray as burn::prelude::Backend>::Device> = Lazy::new(Default::default);

const DATASET_SIZE: usize = 50_000;
const MAX_STEPS_PER_EPISODE: usize = 200;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut env = Pendulum::with_seed(MAX_STEPS_PER_EPISODE, 0);

    let obs_dim = env.observation_dim();
    let action_dim = env.action_dim();
    let max_torque = env.max_action();

    let mut dataset = OfflineBuffer::with_seed(256, 0);
    dataset.collect(&mut env, DATASET_SIZE);
    println!("Collected {} random transitions", dataset.len());

    let policy = SquashedGaussianPolicyConfig::new(obs_dim, action_dim, vec![256, 256])
        .with_max_action(max_torque)
        .init::<BearBackend>(&*DEVICE);
    let critic1 = MlpCritic::new(obs_dim, action_dim, vec![256, 256], &*DEVICE);
    let critic2 = MlpCritic::new(obs_dim, action_dim, vec![256, 256], &*DEVICE);
    let behavior = CvaeConfig::new(obs_dim, action_dim, 2 * action_dim, vec![750, 750])
        .with_max_action(max_torque)
        .init::<BearBackend>(&*DEVICE);

    let result_dir = PathBuf::from("results/bear_pendulum");
    let config = BearAgentConfig {
        mmd_sigma: 10.0,
        kernel_type: KernelType::Laplacian,
        warmup_step: 5_000,
        max_train_step: 50_000,
        log_interval: 1_000,
        eval_freq: 5_000,
        auto_entropy_tuning: true,
        result_dir: Some(result_dir.clone()),
        resume: std::env::args().any(|arg| arg == "--resume"),
        ..Default::default()
    };

    std::fs::create_dir_all(&result_dir)?;
    let mut logger = MultiLogger::new()
        .add(ConsoleLogger)
        .add(CsvLogger::new(result_dir.join("metrics.csv"))?);

    let mut agent = BearAgent::new(policy, critic1, critic2, behavior, action_dim, config, DEVICE.clone());

    println!("Starting BEAR training on the Pendulum dataset...");
    let metrics = agent.learn(&mut dataset, &mut env, &mut logger)?;

    println!("Training complete!");
    println!(
        "  - final alpha_prime: {:.4}, temperature: {:.4}, support distance: {:.4}",
        metrics.alpha_prime, metrics.temperature, metrics.support_distance
    );
    Ok(())
}
