use burn::tensor::backend::AutodiffBackend;

use super::{
    agent::BearAgent,
    model::{BearCriticModel, BearPolicyModel, BehaviorModel},
};
use crate::{
    checkpoint::{CheckpointError, Checkpointer, CheckpointerConfig},
    dataset::OfflineDataset,
    env::Environment,
    error::BearError,
    eval::evaluate,
    metrics::MetricsLogger,
    traits::{OfflineAgent, TrainingMetrics},
};

const CHECKPOINT_DIR: &str = "checkpoints";
const CONFIG_FILE: &str = "config.json";

impl<B, P, C, V> BearAgent<B, P, C, V>
where
    B: AutodiffBackend,
    P: BearPolicyModel<B>,
    C: BearCriticModel<B>,
    V: BehaviorModel<B>,
{
    /// Train until `max_train_step`
    ///
    /// With a `result_dir`, the config is written next to the run and checkpoints go to
    /// `<result_dir>/checkpoints`. With `resume`, the latest checkpoint there is
    /// restored first; without it, checkpoints of an earlier run are removed. After every step whose counter is a multiple of `eval_freq`
    /// the agent is evaluated on `eval_env`; on multiples of `log_interval` a checkpoint
    /// is saved and the training scalars are logged.
    ///
    /// Returns the metrics of the last step (default metrics if no step ran).
    pub fn learn<D, E, L>(
        &mut self,
        dataset: &mut D,
        eval_env: &mut E,
        logger: &mut L,
    ) -> Result<TrainingMetrics, BearError>
    where
        D: OfflineDataset + ?Sized,
        E: Environment,
        E::State: Into<Vec<f32>>,
        E::Action: TryFrom<Vec<f32>>,
        L: MetricsLogger + ?Sized,
    {
        let checkpointer = self.prepare_result_dir()?;
        if self.config().resume {
            self.resume(checkpointer.as_ref())?;
        }

        let log_interval = self.config().log_interval;
        let eval_freq = self.config().eval_freq;
        let eval_episodes = self.config().eval_episodes;
        let mut metrics = TrainingMetrics::default();

        while self.train_steps() < self.config().max_train_step {
            metrics = OfflineAgent::train_step(self, dataset.sample());
            let step = self.train_steps();

            if eval_freq > 0 && step % eval_freq == 0 {
                let report = evaluate(&*self, eval_env, eval_episodes)?;
                let scalars: Vec<(&str, f32)> = report.iter().map(|(k, v)| (k, v as f32)).collect();
                logger.log_scalars(step, &scalars);
            }

            if let Some(checkpointer) = checkpointer.as_ref().filter(|c| c.should_save(step)) {
                self.save_checkpoint(checkpointer)?;
            }
            if log_interval > 0 && step % log_interval == 0 {
                logger.log_scalars(step, &metrics.scalars());
            }
        }

        logger.flush()?;
        Ok(metrics)
    }

    fn prepare_result_dir(&self) -> Result<Option<Checkpointer>, BearError> {
        let Some(result_dir) = &self.config().result_dir else {
            return Ok(None);
        };

        std::fs::create_dir_all(result_dir)?;
        self.config().save_json(result_dir.join(CONFIG_FILE))?;

        let checkpointer = Checkpointer::new(
            CheckpointerConfig::new(result_dir.join(CHECKPOINT_DIR))
                .with_save_interval(self.config().log_interval)
                .with_keep_last_n(self.config().keep_last_checkpoints),
        )?;

        if !self.config().resume {
            let removed = checkpointer.clear()?;
            if removed > 0 {
                log::info!(
                    "fresh run: removed {removed} checkpoint(s) from {}",
                    checkpointer.config().checkpoint_dir.display()
                );
            }
        }
        Ok(Some(checkpointer))
    }

    fn resume(&mut self, checkpointer: Option<&Checkpointer>) -> Result<(), BearError> {
        let Some(checkpointer) = checkpointer else {
            log::warn!("resume requested without a result_dir, starting from scratch");
            return Ok(());
        };

        match checkpointer.latest() {
            Ok(latest) => Ok(self.load_checkpoint(&latest.path)?),
            Err(CheckpointError::NoCheckpoint(dir)) => {
                log::warn!("no checkpoint to resume from in {}, starting from scratch", dir.display());
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
