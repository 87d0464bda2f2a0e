//! Checkpoint records on disk.
//!
//! A checkpoint is a directory `checkpoint_<step:08>/` holding one burn binary record
//! per component (modules and optimizer states) and a `meta.json` with the step
//! counter and feature flags. [`Checkpointer`] writes each checkpoint into a temporary
//! directory and renames it into place, so a checkpoint directory is either complete
//! or absent.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use burn::{
    module::{AutodiffModule, Module},
    optim::Optimizer,
    record::{BinFileRecorder, FullPrecisionSettings, Record, Recorder, RecorderError},
    tensor::backend::{AutodiffBackend, Backend},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CHECKPOINT_PREFIX: &str = "checkpoint_";
const TMP_PREFIX: &str = ".tmp_checkpoint_";
const META_FILE: &str = "meta.json";
const RECORD_EXTENSION: &str = "bin";

type CheckpointRecorder = BinFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("recorder error: {0}")]
    Recorder(String),

    #[error("invalid checkpoint metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("checkpoint {dir} has no `{component}` record")]
    MissingComponent { dir: PathBuf, component: String },

    #[error("checkpoint was saved with auto_entropy_tuning={saved}, the agent is configured with {configured}")]
    FlagMismatch { saved: bool, configured: bool },

    #[error("no checkpoint found in {0}")]
    NoCheckpoint(PathBuf),
}

impl From<RecorderError> for CheckpointError {
    fn from(err: RecorderError) -> Self {
        CheckpointError::Recorder(err.to_string())
    }
}

/// Contents of `meta.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub train_step: usize,
    /// Whether the temperature records are part of the checkpoint
    pub auto_entropy_tuning: bool,
}

/// One checkpoint directory
#[derive(Debug, Clone)]
pub struct CheckpointDir {
    path: PathBuf,
}

impl CheckpointDir {
    /// Create the directory (and parents) for writing
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Open an existing checkpoint directory for reading
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(CheckpointError::NoCheckpoint(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record path without extension; the recorder appends `.bin`
    fn component_path(&self, component: &str) -> PathBuf {
        self.path.join(component)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.component_path(component)
            .with_extension(RECORD_EXTENSION)
            .is_file()
    }

    /// Fail with [`CheckpointError::MissingComponent`] on the first absent record
    pub fn require(&self, components: &[&str]) -> Result<(), CheckpointError> {
        match components.iter().find(|c| !self.contains(c)) {
            Some(component) => Err(CheckpointError::MissingComponent {
                dir: self.path.clone(),
                component: component.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn save_module<B: Backend, M: Module<B>>(
        &self,
        component: &str,
        module: &M,
    ) -> Result<(), CheckpointError> {
        module
            .clone()
            .save_file(self.component_path(component), &CheckpointRecorder::new())?;
        Ok(())
    }

    /// Load a record into `template`, whose structure must match the saved module
    pub fn load_module<B: Backend, M: Module<B>>(
        &self,
        component: &str,
        template: M,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        self.require(&[component])?;
        Ok(template.load_file(self.component_path(component), &CheckpointRecorder::new(), device)?)
    }

    pub fn save_record<B: Backend, R: Record<B>>(
        &self,
        component: &str,
        record: R,
    ) -> Result<(), CheckpointError> {
        Recorder::<B>::record(&CheckpointRecorder::new(), record, self.component_path(component))?;
        Ok(())
    }

    pub fn load_record<B: Backend, R: Record<B>>(
        &self,
        component: &str,
        device: &B::Device,
    ) -> Result<R, CheckpointError> {
        self.require(&[component])?;
        Ok(Recorder::<B>::load(
            &CheckpointRecorder::new(),
            self.component_path(component),
            device,
        )?)
    }

    pub fn save_optimizer<B, M, O>(&self, component: &str, optimizer: &O) -> Result<(), CheckpointError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        self.save_record::<B, _>(component, optimizer.to_record())
    }

    /// Restore saved state into a fresh `optimizer`
    pub fn load_optimizer<B, M, O>(
        &self,
        component: &str,
        optimizer: O,
        device: &B::Device,
    ) -> Result<O, CheckpointError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let record = self.load_record::<B, O::Record>(component, device)?;
        Ok(optimizer.load_record(record))
    }

    pub fn write_meta(&self, meta: &CheckpointMeta) -> Result<(), CheckpointError> {
        fs::write(self.path.join(META_FILE), serde_json::to_string_pretty(meta)?)?;
        Ok(())
    }

    pub fn read_meta(&self) -> Result<CheckpointMeta, CheckpointError> {
        let path = self.path.join(META_FILE);
        if !path.is_file() {
            return Err(CheckpointError::MissingComponent {
                dir: self.path.clone(),
                component: META_FILE.to_string(),
            });
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

/// Configuration for the [`Checkpointer`]
#[derive(Debug, Clone)]
pub struct CheckpointerConfig {
    /// Directory holding the `checkpoint_*` directories
    pub checkpoint_dir: PathBuf,
    /// Steps between saves
    pub save_interval: usize,
    /// Number of recent checkpoints to keep (0 = keep all)
    pub keep_last_n: usize,
}

impl CheckpointerConfig {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            save_interval: 1000,
            keep_last_n: 5,
        }
    }

    pub fn with_save_interval(mut self, interval: usize) -> Self {
        self.save_interval = interval;
        self
    }

    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }
}

/// A saved checkpoint found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointInfo {
    pub path: PathBuf,
    pub step: usize,
}

/// Writes, lists and prunes checkpoint directories
#[derive(Debug, Clone)]
pub struct Checkpointer {
    config: CheckpointerConfig,
}

impl Checkpointer {
    /// Creates the checkpoint directory if it doesn't exist.
    pub fn new(config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    pub fn should_save(&self, step: usize) -> bool {
        self.config.save_interval > 0 && step > 0 && step % self.config.save_interval == 0
    }

    /// Write the checkpoint for `step` with `write`, then move it into place
    ///
    /// An existing checkpoint for the same step is replaced. Nothing is left behind when
    /// `write` fails.
    pub fn save<F>(&self, step: usize, write: F) -> Result<PathBuf, CheckpointError>
    where
        F: FnOnce(&CheckpointDir) -> Result<(), CheckpointError>,
    {
        let tmp = self.config.checkpoint_dir.join(format!("{TMP_PREFIX}{step:08}"));
        if tmp.exists() {
            fs::remove_dir_all(&tmp)?;
        }

        let dir = CheckpointDir::create(&tmp)?;
        if let Err(err) = write(&dir) {
            let _ = fs::remove_dir_all(&tmp);
            return Err(err);
        }

        let path = self.checkpoint_path(step);
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::rename(&tmp, &path)?;
        log::debug!("saved checkpoint {}", path.display());

        self.cleanup_old_checkpoints()?;
        Ok(path)
    }

    pub fn checkpoint_path(&self, step: usize) -> PathBuf {
        self.config
            .checkpoint_dir
            .join(format!("{CHECKPOINT_PREFIX}{step:08}"))
    }

    /// All complete checkpoints, oldest first
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut checkpoints: Vec<CheckpointInfo> = fs::read_dir(&self.config.checkpoint_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let path = e.path();
                let step = path
                    .file_name()?
                    .to_str()?
                    .strip_prefix(CHECKPOINT_PREFIX)?
                    .parse()
                    .ok()?;
                Some(CheckpointInfo { path, step })
            })
            .collect();

        checkpoints.sort_by_key(|c| c.step);
        Ok(checkpoints)
    }

    /// The checkpoint with the highest step
    pub fn latest(&self) -> Result<CheckpointInfo, CheckpointError> {
        self.list_checkpoints()?
            .pop()
            .ok_or_else(|| CheckpointError::NoCheckpoint(self.config.checkpoint_dir.clone()))
    }

    /// Remove every checkpoint (and any unfinished temporary one)
    ///
    /// Returns the number of complete checkpoints removed.
    pub fn clear(&self) -> Result<usize, CheckpointError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_dir() {
                continue;
            }
            if name.starts_with(CHECKPOINT_PREFIX) {
                fs::remove_dir_all(&path)?;
                removed += 1;
            } else if name.starts_with(TMP_PREFIX) {
                fs::remove_dir_all(&path)?;
            }
        }
        Ok(removed)
    }

    fn cleanup_old_checkpoints(&self) -> Result<(), CheckpointError> {
        if self.config.keep_last_n == 0 {
            return Ok(());
        }

        let checkpoints = self.list_checkpoints()?;
        let excess = checkpoints.len().saturating_sub(self.config.keep_last_n);
        for old in &checkpoints[..excess] {
            fs::remove_dir_all(&old.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{MLPConfig, MLP};
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use tempfile::tempdir;

    fn touch(dir: &CheckpointDir) -> Result<(), CheckpointError> {
        fs::write(dir.path().join("policy.bin"), b"x")?;
        Ok(())
    }

    #[test]
    fn test_should_save() {
        let dir = tempdir().unwrap();
        let config = CheckpointerConfig::new(dir.path()).with_save_interval(100);
        let checkpointer = Checkpointer::new(config).unwrap();

        assert!(!checkpointer.should_save(0));
        assert!(!checkpointer.should_save(50));
        assert!(checkpointer.should_save(100));
        assert!(!checkpointer.should_save(150));
        assert!(checkpointer.should_save(200));
    }

    #[test]
    fn test_checkpoint_dir_creation() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("nested/checkpoints");

        let _checkpointer = Checkpointer::new(CheckpointerConfig::new(&subdir)).unwrap();

        assert!(subdir.exists());
    }

    #[test]
    fn latest_is_resolved_by_step_number() {
        let dir = tempdir().unwrap();
        let checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path()).with_keep_last_n(0)).unwrap();

        for step in [900, 12_000, 5_000] {
            checkpointer.save(step, touch).unwrap();
        }

        let latest = checkpointer.latest().unwrap();
        assert_eq!(latest.step, 12_000);
        assert!(latest.path.ends_with("checkpoint_00012000"));
    }

    #[test]
    fn empty_directory_has_no_latest() {
        let dir = tempdir().unwrap();
        let checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path())).unwrap();

        assert!(matches!(checkpointer.latest(), Err(CheckpointError::NoCheckpoint(_))));
    }

    #[test]
    fn keeps_only_the_last_n() {
        let dir = tempdir().unwrap();
        let checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path()).with_keep_last_n(2)).unwrap();

        for step in 1..=4 {
            checkpointer.save(step * 10, touch).unwrap();
        }

        let steps: Vec<_> = checkpointer
            .list_checkpoints()
            .unwrap()
            .iter()
            .map(|c| c.step)
            .collect();
        assert_eq!(steps, vec![30, 40]);
    }

    #[test]
    fn clear_removes_every_checkpoint() {
        let dir = tempdir().unwrap();
        let checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path()).with_keep_last_n(0)).unwrap();
        for step in [10, 20, 30] {
            checkpointer.save(step, touch).unwrap();
        }
        fs::create_dir(dir.path().join(".tmp_checkpoint_00000040")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"kept").unwrap();

        assert_eq!(checkpointer.clear().unwrap(), 3);

        assert!(checkpointer.list_checkpoints().unwrap().is_empty());
        assert!(!dir.path().join(".tmp_checkpoint_00000040").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let checkpointer = Checkpointer::new(CheckpointerConfig::new(dir.path())).unwrap();

        let result = checkpointer.save(7, |_| Err(CheckpointError::NoCheckpoint(PathBuf::from("x"))));

        assert!(result.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn module_and_meta_round_trip() {
        let dir = tempdir().unwrap();
        let device = NdArrayDevice::default();
        let checkpoint = CheckpointDir::create(dir.path().join("ckpt")).unwrap();

        let config = MLPConfig::new(3, vec![4], 2);
        let saved: MLP<NdArray> = config.init(&device);
        checkpoint.save_module("critic", &saved).unwrap();
        let meta = CheckpointMeta {
            train_step: 42,
            auto_entropy_tuning: true,
        };
        checkpoint.write_meta(&meta).unwrap();

        let checkpoint = CheckpointDir::open(checkpoint.path()).unwrap();
        let loaded = checkpoint
            .load_module("critic", config.init::<NdArray>(&device), &device)
            .unwrap();

        assert_eq!(loaded.flat_params(), saved.flat_params());
        assert_eq!(checkpoint.read_meta().unwrap(), meta);
    }

    #[test]
    fn missing_component_is_reported_by_name() {
        let dir = tempdir().unwrap();
        let checkpoint = CheckpointDir::create(dir.path()).unwrap();

        match checkpoint.require(&["policy"]) {
            Err(CheckpointError::MissingComponent { component, .. }) => assert_eq!(component, "policy"),
            other => panic!("expected a missing component, got {other:?}"),
        }
        assert!(matches!(
            checkpoint.read_meta(),
            Err(CheckpointError::MissingComponent { .. })
        ));
    }
}
