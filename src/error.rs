use thiserror::Error;

use crate::checkpoint::CheckpointError;

/// Errors surfaced by training orchestration
///
/// The numeric update itself never fails; only the surrounding I/O does.
#[derive(Debug, Error)]
pub enum BearError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("an action of length {len} does not convert to the environment's action type")]
    ActionConversion { len: usize },
}
