use environment::EnvironmentError;
use estimation::EstimatorError;
use thiserror::Error;

use crate::runner::StopReason;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Estimator(#[from] EstimatorError),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error("simulation has stopped ({0:?}), reset it to run again")]
    Stopped(StopReason),
}

pub type Result<T> = std::result::Result<T, AppError>;
