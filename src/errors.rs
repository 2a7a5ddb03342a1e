//! Top-level error type.
//!
//! Aggregates the subsystem errors so binaries and harnesses can bubble a
//! single type with `?`. Library code keeps returning the specific subsystem
//! errors; only the outermost layers widen to `EngineError`.

use thiserror::Error;

use crate::compute::backend::ComputeError;
use crate::config::ConfigError;
use crate::position::fen::FenError;
use crate::position::moves::MoveParseError;
use crate::tuner::bench::TuneError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    Move(#[from] MoveParseError),
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tune(#[from] TuneError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
