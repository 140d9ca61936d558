use thiserror::Error;

use crate::{channel, source, Party, RoundIndex};

/// Failures of the implementation or its infrastructure.
///
/// A protocol abort is not an error: it is a [`crate::Verdict::Abort`] output.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Correlated-qubit source failed: {0}")]
    Source(#[from] source::error::Error),
    #[error("Classical channel failed: {0}")]
    Channel(#[from] channel::error::Error),
    #[error("Failed to encode with bincode")]
    Encoding(#[from] bincode::Error),
    #[error("Invalid protocol parameters: {0}")]
    InvalidParams(String),
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
    #[error("Round {got} arrived out of order, expected round {expected}")]
    UnexpectedRound {
        expected: RoundIndex,
        got: RoundIndex,
    },
    #[error("Distribution is not finished: {distributed} of {expected} rounds")]
    DistributionIncomplete {
        distributed: usize,
        expected: usize,
    },
    #[error("The {0:?} thread panicked")]
    RolePanicked(Party),
    #[error("The sweep worker for noise {0} panicked")]
    WorkerPanicked(f64),
}

pub type Result<T> = std::result::Result<T, Error>;
