use thiserror::Error;

use crate::RoundIndex;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Noise probability must be within [0, 1], got {0}")]
    InvalidNoise(f64),
    #[error("Source has no more rounds to distribute (asked for round {round})")]
    Exhausted { round: RoundIndex },
    #[error("Token stream closed after {received} of {expected} tokens")]
    TokenStreamClosed { received: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
