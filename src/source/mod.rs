//! The correlated-qubit source: the external primitive that hands every party
//! its classical (or still unmeasured) share of each round.
//!
//! The noiseless round structure is the four qubit state
//!
//! $$|ψ⟩ = \frac{1}{\sqrt 3}\big(|0011⟩ + |1100⟩ − \tfrac12(|0101⟩ + |0110⟩ + |1001⟩ + |1010⟩)\big)$$
//!
//! where the Sender keeps the first two qubits and the third and fourth are
//! teleported to Receiver0 and Receiver1. Hence a Sender pair `00` forces both
//! receiver outcomes to `1`, a pair `11` forces both to `0`, and a mixed pair
//! leaves the receivers with one `0` and one `1` at random.

pub mod error;
mod noisy;
mod scripted;

use serde::{Deserialize, Serialize};

pub use self::error::{Error, Result};
pub use self::noisy::NoisySource;
pub use self::scripted::{ScriptedRound, ScriptedSource};
use crate::{Bit, RoundIndex};

/// Depolarization probability of a single noisy operation, `0 ≤ p ≤ 1`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Noise(f64);

impl Noise {
    pub fn new(probability: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&probability) {
            Ok(Self(probability))
        } else {
            Err(Error::InvalidNoise(probability))
        }
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn probability(&self) -> f64 {
        self.0
    }
}

/// Which branch of $|ψ⟩$ a round was prepared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Correlation {
    /// Sender holds `00`, both receivers hold `1`.
    SenderZeros,
    /// Sender holds `11`, both receivers hold `0`.
    SenderOnes,
    /// Sender holds `01` or `10`, receivers hold opposite random bits.
    Mixed,
}

impl Correlation {
    pub fn of_sender_pair(m0: Bit, m1: Bit) -> Self {
        match (m0, m1) {
            (Bit::Zero, Bit::Zero) => Correlation::SenderZeros,
            (Bit::One, Bit::One) => Correlation::SenderOnes,
            _ => Correlation::Mixed,
        }
    }

    /// The receiver outcome this branch forces, if any.
    pub fn receiver_outcome(&self) -> Option<Bit> {
        match self {
            Correlation::SenderZeros => Some(Bit::One),
            Correlation::SenderOnes => Some(Bit::Zero),
            Correlation::Mixed => None,
        }
    }
}

/// A receiver's share of one round.
///
/// Receivers only ever [`measure`](Token::measure) it; the correlation is
/// there for the source to draw fresh samples of the same round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    round: RoundIndex,
    outcome: Bit,
    correlation: Correlation,
}

impl Token {
    pub fn new(round: RoundIndex, outcome: Bit, correlation: Correlation) -> Self {
        Self {
            round,
            outcome,
            correlation,
        }
    }

    pub fn round(&self) -> RoundIndex {
        self.round
    }

    pub fn measure(&self) -> Bit {
        self.outcome
    }

    /// Round structure, for [`CorrelatedSource`] implementations.
    pub fn correlation(&self) -> Correlation {
        self.correlation
    }
}

/// Everything one round hands out: the Sender's two local outcomes and one
/// token per receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round: RoundIndex,
    pub sender: (Bit, Bit),
    pub receiver0: Token,
    pub receiver1: Token,
}

/// Produces correlated rounds.
///
/// In the noise-free limit every [`RoundOutcome`] must honour the round
/// structure described at the top of this module exactly.
pub trait CorrelatedSource {
    /// Prepares, distributes and measures the next round.
    fn distribute_round(&mut self, noise: Noise) -> Result<RoundOutcome>;

    /// A fresh outcome correlated with the round `token` came from. This is a
    /// new sample, not a re-measurement of `token`.
    fn fresh_sample(&mut self, token: &Token, noise: Noise) -> Result<Bit>;
}

impl<S: CorrelatedSource + ?Sized> CorrelatedSource for &mut S {
    fn distribute_round(&mut self, noise: Noise) -> Result<RoundOutcome> {
        (**self).distribute_round(noise)
    }

    fn fresh_sample(&mut self, token: &Token, noise: Noise) -> Result<Bit> {
        (**self).fresh_sample(token, noise)
    }
}

impl<S: CorrelatedSource + ?Sized> CorrelatedSource for Box<S> {
    fn distribute_round(&mut self, noise: Noise) -> Result<RoundOutcome> {
        (**self).distribute_round(noise)
    }

    fn fresh_sample(&mut self, token: &Token, noise: Noise) -> Result<Bit> {
        (**self).fresh_sample(token, noise)
    }
}
