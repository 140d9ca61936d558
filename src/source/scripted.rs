use std::collections::VecDeque;

use super::{CorrelatedSource, Correlation, Error, Noise, Result, RoundOutcome, Token};
use crate::{Bit, RoundIndex};

/// One pre-recorded round for a [`ScriptedSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedRound {
    pub sender: (Bit, Bit),
    pub receiver0: Bit,
    pub receiver1: Bit,
    pub correlation: Correlation,
}

impl ScriptedRound {
    /// A noiseless round in which the Sender measured `bit` twice.
    pub fn sender_pair(bit: Bit) -> Self {
        Self {
            sender: (bit, bit),
            receiver0: bit.flip(),
            receiver1: bit.flip(),
            correlation: Correlation::of_sender_pair(bit, bit),
        }
    }

    /// A noiseless mixed round: the Sender measured `(first, !first)` and
    /// Receiver0 holds `receiver0`.
    pub fn mixed(first: Bit, receiver0: Bit) -> Self {
        Self {
            sender: (first, first.flip()),
            receiver0,
            receiver1: receiver0.flip(),
            correlation: Correlation::Mixed,
        }
    }

    /// The same round with Receiver0 holding `receiver0` instead, as after noise.
    #[must_use]
    pub fn with_receiver0(mut self, receiver0: Bit) -> Self {
        self.receiver0 = receiver0;
        self
    }

    #[must_use]
    pub fn with_receiver1(mut self, receiver1: Bit) -> Self {
        self.receiver1 = receiver1;
        self
    }
}

/// Replays a fixed list of rounds, ignoring the noise argument.
///
/// Fresh samples are deterministic: the forced receiver outcome of the
/// round's branch, or the token's own outcome for a mixed round.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    rounds: VecDeque<ScriptedRound>,
    next_round: RoundIndex,
}

impl ScriptedSource {
    pub fn new(rounds: impl IntoIterator<Item = ScriptedRound>) -> Self {
        Self {
            rounds: VecDeque::from_iter(rounds),
            next_round: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.rounds.len()
    }
}

impl CorrelatedSource for ScriptedSource {
    fn distribute_round(&mut self, _noise: Noise) -> Result<RoundOutcome> {
        let round = self.next_round;
        let scripted = self
            .rounds
            .pop_front()
            .ok_or(Error::Exhausted { round })?;
        self.next_round += 1;

        Ok(RoundOutcome {
            round,
            sender: scripted.sender,
            receiver0: Token::new(round, scripted.receiver0, scripted.correlation),
            receiver1: Token::new(round, scripted.receiver1, scripted.correlation),
        })
    }

    fn fresh_sample(&mut self, token: &Token, _noise: Noise) -> Result<Bit> {
        Ok(token
            .correlation()
            .receiver_outcome()
            .unwrap_or_else(|| token.measure()))
    }
}
