use log::trace;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{CorrelatedSource, Correlation, Noise, Result, RoundOutcome, Token};
use crate::{Bit, RoundIndex};

/// Two-qubit gates of the preparation circuit, in order, as qubit pairs.
/// Qubits 0 and 1 stay with the Sender, 2 goes to Receiver0, 3 to Receiver1.
const ENTANGLING_GATES: [(usize, usize); 9] = [
    (2, 0),
    (1, 0),
    (2, 0),
    (3, 1),
    (0, 2),
    (1, 3),
    (2, 0),
    (0, 1),
    (2, 0),
];

/// Qubits that cross a teleportation link.
const TELEPORTED: [usize; 2] = [2, 3];

/// Seeded classical sampler of the WBC round structure.
///
/// Noise model: every two-qubit gate of the preparation circuit depolarizes
/// with probability `p`, replacing both of its qubits with uniformly random
/// outcomes; every teleported qubit is depolarized once more on its link.
/// A fresh sample passes through one depolarizing link.
#[derive(Debug)]
pub struct NoisySource {
    rng: StdRng,
    next_round: RoundIndex,
}

impl NoisySource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_round: 0,
        }
    }

    fn prepare(&mut self) -> ([Bit; 4], Correlation) {
        // each of the three branches of |ψ⟩ carries weight 1/3
        if self.rng.gen_bool(1.0 / 3.0) {
            ([Bit::Zero, Bit::Zero, Bit::One, Bit::One], Correlation::SenderZeros)
        } else if self.rng.gen_bool(0.5) {
            ([Bit::One, Bit::One, Bit::Zero, Bit::Zero], Correlation::SenderOnes)
        } else {
            let s = Bit::random(&mut self.rng);
            let r = Bit::random(&mut self.rng);
            ([s, s.flip(), r, r.flip()], Correlation::Mixed)
        }
    }

    fn depolarize(&mut self, bit: &mut Bit, noise: Noise) {
        if self.rng.gen_bool(noise.probability()) {
            *bit = Bit::random(&mut self.rng);
        }
    }
}

impl CorrelatedSource for NoisySource {
    fn distribute_round(&mut self, noise: Noise) -> Result<RoundOutcome> {
        let round = self.next_round;
        let (mut qubits, correlation) = self.prepare();

        for (a, b) in ENTANGLING_GATES {
            if self.rng.gen_bool(noise.probability()) {
                qubits[a] = Bit::random(&mut self.rng);
                qubits[b] = Bit::random(&mut self.rng);
            }
        }
        for q in TELEPORTED {
            let mut bit = qubits[q];
            self.depolarize(&mut bit, noise);
            qubits[q] = bit;
        }

        trace!("round {round}: {correlation:?} -> {qubits:?}");
        self.next_round += 1;

        Ok(RoundOutcome {
            round,
            sender: (qubits[0], qubits[1]),
            receiver0: Token::new(round, qubits[2], correlation),
            receiver1: Token::new(round, qubits[3], correlation),
        })
    }

    fn fresh_sample(&mut self, token: &Token, noise: Noise) -> Result<Bit> {
        let mut bit = match token.correlation().receiver_outcome() {
            Some(bit) => bit,
            None => Bit::random(&mut self.rng),
        };
        self.depolarize(&mut bit, noise);
        Ok(bit)
    }
}
