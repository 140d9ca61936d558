//! The Sender: distributes N rounds, then commits to a bit and backs it with
//! a check set.
//!
//! Both strategies share the round loop; they only differ in how the check
//! sets and committed bits are built from the recorded rounds.

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    AttackParams, Bit, Broadcaster, CheckSet, Error, Invocation, Message, Params, Party, Phase,
    Result, RoundIndex,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SenderStrategy {
    /// Commit to one random bit towards both receivers.
    Honest,
    /// Commit to `0` towards Receiver0 and `1` towards Receiver1, with check
    /// sets crafted to slip past both receivers.
    Adversarial(AttackParams),
}

/// How many rounds fell into each bucket of the Sender's local pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buckets {
    pub zeros: usize,
    pub mixed: usize,
    pub ones: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderOutput {
    Honest {
        x_s: Bit,
    },
    Attack {
        x_r0: Bit,
        x_r1: Bit,
        sigma_r0_len: usize,
        sigma_r1_len: usize,
        buckets: Buckets,
    },
    /// The buckets were too small to build a split that passes the receivers'
    /// checks, so nothing was sent.
    AttackInfeasible {
        buckets: Buckets,
    },
}

impl SenderOutput {
    pub fn failed_to_apply_strategy(&self) -> bool {
        matches!(self, SenderOutput::AttackInfeasible { .. })
    }

    /// The bit an honest Sender committed to.
    pub fn committed_bit(&self) -> Option<Bit> {
        match self {
            SenderOutput::Honest { x_s } => Some(*x_s),
            _ => None,
        }
    }
}

/// Round indices grouped by the Sender's pair of local outcomes.
#[derive(Debug, Default)]
struct RoundLog {
    zeros: CheckSet,
    mixed: CheckSet,
    ones: CheckSet,
}

impl RoundLog {
    fn record(&mut self, round: RoundIndex, (m0, m1): (Bit, Bit)) {
        match (m0, m1) {
            (Bit::Zero, Bit::Zero) => self.zeros.push(round),
            (Bit::One, Bit::One) => self.ones.push(round),
            _ => self.mixed.push(round),
        }
    }

    /// Rounds in which both local outcomes equal `bit`.
    fn matching(&self, bit: Bit) -> &CheckSet {
        match bit {
            Bit::Zero => &self.zeros,
            Bit::One => &self.ones,
        }
    }

    fn buckets(&self) -> Buckets {
        Buckets {
            zeros: self.zeros.len(),
            mixed: self.mixed.len(),
            ones: self.ones.len(),
        }
    }
}

/// The conflicting split: `00[..T−Q] ++ mixed[..Q]` for Receiver0 and
/// `11[..T]` for Receiver1, or `None` when a bucket is too small.
fn conflicting_split(
    attack: &AttackParams,
    num_rounds: usize,
    log: &RoundLog,
) -> Option<(CheckSet, CheckSet)> {
    let t = attack.check_set_len(num_rounds);
    let q = attack.overlap(num_rounds);
    let zeros_needed = t.saturating_sub(q);

    if log.zeros.len() < zeros_needed || log.mixed.len() < q || log.ones.len() < t {
        return None;
    }

    let sigma_r0 = log
        .zeros
        .iter()
        .take(zeros_needed)
        .chain(log.mixed.iter().take(q))
        .collect();
    let sigma_r1 = log.ones.iter().take(t).collect();
    Some((sigma_r0, sigma_r1))
}

#[derive(Debug)]
pub struct Sender {
    params: Params,
    strategy: SenderStrategy,
    x_s: Bit,
    distributed: usize,
    log: RoundLog,
    phase: Phase,
    output: Option<SenderOutput>,
}

impl Sender {
    pub fn new<R: Rng + ?Sized>(params: Params, strategy: SenderStrategy, rng: &mut R) -> Self {
        Self::with_bit(params, strategy, Bit::random(rng))
    }

    /// A Sender that commits to `x_s` instead of a random bit. The adversarial
    /// strategy ignores it.
    pub fn with_bit(params: Params, strategy: SenderStrategy, x_s: Bit) -> Self {
        Self {
            params,
            strategy,
            x_s,
            distributed: 0,
            log: RoundLog::default(),
            phase: Phase::Distributing,
            output: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn output(&self) -> Option<&SenderOutput> {
        self.output.as_ref()
    }

    pub fn is_distributed(&self) -> bool {
        self.distributed == self.params.num_rounds
    }

    /// Records the two local outcomes of `round`. Rounds must arrive in order.
    pub fn measure_round(&mut self, round: RoundIndex, outcomes: (Bit, Bit)) -> Result<()> {
        if self.phase != Phase::Distributing || self.is_distributed() {
            return Err(Error::UnexpectedRound {
                expected: self.params.num_rounds,
                got: round,
            });
        }
        if round != self.distributed {
            return Err(Error::UnexpectedRound {
                expected: self.distributed,
                got: round,
            });
        }
        self.log.record(round, outcomes);
        self.distributed += 1;
        Ok(())
    }

    /// Builds the check sets and queues the invocations. Must only be called
    /// once all rounds have been measured.
    pub fn finish(&mut self, broadcaster: &mut Broadcaster) -> Result<&SenderOutput> {
        if !self.is_distributed() {
            return Err(Error::DistributionIncomplete {
                distributed: self.distributed,
                expected: self.params.num_rounds,
            });
        }
        if self.phase == Phase::Decided {
            return Err(Error::InvalidMessage(
                "the Sender has already sent its invocations".to_string(),
            ));
        }
        if let SenderStrategy::Adversarial(attack) = self.strategy {
            attack.validate(self.params.num_rounds)?;
        }
        self.phase.advance(Phase::Checking);

        let buckets = self.log.buckets();
        let output = match self.strategy {
            SenderStrategy::Honest => {
                let check_set = self.log.matching(self.x_s).clone();
                debug!(
                    "[S] committing to {} with {} of {} rounds",
                    self.x_s,
                    check_set.len(),
                    self.params.num_rounds
                );
                let msg = Message::Invocation(Invocation {
                    sender_bit: self.x_s,
                    check_set,
                });
                for peer in [Party::Receiver0, Party::Receiver1] {
                    broadcaster.send_to(peer, msg.clone());
                }
                SenderOutput::Honest { x_s: self.x_s }
            }
            SenderStrategy::Adversarial(attack) => {
                match conflicting_split(&attack, self.params.num_rounds, &self.log) {
                    Some((sigma_r0, sigma_r1)) => {
                        info!(
                            "[S] sending conflicting invocations, buckets {:?}",
                            buckets
                        );
                        let (x_r0, x_r1) = (Bit::Zero, Bit::One);
                        let output = SenderOutput::Attack {
                            x_r0,
                            x_r1,
                            sigma_r0_len: sigma_r0.len(),
                            sigma_r1_len: sigma_r1.len(),
                            buckets,
                        };
                        broadcaster.send_to(
                            Party::Receiver0,
                            Message::Invocation(Invocation {
                                sender_bit: x_r0,
                                check_set: sigma_r0,
                            }),
                        );
                        broadcaster.send_to(
                            Party::Receiver1,
                            Message::Invocation(Invocation {
                                sender_bit: x_r1,
                                check_set: sigma_r1,
                            }),
                        );
                        output
                    }
                    None => {
                        warn!("[S] cannot apply the conflicting split, buckets {:?}", buckets);
                        SenderOutput::AttackInfeasible { buckets }
                    }
                }
            }
        };

        self.phase.advance(Phase::Decided);
        Ok(&*self.output.insert(output))
    }
}

#[cfg(test)]
#[path = "./tests.rs"]
mod tests;
