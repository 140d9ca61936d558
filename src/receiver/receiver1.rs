use std::collections::BTreeSet;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{check_invocation, TokenStore};
use crate::source::{CorrelatedSource, Noise};
use crate::{
    Broadcaster, Bundle, Error, Forward, Invocation, Message, Params, Party, Phase, Result, Token,
    Verdict,
};

/// Which second-order signals held against Receiver0's forwarded claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondStage {
    pub confusion: bool,
    pub length: bool,
    pub consistency: bool,
}

impl SecondStage {
    pub fn overrides(&self) -> bool {
        self.confusion && self.length && self.consistency
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver1Output {
    pub y1: Verdict,
    /// The verdict from our own check of the Sender's invocation.
    pub y1_tilde: Verdict,
    /// `None` when Receiver0 never forwarded anything.
    pub second_stage: Option<SecondStage>,
}

/// Receiver1 checks the Sender like Receiver0 does, then weighs Receiver0's
/// forwarded claim against fresh samples drawn from `sampler`.
#[derive(Debug)]
pub struct Receiver1<S> {
    params: Params,
    tokens: TokenStore,
    sampler: S,
    noise: Noise,
    invocation: Option<Invocation>,
    forward: Option<Forward>,
    closed: BTreeSet<Party>,
    y1_tilde: Option<Verdict>,
    phase: Phase,
    output: Option<Receiver1Output>,
}

impl<S: CorrelatedSource> Receiver1<S> {
    pub fn new(params: Params, sampler: S, noise: Noise) -> Self {
        Self {
            params,
            tokens: TokenStore::new(params.num_rounds),
            sampler,
            noise,
            invocation: None,
            forward: None,
            closed: BTreeSet::new(),
            y1_tilde: None,
            phase: Phase::Distributing,
            output: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn output(&self) -> Option<&Receiver1Output> {
        self.output.as_ref()
    }

    // Receiver1 never sends anything; the broadcaster argument keeps the
    // driving loop the same for every role.
    pub fn receive_token(&mut self, token: Token, _broadcaster: &mut Broadcaster) -> Result<()> {
        self.tokens.push(token)?;
        if self.tokens.is_full() {
            self.phase.advance(Phase::AwaitingMessages);
        }
        self.decide()
    }

    pub fn handle_bundle(&mut self, bundle: Bundle, _broadcaster: &mut Broadcaster) -> Result<()> {
        debug!(
            "[R1] received {} from {}",
            bundle.message.action_str(),
            bundle.initiator
        );
        if bundle.target != Party::Receiver1 {
            return Err(Error::InvalidMessage(format!(
                "bundle for {} delivered to R1",
                bundle.target
            )));
        }
        let duplicated = match (bundle.initiator, bundle.message) {
            (Party::Sender, Message::Invocation(inv)) => {
                let seen = self.invocation.is_some() || self.y1_tilde.is_some();
                self.invocation.get_or_insert(inv);
                seen
            }
            (Party::Receiver0, Message::Forward(fwd)) => {
                let seen = self.forward.is_some() || self.phase == Phase::Decided;
                self.forward.get_or_insert(fwd);
                seen
            }
            (initiator, msg) => {
                return Err(Error::InvalidMessage(format!(
                    "R1 does not expect {} from {}",
                    msg.action_str(),
                    initiator
                )));
            }
        };
        if duplicated {
            return Err(Error::InvalidMessage(format!(
                "duplicated message from {}",
                bundle.initiator
            )));
        }
        self.decide()
    }

    /// `peer` will never send again.
    pub fn handle_peer_closed(&mut self, peer: Party, _broadcaster: &mut Broadcaster) -> Result<()> {
        self.closed.insert(peer);
        self.decide()
    }

    fn decide(&mut self) -> Result<()> {
        if self.phase == Phase::Decided || !self.tokens.is_full() {
            return Ok(());
        }

        let y1_tilde = match self.first_stage() {
            Some(v) => v,
            None => return Ok(()),
        };

        let fwd = match self.forward.take() {
            Some(fwd) => fwd,
            None if self.closed.contains(&Party::Receiver0) => {
                warn!("[R1] R0 closed without forwarding, keeping y1 = {}", y1_tilde);
                self.phase.advance(Phase::Decided);
                self.output = Some(Receiver1Output {
                    y1: y1_tilde,
                    y1_tilde,
                    second_stage: None,
                });
                return Ok(());
            }
            None => return Ok(()),
        };

        self.phase.advance(Phase::Checking);
        let stage = self.second_stage(y1_tilde, &fwd)?;
        let y1 = if stage.overrides() { fwd.bit } else { y1_tilde };
        info!("[R1] y1 = {} (y1~ = {}, {:?})", y1, y1_tilde, stage);

        self.phase.advance(Phase::Decided);
        self.output = Some(Receiver1Output {
            y1,
            y1_tilde,
            second_stage: Some(stage),
        });
        Ok(())
    }

    /// Our own verdict on the Sender's invocation, once it is known.
    fn first_stage(&mut self) -> Option<Verdict> {
        if self.y1_tilde.is_none() {
            match self.invocation.take() {
                Some(inv) => {
                    self.y1_tilde = Some(check_invocation(&self.params, &self.tokens, &inv));
                }
                None if self.closed.contains(&Party::Sender) => {
                    warn!("[R1] S closed without an invocation, y1~ = abort");
                    self.y1_tilde = Some(Verdict::Abort);
                }
                None => {}
            }
        }
        self.y1_tilde
    }

    fn second_stage(&mut self, y1_tilde: Verdict, fwd: &Forward) -> Result<SecondStage> {
        let confusion = match (fwd.bit, y1_tilde) {
            (Verdict::Value(x0), Verdict::Value(y)) => x0 != y,
            _ => false,
        };
        let length = fwd.check_set.len() >= self.params.length_threshold();
        let consistency = length && self.extended_consistency(fwd)?;

        Ok(SecondStage {
            confusion,
            length,
            consistency,
        })
    }

    /// Counts fresh samples that differ from the forwarded bit. Indices that
    /// are out of range or repeated add nothing to the count.
    fn extended_consistency(&mut self, fwd: &Forward) -> Result<bool> {
        let x0 = match fwd.bit.bit() {
            Some(b) => b,
            None => return Ok(false),
        };
        let required = self.params.required_mismatches(fwd.check_set.len());

        let mut seen = BTreeSet::new();
        let mut mismatches = 0;
        for i in fwd.check_set.iter() {
            if !seen.insert(i) {
                continue;
            }
            if let Some(token) = self.tokens.get(i) {
                if self.sampler.fresh_sample(token, self.noise)? != x0 {
                    mismatches += 1;
                }
            }
        }
        debug!("[R1] {mismatches} mismatches, {required} required");
        Ok(mismatches >= required)
    }
}
