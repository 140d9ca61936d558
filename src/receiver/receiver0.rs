use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{check_invocation, TokenStore};
use crate::{
    Bit, Broadcaster, Bundle, CheckSet, Error, Forward, Invocation, Message, Params, Party, Phase,
    Result, Token, Verdict,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Receiver0Strategy {
    /// Forward the Sender's claim as received.
    Honest,
    /// Forward the flipped bit with a check set forged from our own tokens.
    Forging,
}

/// What a forging Receiver0 sent to Receiver1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forgery {
    pub forged_bit: Bit,
    pub sigma_len: usize,
    /// Rounds whose token looks consistent with the forged bit.
    pub consistent: usize,
    pub other: usize,
    pub failed_to_apply_strategy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver0Output {
    pub y0: Verdict,
    pub forgery: Option<Forgery>,
}

#[derive(Debug)]
pub struct Receiver0 {
    params: Params,
    strategy: Receiver0Strategy,
    tokens: TokenStore,
    invocation: Option<Invocation>,
    sender_closed: bool,
    phase: Phase,
    output: Option<Receiver0Output>,
}

impl Receiver0 {
    pub fn new(params: Params, strategy: Receiver0Strategy) -> Self {
        Self {
            params,
            strategy,
            tokens: TokenStore::new(params.num_rounds),
            invocation: None,
            sender_closed: false,
            phase: Phase::Distributing,
            output: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn output(&self) -> Option<&Receiver0Output> {
        self.output.as_ref()
    }

    pub fn receive_token(&mut self, token: Token, broadcaster: &mut Broadcaster) -> Result<()> {
        self.tokens.push(token)?;
        if self.tokens.is_full() {
            self.phase.advance(Phase::AwaitingMessages);
        }
        self.decide(broadcaster)
    }

    pub fn handle_bundle(&mut self, bundle: Bundle, broadcaster: &mut Broadcaster) -> Result<()> {
        debug!(
            "[R0] received {} from {}",
            bundle.message.action_str(),
            bundle.initiator
        );
        if bundle.target != Party::Receiver0 {
            return Err(Error::InvalidMessage(format!(
                "bundle for {} delivered to R0",
                bundle.target
            )));
        }
        match (bundle.initiator, bundle.message) {
            (Party::Sender, Message::Invocation(inv)) => {
                if self.invocation.is_some() || self.phase == Phase::Decided {
                    return Err(Error::InvalidMessage(
                        "duplicated invocation from S".to_string(),
                    ));
                }
                self.invocation = Some(inv);
            }
            (initiator, msg) => {
                return Err(Error::InvalidMessage(format!(
                    "R0 does not expect {} from {}",
                    msg.action_str(),
                    initiator
                )));
            }
        }
        self.decide(broadcaster)
    }

    /// `peer` will never send again.
    pub fn handle_peer_closed(&mut self, peer: Party, broadcaster: &mut Broadcaster) -> Result<()> {
        if peer == Party::Sender {
            self.sender_closed = true;
        }
        self.decide(broadcaster)
    }

    fn decide(&mut self, broadcaster: &mut Broadcaster) -> Result<()> {
        if self.phase == Phase::Decided || !self.tokens.is_full() {
            return Ok(());
        }

        let inv = match self.invocation.take() {
            Some(inv) => inv,
            None if self.sender_closed => {
                warn!("[R0] S closed without an invocation, aborting");
                self.phase.advance(Phase::Decided);
                self.output = Some(Receiver0Output {
                    y0: Verdict::Abort,
                    forgery: None,
                });
                return Ok(());
            }
            None => return Ok(()),
        };

        self.phase.advance(Phase::Checking);
        let y0 = check_invocation(&self.params, &self.tokens, &inv);
        info!("[R0] y0 = {}", y0);

        let (forward, forgery) = match self.strategy {
            Receiver0Strategy::Honest => (
                Forward {
                    bit: Verdict::Value(inv.sender_bit),
                    check_set: inv.check_set,
                },
                None,
            ),
            Receiver0Strategy::Forging => self.forge(inv.sender_bit),
        };
        broadcaster.send_to(Party::Receiver1, Message::Forward(forward));

        self.phase.advance(Phase::Decided);
        self.output = Some(Receiver0Output { y0, forgery });
        Ok(())
    }

    /// Claims `!x_s` backed by the first `T` rounds whose token equals `x_s`,
    /// which is what an honest token looks like under the flipped claim.
    fn forge(&self, x_s: Bit) -> (Forward, Option<Forgery>) {
        let forged_bit = x_s.flip();
        let threshold = self.params.length_threshold();
        let consistent: Vec<_> = self
            .tokens
            .iter()
            .filter(|t| t.measure() == x_s)
            .map(Token::round)
            .collect();
        let other = self.tokens.len() - consistent.len();
        let check_set = CheckSet::from_iter(consistent.iter().copied().take(threshold));

        let forgery = Forgery {
            forged_bit,
            sigma_len: check_set.len(),
            consistent: consistent.len(),
            other,
            failed_to_apply_strategy: check_set.len() < threshold,
        };
        if forgery.failed_to_apply_strategy {
            warn!("[R0] only {} rounds to forge with", consistent.len());
        }
        (
            Forward {
                bit: Verdict::Value(forged_bit),
                check_set,
            },
            Some(forgery),
        )
    }
}
