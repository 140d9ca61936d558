//! Runs the three roles of one WBC instance on their own threads.
//!
//! The Sender thread owns the source, teleports one token per round to each
//! receiver and then sends its invocations. Each receiver thread collects its
//! N tokens and then listens to its peers in protocol order: Receiver0 to the
//! Sender, Receiver1 to the Sender and then to Receiver0. A thread drops its
//! endpoint when it is done, which is how a silent peer shows up as closed.

use std::thread;

use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::channel::memory::{self, Endpoint, TokenReceiver, TokenSender};
use crate::channel::ClassicalChannel;
use crate::source::{self, CorrelatedSource, Noise, NoisySource};
use crate::{
    Bit, Broadcaster, Bundle, Error, Params, Party, Receiver0, Receiver0Output, Receiver0Strategy,
    Receiver1, Receiver1Output, Result, Sender, SenderOutput, SenderStrategy, Token,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub params: Params,
    pub sender: SenderStrategy,
    pub receiver0: Receiver0Strategy,
    /// The bit an honest Sender commits to, random from `seed` if `None`.
    pub sender_bit: Option<Bit>,
    pub noise: Noise,
    pub seed: u64,
}

impl RunConfig {
    /// Everybody honest.
    pub fn honest(params: Params, noise: Noise, seed: u64) -> Self {
        Self {
            params,
            sender: SenderStrategy::Honest,
            receiver0: Receiver0Strategy::Honest,
            sender_bit: None,
            noise,
            seed,
        }
    }
}

/// The output triple of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    pub sender: SenderOutput,
    pub receiver0: Receiver0Output,
    pub receiver1: Receiver1Output,
}

/// Runs one instance. `make_source` is asked once for the Sender's source
/// and once for the sampler Receiver1 draws fresh samples from.
pub fn run<S, F>(config: &RunConfig, mut make_source: F) -> Result<RunOutput>
where
    S: CorrelatedSource + Send,
    F: FnMut(Party) -> S,
{
    config.params.validate()?;
    if let SenderStrategy::Adversarial(attack) = config.sender {
        attack.validate(config.params.num_rounds)?;
    }
    let params = config.params;
    let noise = config.noise;

    let sender = match config.sender_bit {
        Some(bit) => Sender::with_bit(params, config.sender, bit),
        None => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            Sender::new(params, config.sender, &mut rng)
        }
    };
    let receiver0 = Receiver0::new(params, config.receiver0);
    let receiver1 = Receiver1::new(params, make_source(Party::Receiver1), noise);
    let source = make_source(Party::Sender);

    let mut mesh = memory::mesh();
    let (endpoint_s, endpoint_r0, endpoint_r1) = match (
        mesh.remove(&Party::Sender),
        mesh.remove(&Party::Receiver0),
        mesh.remove(&Party::Receiver1),
    ) {
        (Some(s), Some(r0), Some(r1)) => (s, r0, r1),
        _ => return Err(Error::InvalidParams("incomplete channel mesh".to_string())),
    };
    let (to_r0, tokens_r0) = memory::quantum_link(Party::Receiver0);
    let (to_r1, tokens_r1) = memory::quantum_link(Party::Receiver1);

    let (sender, receiver0, receiver1) = thread::scope(|s| {
        let sender = s.spawn(move || {
            run_sender(sender, source, noise, endpoint_s, [to_r0, to_r1])
        });
        let receiver0 = s.spawn(move || {
            let mut role = receiver0;
            drive(&mut role, &endpoint_r0, tokens_r0, params.num_rounds, &[Party::Sender])?;
            role.output()
                .cloned()
                .ok_or_else(|| undecided(Party::Receiver0))
        });
        let receiver1 = s.spawn(move || {
            let mut role = receiver1;
            drive(
                &mut role,
                &endpoint_r1,
                tokens_r1,
                params.num_rounds,
                &[Party::Sender, Party::Receiver0],
            )?;
            role.output()
                .cloned()
                .ok_or_else(|| undecided(Party::Receiver1))
        });

        (
            sender.join().map_err(|_| Error::RolePanicked(Party::Sender)),
            receiver0
                .join()
                .map_err(|_| Error::RolePanicked(Party::Receiver0)),
            receiver1
                .join()
                .map_err(|_| Error::RolePanicked(Party::Receiver1)),
        )
    });

    // the Sender's failure is the root cause when receivers saw a closed stream
    let sender = sender??;
    let receiver0 = receiver0??;
    let receiver1 = receiver1??;
    info!(
        "run finished: y0 = {}, y1 = {}",
        receiver0.y0, receiver1.y1
    );
    Ok(RunOutput {
        sender,
        receiver0,
        receiver1,
    })
}

/// [`run`] over [`NoisySource`]s seeded from `config.seed`.
pub fn run_noisy(config: &RunConfig) -> Result<RunOutput> {
    let seed = config.seed;
    run(config, |party| {
        NoisySource::new(seed.wrapping_mul(3).wrapping_add(party as u64 + 1))
    })
}

fn undecided(party: Party) -> Error {
    Error::InvalidMessage(format!("{party} finished without a decision"))
}

fn flush(endpoint: &Endpoint, broadcaster: &mut Broadcaster) -> Result<()> {
    for outgoing in broadcaster.take_outgoings() {
        endpoint.send(outgoing.into_bundle())?;
    }
    Ok(())
}

fn run_sender<S: CorrelatedSource>(
    mut sender: Sender,
    mut source: S,
    noise: Noise,
    endpoint: Endpoint,
    links: [TokenSender; 2],
) -> Result<SenderOutput> {
    let [to_r0, to_r1] = links;
    while !sender.is_distributed() {
        let outcome = source.distribute_round(noise)?;
        sender.measure_round(outcome.round, outcome.sender)?;
        to_r0.teleport(outcome.receiver0)?;
        to_r1.teleport(outcome.receiver1)?;
    }
    drop((to_r0, to_r1));
    debug!("[S] distribution done");

    let mut broadcaster = Broadcaster::new(Party::Sender);
    let output = sender.finish(&mut broadcaster)?.clone();
    flush(&endpoint, &mut broadcaster)?;
    Ok(output)
}

/// What the receiver driver needs from a role.
trait Role {
    fn receive_token(&mut self, token: Token, broadcaster: &mut Broadcaster) -> Result<()>;
    fn handle_bundle(&mut self, bundle: Bundle, broadcaster: &mut Broadcaster)
        -> Result<()>;
    fn handle_peer_closed(&mut self, peer: Party, broadcaster: &mut Broadcaster) -> Result<()>;
}

impl Role for Receiver0 {
    fn receive_token(&mut self, token: Token, broadcaster: &mut Broadcaster) -> Result<()> {
        Receiver0::receive_token(self, token, broadcaster)
    }

    fn handle_bundle(
        &mut self,
        bundle: Bundle,
        broadcaster: &mut Broadcaster,
    ) -> Result<()> {
        Receiver0::handle_bundle(self, bundle, broadcaster)
    }

    fn handle_peer_closed(&mut self, peer: Party, broadcaster: &mut Broadcaster) -> Result<()> {
        Receiver0::handle_peer_closed(self, peer, broadcaster)
    }
}

impl<S: CorrelatedSource> Role for Receiver1<S> {
    fn receive_token(&mut self, token: Token, broadcaster: &mut Broadcaster) -> Result<()> {
        Receiver1::receive_token(self, token, broadcaster)
    }

    fn handle_bundle(
        &mut self,
        bundle: Bundle,
        broadcaster: &mut Broadcaster,
    ) -> Result<()> {
        Receiver1::handle_bundle(self, bundle, broadcaster)
    }

    fn handle_peer_closed(&mut self, peer: Party, broadcaster: &mut Broadcaster) -> Result<()> {
        Receiver1::handle_peer_closed(self, peer, broadcaster)
    }
}

/// Feeds `role` its tokens, then one message (or the close) from each of
/// `peers` in order.
fn drive<R: Role>(
    role: &mut R,
    endpoint: &Endpoint,
    tokens: TokenReceiver,
    num_rounds: usize,
    peers: &[Party],
) -> Result<()> {
    let mut broadcaster = Broadcaster::new(endpoint.actor());
    for received in 0..num_rounds {
        let token = tokens
            .receive()
            .ok_or(source::Error::TokenStreamClosed {
                received,
                expected: num_rounds,
            })?;
        role.receive_token(token, &mut broadcaster)?;
    }
    flush(endpoint, &mut broadcaster)?;

    for &peer in peers {
        match endpoint.recv(peer)? {
            Some(bundle) => role.handle_bundle(bundle, &mut broadcaster)?,
            None => {
                debug!("[{}] {} closed", endpoint.actor(), peer);
                role.handle_peer_closed(peer, &mut broadcaster)?;
            }
        }
        flush(endpoint, &mut broadcaster)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ScriptedRound, ScriptedSource};
    use crate::{AttackParams, Verdict};

    fn scripted(rounds: Vec<ScriptedRound>) -> impl FnMut(Party) -> ScriptedSource {
        move |party| match party {
            Party::Sender => ScriptedSource::new(rounds.clone()),
            _ => ScriptedSource::default(),
        }
    }

    #[test]
    fn test_honest_run_with_matching_rounds() {
        let mut config = RunConfig::honest(Params::with_rounds(10), Noise::zero(), 0);
        config.sender_bit = Some(Bit::One);
        let rounds = vec![ScriptedRound::sender_pair(Bit::One); 10];

        let out = run(&config, scripted(rounds)).unwrap();
        assert_eq!(out.sender, SenderOutput::Honest { x_s: Bit::One });
        assert_eq!(out.receiver0.y0, Verdict::Value(Bit::One));
        assert_eq!(out.receiver1.y1, Verdict::Value(Bit::One));
        assert_eq!(out.receiver1.y1_tilde, Verdict::Value(Bit::One));
        // R0 forwarded the same claim, so there is nothing to be confused about
        assert!(!out.receiver1.second_stage.unwrap().confusion);
    }

    #[test]
    fn test_infeasible_attack_run_aborts_at_both_receivers() {
        let config = RunConfig {
            sender: SenderStrategy::Adversarial(AttackParams::default()),
            ..RunConfig::honest(Params::with_rounds(10), Noise::zero(), 0)
        };
        let rounds = vec![ScriptedRound::sender_pair(Bit::Zero); 10];

        let out = run(&config, scripted(rounds)).unwrap();
        assert!(out.sender.failed_to_apply_strategy());
        assert_eq!(out.receiver0.y0, Verdict::Abort);
        assert_eq!(out.receiver1.y1, Verdict::Abort);
        assert_eq!(out.receiver1.second_stage, None);
    }

    #[test]
    fn test_short_source_is_an_error() {
        let config = RunConfig::honest(Params::with_rounds(10), Noise::zero(), 0);
        let rounds = vec![ScriptedRound::sender_pair(Bit::One); 4];

        match run(&config, scripted(rounds)) {
            Err(Error::Source(source::Error::Exhausted { round: 4 })) => {}
            other => panic!("expected an exhausted source, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_params_are_rejected_before_running() {
        let config = RunConfig::honest(Params::with_rounds(0), Noise::zero(), 0);
        assert!(matches!(
            run_noisy(&config),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn test_malformed_attack_is_rejected_before_running() {
        let config = RunConfig {
            sender: SenderStrategy::Adversarial(AttackParams {
                mu: 0.0,
                ..Default::default()
            }),
            ..RunConfig::honest(Params::default(), Noise::zero(), 0)
        };
        assert!(matches!(
            run_noisy(&config),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn test_noisy_runs_are_reproducible() {
        let config = RunConfig::honest(Params::default(), Noise::new(0.01).unwrap(), 7);
        assert_eq!(run_noisy(&config).unwrap(), run_noisy(&config).unwrap());
    }
}
