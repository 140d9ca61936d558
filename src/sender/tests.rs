use super::{Sender, SenderOutput, SenderStrategy};
use crate::{
    AttackParams, Bit, Broadcaster, CheckSet, Error, Invocation, Message, Outgoing, Params, Party,
    Phase,
};

const ZERO_PAIR: (Bit, Bit) = (Bit::Zero, Bit::Zero);
const ONE_PAIR: (Bit, Bit) = (Bit::One, Bit::One);
const MIXED_PAIR: (Bit, Bit) = (Bit::Zero, Bit::One);

fn adversary(zeros: usize, mixed: usize, ones: usize, filler: (Bit, Bit), num_rounds: usize) -> Sender {
    let params = Params::with_rounds(num_rounds);
    let mut sender = Sender::with_bit(
        params,
        SenderStrategy::Adversarial(AttackParams::default()),
        Bit::Zero,
    );
    let pairs = std::iter::repeat(ZERO_PAIR)
        .take(zeros)
        .chain(std::iter::repeat(MIXED_PAIR).take(mixed))
        .chain(std::iter::repeat(ONE_PAIR).take(ones))
        .chain(std::iter::repeat(filler));
    for (round, pair) in pairs.take(num_rounds).enumerate() {
        sender.measure_round(round, pair).unwrap();
    }
    sender
}

fn invocations(broadcaster: &mut Broadcaster) -> Vec<(Party, Invocation)> {
    broadcaster
        .take_outgoings()
        .into_iter()
        .map(|out| match out {
            Outgoing::Direct(to, bundle) => match bundle.message {
                Message::Invocation(inv) => (to, inv),
                msg => panic!("unexpected message {msg:?}"),
            },
        })
        .collect()
}

#[test]
fn test_honest_sender_commits_rounds_matching_its_bit() {
    let mut sender = Sender::with_bit(Params::with_rounds(6), SenderStrategy::Honest, Bit::One);
    let pairs = [ONE_PAIR, ZERO_PAIR, ONE_PAIR, MIXED_PAIR, (Bit::One, Bit::Zero), ONE_PAIR];
    for (round, pair) in pairs.into_iter().enumerate() {
        assert_eq!(sender.phase(), Phase::Distributing);
        sender.measure_round(round, pair).unwrap();
    }

    let mut broadcaster = Broadcaster::new(Party::Sender);
    let output = sender.finish(&mut broadcaster).unwrap().clone();
    assert_eq!(output, SenderOutput::Honest { x_s: Bit::One });
    assert_eq!(sender.phase(), Phase::Decided);

    let expected = Invocation {
        sender_bit: Bit::One,
        check_set: CheckSet::new(vec![0, 2, 5]),
    };
    assert_eq!(
        invocations(&mut broadcaster),
        vec![
            (Party::Receiver0, expected.clone()),
            (Party::Receiver1, expected)
        ]
    );
}

#[test]
fn test_adversarial_split_at_the_thresholds() {
    // T = 77, Q = 5
    let mut sender = adversary(72, 5, 77, MIXED_PAIR, 280);
    let mut broadcaster = Broadcaster::new(Party::Sender);
    let output = sender.finish(&mut broadcaster).unwrap().clone();

    assert!(matches!(
        output,
        SenderOutput::Attack {
            x_r0: Bit::Zero,
            x_r1: Bit::One,
            sigma_r0_len: 77,
            sigma_r1_len: 77,
            ..
        }
    ));

    let sent = invocations(&mut broadcaster);
    assert_eq!(sent.len(), 2);
    let (to_r0, sigma_r0) = &sent[0];
    let (to_r1, sigma_r1) = &sent[1];
    assert_eq!(*to_r0, Party::Receiver0);
    assert_eq!(*to_r1, Party::Receiver1);
    assert_eq!(sigma_r0.sender_bit, Bit::Zero);
    assert_eq!(sigma_r1.sender_bit, Bit::One);
    assert!(sigma_r0.check_set.is_disjoint(&sigma_r1.check_set));

    // R0's set is the first 72 zero rounds followed by the first 5 mixed rounds
    let expected_r0 = CheckSet::from_iter((0..72).chain(72..77));
    assert_eq!(sigma_r0.check_set, expected_r0);
    assert_eq!(sigma_r1.check_set, CheckSet::from_iter(77..154));
}

#[test]
fn test_adversarial_split_infeasible_below_any_threshold() {
    let too_few_zeros = adversary(71, 6, 77, ONE_PAIR, 280);
    let too_few_mixed = adversary(72, 4, 78, ZERO_PAIR, 280);
    let too_few_ones = adversary(80, 5, 76, ZERO_PAIR, 280);

    for mut sender in [too_few_zeros, too_few_mixed, too_few_ones] {
        let mut broadcaster = Broadcaster::new(Party::Sender);
        let output = sender.finish(&mut broadcaster).unwrap().clone();

        assert!(output.failed_to_apply_strategy());
        match output {
            SenderOutput::AttackInfeasible { buckets } => {
                assert_eq!(buckets.zeros + buckets.mixed + buckets.ones, 280);
                assert!(buckets.zeros < 72 || buckets.mixed < 5 || buckets.ones < 77);
            }
            other => panic!("expected an infeasible attack, got {other:?}"),
        }
        assert!(broadcaster.take_outgoings().is_empty());
    }
}

#[test]
fn test_rounds_must_arrive_in_order() {
    let mut sender = Sender::with_bit(Params::with_rounds(3), SenderStrategy::Honest, Bit::Zero);
    sender.measure_round(0, ZERO_PAIR).unwrap();
    assert!(matches!(
        sender.measure_round(2, ZERO_PAIR),
        Err(Error::UnexpectedRound {
            expected: 1,
            got: 2
        })
    ));
}

#[test]
fn test_finish_requires_every_round() {
    let mut sender = Sender::with_bit(Params::with_rounds(3), SenderStrategy::Honest, Bit::Zero);
    sender.measure_round(0, ZERO_PAIR).unwrap();
    let mut broadcaster = Broadcaster::new(Party::Sender);
    assert!(matches!(
        sender.finish(&mut broadcaster),
        Err(Error::DistributionIncomplete {
            distributed: 1,
            expected: 3
        })
    ));

    sender.measure_round(1, ZERO_PAIR).unwrap();
    sender.measure_round(2, ZERO_PAIR).unwrap();
    assert!(sender.measure_round(3, ZERO_PAIR).is_err());
    sender.finish(&mut broadcaster).unwrap();
    assert!(sender.finish(&mut broadcaster).is_err());
}

#[test]
fn test_malformed_attack_params_send_nothing() {
    let malformed = [
        AttackParams {
            mu: 0.0,
            ..Default::default()
        },
        AttackParams {
            lambda: f64::NAN,
            ..Default::default()
        },
    ];
    for attack in malformed {
        let params = Params::with_rounds(280);
        let mut sender = Sender::with_bit(params, SenderStrategy::Adversarial(attack), Bit::Zero);
        let pairs = std::iter::repeat(ZERO_PAIR)
            .take(100)
            .chain(std::iter::repeat(MIXED_PAIR).take(80))
            .chain(std::iter::repeat(ONE_PAIR).take(100));
        for (round, pair) in pairs.enumerate() {
            sender.measure_round(round, pair).unwrap();
        }

        let mut broadcaster = Broadcaster::new(Party::Sender);
        assert!(matches!(
            sender.finish(&mut broadcaster),
            Err(Error::InvalidParams(_))
        ));
        assert_eq!(sender.output(), None);
        assert!(broadcaster.take_outgoings().is_empty());
    }
}
