//! Repeated runs over a range of depolarization probabilities, scored
//! against one fault model.

use std::thread;
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::runtime::{self, RunConfig, RunOutput};
use crate::source::Noise;
use crate::{Error, Params, Receiver0Strategy, Result, SenderStrategy, Verdict};

/// Depolarization probabilities swept by default.
pub const DEFAULT_NOISE_VALUES: [f64; 12] = [
    0.000001, 0.000005, 0.00001, 0.00005, 0.0001, 0.0025, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];
pub const DEFAULT_TRIALS: usize = 500;

/// Which party, if any, deviates from the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultModel {
    NoFaulty,
    SenderFaulty,
    Receiver0Faulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialResult {
    Success,
    Failure,
}

impl FaultModel {
    pub fn strategies(&self) -> (SenderStrategy, Receiver0Strategy) {
        match self {
            FaultModel::NoFaulty => (SenderStrategy::Honest, Receiver0Strategy::Honest),
            FaultModel::SenderFaulty => (
                SenderStrategy::Adversarial(Default::default()),
                Receiver0Strategy::Honest,
            ),
            FaultModel::Receiver0Faulty => (SenderStrategy::Honest, Receiver0Strategy::Forging),
        }
    }

    /// Scores one run from the honest parties' point of view.
    pub fn evaluate(&self, out: &RunOutput) -> TrialResult {
        let y0 = out.receiver0.y0;
        let y1 = out.receiver1.y1;
        let x_s = out.sender.committed_bit().map(Verdict::Value);

        let failed = match self {
            FaultModel::NoFaulty => !(x_s == Some(y0) && x_s == Some(y1)),
            // the honest receivers must never accept different bits
            FaultModel::SenderFaulty => {
                out.sender.failed_to_apply_strategy()
                    || (!y0.is_abort() && !y1.is_abort() && y0 != y1)
            }
            FaultModel::Receiver0Faulty => {
                let forgery_short = out
                    .receiver0
                    .forgery
                    .map_or(false, |f| f.failed_to_apply_strategy);
                forgery_short || x_s != Some(y1)
            }
        };
        if failed {
            TrialResult::Failure
        } else {
            TrialResult::Success
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub params: Params,
    pub noise_values: Vec<f64>,
    /// Runs per noise value.
    pub trials: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            params: Params::default(),
            noise_values: DEFAULT_NOISE_VALUES.to_vec(),
            trials: DEFAULT_TRIALS,
        }
    }
}

/// Aggregate of every trial at one noise value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialStats {
    pub depolar_prob: f64,
    pub trials: usize,
    pub successes: usize,
    pub failures: usize,
    /// Mean wall-clock seconds per run.
    pub avg_time: f64,
    pub failure_rate: f64,
}

pub struct Sweep;

impl Sweep {
    /// Runs `config.trials` instances per noise value, one thread per value.
    /// Records come back in the order of `config.noise_values`.
    pub fn run(config: &SweepConfig, model: FaultModel, seed: u64) -> Result<Vec<TrialStats>> {
        config.params.validate()?;
        if config.trials == 0 {
            return Err(Error::InvalidParams(
                "a sweep needs at least one trial".to_string(),
            ));
        }
        let noises = config
            .noise_values
            .iter()
            .map(|&p| Noise::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (sender, receiver0) = model.strategies();
        let trials = config.trials;
        let params = config.params;
        info!(
            "sweeping {:?} over {} noise values, {} trials each",
            model,
            noises.len(),
            trials
        );

        let results: Vec<_> = thread::scope(|s| {
            let workers: Vec<_> = noises
                .iter()
                .enumerate()
                .map(|(i, &noise)| {
                    let base = RunConfig {
                        params,
                        sender,
                        receiver0,
                        sender_bit: None,
                        noise,
                        seed: seed.wrapping_add((i * trials) as u64),
                    };
                    (noise, s.spawn(move || trials_at(base, model, trials)))
                })
                .collect();
            workers
                .into_iter()
                .map(|(noise, worker)| {
                    worker
                        .join()
                        .map_err(|_| Error::WorkerPanicked(noise.probability()))
                })
                .collect()
        });

        results.into_iter().map(|r| r.and_then(|stats| stats)).collect()
    }
}

fn trials_at(base: RunConfig, model: FaultModel, trials: usize) -> Result<TrialStats> {
    let mut successes = 0;
    let mut elapsed = 0.0;
    for trial in 0..trials {
        let config = RunConfig {
            seed: base.seed.wrapping_add(trial as u64),
            ..base
        };
        let started = Instant::now();
        let out = runtime::run_noisy(&config)?;
        elapsed += started.elapsed().as_secs_f64();

        let result = model.evaluate(&out);
        debug!("p = {}, trial {}: {:?}", base.noise.probability(), trial, result);
        if result == TrialResult::Success {
            successes += 1;
        }
    }

    let failures = trials - successes;
    let stats = TrialStats {
        depolar_prob: base.noise.probability(),
        trials,
        successes,
        failures,
        avg_time: elapsed / trials as f64,
        failure_rate: failures as f64 / trials as f64,
    };
    info!(
        "p = {}: {} of {} trials failed",
        stats.depolar_prob, failures, trials
    );
    Ok(stats)
}
