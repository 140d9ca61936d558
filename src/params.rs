use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of rounds used to broadcast one bit.
pub const DEFAULT_NUM_ROUNDS: usize = 280;
/// Minimum fraction of rounds a check set must cover ($μ$).
pub const DEFAULT_MU: f64 = 0.3;
/// Fraction of a forwarded check set that must mismatch ($λ$).
pub const DEFAULT_LAMBDA: f64 = 0.94;
/// Check set fraction used by the conflicting Sender.
pub const DEFAULT_ATTACK_MU: f64 = 0.272;

/// Rejects anything outside (0, 1], NaN included.
fn check_fraction(name: &str, fraction: f64) -> Result<()> {
    if fraction > 0.0 && fraction <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidParams(format!(
            "{name} must be in (0, 1], got {fraction}"
        )))
    }
}

/// `ceil(fraction * n)`, the way every threshold of the protocol is derived.
pub(crate) fn ceil_fraction(fraction: f64, n: usize) -> usize {
    (fraction * n as f64).ceil() as usize
}

/// Parameters shared by all honest parties of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub num_rounds: usize,
    pub mu: f64,
    pub lambda: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            num_rounds: DEFAULT_NUM_ROUNDS,
            mu: DEFAULT_MU,
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl Params {
    pub fn with_rounds(num_rounds: usize) -> Self {
        Self {
            num_rounds,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_rounds == 0 {
            return Err(Error::InvalidParams(
                "a run needs at least one round".to_string(),
            ));
        }
        check_fraction("mu", self.mu)?;
        check_fraction("lambda", self.lambda)
    }

    /// Minimum check set length $T = ⌈μ·N⌉$.
    pub fn length_threshold(&self) -> usize {
        ceil_fraction(self.mu, self.num_rounds)
    }

    /// Mismatches the extended consistency check demands of a forwarded
    /// check set of `forwarded_len` entries: $⌈λ·T + |Σ| − T⌉$.
    ///
    /// Only meaningful once `forwarded_len >= T`.
    pub fn required_mismatches(&self, forwarded_len: usize) -> usize {
        let t = self.length_threshold() as f64;
        (self.lambda * t + forwarded_len as f64 - t).ceil().max(0.0) as usize
    }
}

/// Parameters of the conflicting-Sender strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackParams {
    pub mu: f64,
    pub lambda: f64,
}

impl Default for AttackParams {
    fn default() -> Self {
        Self {
            mu: DEFAULT_ATTACK_MU,
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl AttackParams {
    /// Both fractions must lie in (0, 1] and the split over `num_rounds`
    /// must satisfy $1 ≤ Q ≤ T$.
    pub fn validate(&self, num_rounds: usize) -> Result<()> {
        check_fraction("attack mu", self.mu)?;
        check_fraction("attack lambda", self.lambda)?;
        let t = self.check_set_len(num_rounds);
        let q = self.overlap(num_rounds);
        if q == 0 || q > t {
            return Err(Error::InvalidParams(format!(
                "attack overlap {q} does not fit a check set of {t} rounds"
            )));
        }
        Ok(())
    }

    /// Length $T$ of both conflicting check sets.
    pub fn check_set_len(&self, num_rounds: usize) -> usize {
        ceil_fraction(self.mu, num_rounds)
    }

    /// Mixed rounds $Q = T − ⌈λ·T⌉ + 1$ placed into R0's check set.
    pub fn overlap(&self, num_rounds: usize) -> usize {
        let t = self.check_set_len(num_rounds);
        (t + 1).saturating_sub(ceil_fraction(self.lambda, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let params = Params::default();
        assert_eq!(params.length_threshold(), 84);
        assert_eq!(params.required_mismatches(84), 79);
        assert_eq!(params.required_mismatches(90), 85);

        assert_eq!(Params::with_rounds(10).length_threshold(), 3);
    }

    #[test]
    fn test_attack_thresholds() {
        let attack = AttackParams::default();
        assert_eq!(attack.check_set_len(280), 77);
        // ceil(0.94 * 77) = ceil(72.38) = 73
        assert_eq!(attack.overlap(280), 5);
    }

    #[test]
    fn test_validate() {
        assert!(Params::default().validate().is_ok());
        assert!(matches!(
            Params::with_rounds(0).validate(),
            Err(Error::InvalidParams(_))
        ));
        let params = Params {
            lambda: 1.5,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(Error::InvalidParams(_))));
        let params = Params {
            mu: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(Error::InvalidParams(_))));
    }

    #[test]
    fn test_validate_attack() {
        assert!(AttackParams::default().validate(280).is_ok());
        assert!(AttackParams::default().validate(10).is_ok());

        for (mu, lambda) in [(0.0, 0.94), (0.272, f64::NAN), (1.2, 0.94), (0.272, 0.0)] {
            let attack = AttackParams { mu, lambda };
            assert!(matches!(
                attack.validate(280),
                Err(Error::InvalidParams(_))
            ));
        }
        // no rounds, no split
        assert!(matches!(
            AttackParams::default().validate(0),
            Err(Error::InvalidParams(_))
        ));
    }
}
