use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single classical bit, either a committed value or a measurement outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bit {
    Zero,
    One,
}

impl Bit {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from(rng.gen::<bool>())
    }

    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            Bit::Zero => Bit::One,
            Bit::One => Bit::Zero,
        }
    }
}

impl From<bool> for Bit {
    fn from(b: bool) -> Self {
        if b {
            Bit::One
        } else {
            Bit::Zero
        }
    }
}

impl From<Bit> for u8 {
    fn from(b: Bit) -> u8 {
        match b {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// The terminal output of a receiver: the accepted value or an abort.
///
/// `Abort` is never equal to either bit, so comparing two verdicts never
/// mistakes an abort for agreement on a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Value(Bit),
    Abort,
}

impl Verdict {
    pub fn bit(&self) -> Option<Bit> {
        match self {
            Verdict::Value(b) => Some(*b),
            Verdict::Abort => None,
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Verdict::Abort)
    }
}

impl From<Bit> for Verdict {
    fn from(b: Bit) -> Self {
        Verdict::Value(b)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Value(b) => write!(f, "{}", b),
            Verdict::Abort => write!(f, "abort"),
        }
    }
}
