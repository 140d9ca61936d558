//! The two receivers and the admission checks they share.

pub mod receiver0;
pub mod receiver1;

use log::debug;

use crate::{Bit, CheckSet, Error, Invocation, Params, Result, Token, Verdict};

/// The tokens a receiver collected during distribution, indexed by round.
#[derive(Debug)]
pub(crate) struct TokenStore {
    tokens: Vec<Token>,
    expected: usize,
}

impl TokenStore {
    pub(crate) fn new(expected: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(expected),
            expected,
        }
    }

    pub(crate) fn push(&mut self, token: Token) -> Result<()> {
        if self.is_full() {
            return Err(Error::UnexpectedRound {
                expected: self.expected,
                got: token.round(),
            });
        }
        if token.round() != self.tokens.len() {
            return Err(Error::UnexpectedRound {
                expected: self.tokens.len(),
                got: token.round(),
            });
        }
        self.tokens.push(token);
        Ok(())
    }

    pub(crate) fn is_full(&self) -> bool {
        self.tokens.len() == self.expected
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn get(&self, round: usize) -> Option<&Token> {
        self.tokens.get(round)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Token> + '_ {
        self.tokens.iter()
    }
}

/// Measures our token at every index of `check_set` and passes iff each
/// outcome differs from `bit`. A check set that is not well formed fails.
pub(crate) fn consistency_check(tokens: &TokenStore, bit: Bit, check_set: &CheckSet) -> bool {
    if !check_set.is_well_formed(tokens.len()) {
        debug!("check set is not well formed: {:?}", check_set);
        return false;
    }
    check_set
        .iter()
        .filter_map(|i| tokens.get(i))
        .all(|token| token.measure() != bit)
}

/// The length and consistency test both receivers apply to the Sender's
/// invocation.
pub(crate) fn check_invocation(params: &Params, tokens: &TokenStore, inv: &Invocation) -> Verdict {
    let threshold = params.length_threshold();
    if inv.check_set.len() < threshold {
        debug!(
            "check set of {} rounds is below the threshold {}",
            inv.check_set.len(),
            threshold
        );
        return Verdict::Abort;
    }
    if consistency_check(tokens, inv.sender_bit, &inv.check_set) {
        Verdict::Value(inv.sender_bit)
    } else {
        Verdict::Abort
    }
}
