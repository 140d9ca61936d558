//! Weak Broadcast with Conflict detection (WBC) between one Sender and two
//! Receivers over a correlated-qubit source.
//!
//! Every role is a state machine that never performs IO itself: it consumes
//! round tokens and [`Bundle`]s and pushes its replies into a [`Broadcaster`].
//! The [`runtime`] module drives the three roles on their own threads; tests
//! drive them with a deterministic packet net instead.

pub mod channel;
pub mod check_set;
pub mod error;
pub mod params;
pub mod receiver;
pub mod runtime;
pub mod sender;
pub mod source;
pub mod sweep;
pub mod value;

pub use crate::channel::{Broadcaster, Bundle, Forward, Invocation, Message, Outgoing, Party};
pub use crate::check_set::{CheckSet, RoundIndex};
pub use crate::error::{Error, Result};
pub use crate::params::{AttackParams, Params};
pub use crate::receiver::receiver0::{Forgery, Receiver0, Receiver0Output, Receiver0Strategy};
pub use crate::receiver::receiver1::{Receiver1, Receiver1Output, SecondStage};
pub use crate::runtime::{run, run_noisy, RunConfig, RunOutput};
pub use crate::sender::{Buckets, Sender, SenderOutput, SenderStrategy};
pub use crate::source::{
    Correlation, CorrelatedSource, Noise, NoisySource, RoundOutcome, ScriptedRound,
    ScriptedSource, Token,
};
pub use crate::sweep::{FaultModel, Sweep, SweepConfig, TrialResult, TrialStats};
pub use crate::value::{Bit, Verdict};

// Phase transition, shared by all roles
//
// +--------------+     +------------------+     +------------+     +-----------+
// | Distributing | --> | AwaitingMessages | --> |  Checking  | --> |  Decided  |
// +--------------+     +------------------+     +------------+     +-----------+
//        \                                            /
//         \------------------------------------------/
//
// The Sender never waits for messages and jumps straight to Checking.
/// Where a role currently is in one protocol run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Distributing,
    AwaitingMessages,
    Checking,
    Decided,
}

impl Phase {
    /// Moves to `next`. Phases only ever move forward.
    pub(crate) fn advance(&mut self, next: Phase) {
        debug_assert!(next >= *self, "phase went back from {:?} to {:?}", self, next);
        *self = next;
    }
}
