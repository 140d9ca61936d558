//! Classical messages of the protocol and the channel they travel over.
//!
//! The channel is reliable, ordered per peer and authenticated: a [`Bundle`]
//! received from a peer was sent by that peer.

mod broadcaster;
pub mod error;
pub mod memory;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use self::broadcaster::Broadcaster;
use crate::{Bit, CheckSet, Result, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Party {
    Sender,
    Receiver0,
    Receiver1,
}

impl Party {
    pub const ALL: [Party; 3] = [Party::Sender, Party::Receiver0, Party::Receiver1];
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Sender => write!(f, "S"),
            Party::Receiver0 => write!(f, "R0"),
            Party::Receiver1 => write!(f, "R1"),
        }
    }
}

/// Sender → receiver: the committed bit and the rounds that back it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub sender_bit: Bit,
    pub check_set: CheckSet,
}

/// Receiver0 → Receiver1: the claim Receiver0 checked, passed on as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forward {
    pub bit: Verdict,
    pub check_set: CheckSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Invocation(Invocation),
    Forward(Forward),
}

impl Message {
    pub fn action_str(&self) -> &str {
        match self {
            Message::Invocation(_) => "invocation",
            Message::Forward(_) => "forward",
        }
    }
}

/// Bundle is a wrapper around the actual message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// The party that produced the message.
    pub initiator: Party,
    /// The party the message is meant for.
    pub target: Party,
    pub message: Message,
}

impl Bundle {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Outgoing messages definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Direct(Party, Bundle),
}

impl Outgoing {
    pub fn recipient(&self) -> Party {
        match self {
            Outgoing::Direct(recipient, _) => *recipient,
        }
    }

    pub fn into_bundle(self) -> Bundle {
        match self {
            Outgoing::Direct(_, bundle) => bundle,
        }
    }
}

/// Point-to-point transport between the three parties.
pub trait ClassicalChannel {
    /// Enqueues `bundle` for `bundle.target`; never waits for delivery.
    fn send(&self, bundle: Bundle) -> Result<()>;

    /// Blocks until the next bundle from `peer` arrives. `Ok(None)` means
    /// `peer` closed its end and will never send again.
    fn recv(&self, peer: Party) -> Result<Option<Bundle>>;
}
