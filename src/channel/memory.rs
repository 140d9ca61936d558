//! In-process transport: one `mpsc` queue per ordered pair of parties for
//! classical bundles, and one per receiver for teleported tokens.

use std::collections::BTreeMap;
use std::sync::mpsc;

use log::trace;

use super::error::Error;
use super::{Bundle, ClassicalChannel, Party};
use crate::{Result, Token};

/// One party's end of a fully connected in-memory mesh. Dropping it closes
/// every queue it writes to.
#[derive(Debug)]
pub struct Endpoint {
    actor: Party,
    outboxes: BTreeMap<Party, mpsc::Sender<Vec<u8>>>,
    inboxes: BTreeMap<Party, mpsc::Receiver<Vec<u8>>>,
}

/// Connects all three parties pairwise.
pub fn mesh() -> BTreeMap<Party, Endpoint> {
    let mut endpoints = BTreeMap::from_iter(Party::ALL.iter().map(|&actor| {
        (
            actor,
            Endpoint {
                actor,
                outboxes: BTreeMap::new(),
                inboxes: BTreeMap::new(),
            },
        )
    }));

    for from in Party::ALL {
        for to in Party::ALL {
            if from == to {
                continue;
            }
            let (tx, rx) = mpsc::channel();
            if let Some(e) = endpoints.get_mut(&from) {
                e.outboxes.insert(to, tx);
            }
            if let Some(e) = endpoints.get_mut(&to) {
                e.inboxes.insert(from, rx);
            }
        }
    }
    endpoints
}

impl Endpoint {
    pub fn actor(&self) -> Party {
        self.actor
    }

    fn send_bytes(&self, to: Party, bytes: Vec<u8>) -> Result<()> {
        let outbox = self
            .outboxes
            .get(&to)
            .ok_or(Error::NotConnected(self.actor, to))?;
        outbox.send(bytes).map_err(|_| Error::PeerClosed {
            actor: self.actor,
            peer: to,
        })?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn send_raw(&self, to: Party, bytes: Vec<u8>) -> Result<()> {
        self.send_bytes(to, bytes)
    }
}

impl ClassicalChannel for Endpoint {
    fn send(&self, bundle: Bundle) -> Result<()> {
        if bundle.initiator != self.actor {
            return Err(Error::WrongInitiator {
                claimed: bundle.initiator,
                peer: self.actor,
            }
            .into());
        }
        trace!(
            "{} -> {}: {}",
            bundle.initiator,
            bundle.target,
            bundle.message.action_str()
        );
        self.send_bytes(bundle.target, bundle.to_bytes()?)
    }

    fn recv(&self, peer: Party) -> Result<Option<Bundle>> {
        let inbox = self
            .inboxes
            .get(&peer)
            .ok_or(Error::NotConnected(self.actor, peer))?;
        let bytes = match inbox.recv() {
            Ok(bytes) => bytes,
            Err(mpsc::RecvError) => return Ok(None),
        };

        let bundle = Bundle::from_bytes(&bytes)?;
        if bundle.target != self.actor {
            return Err(Error::WrongDestination {
                dest: bundle.target,
                actor: self.actor,
            }
            .into());
        }
        if bundle.initiator != peer {
            return Err(Error::WrongInitiator {
                claimed: bundle.initiator,
                peer,
            }
            .into());
        }
        Ok(Some(bundle))
    }
}

/// Sending half of a teleportation link from the Sender to one receiver.
#[derive(Debug)]
pub struct TokenSender {
    peer: Party,
    tx: mpsc::Sender<Token>,
}

/// Receiving half of a teleportation link.
#[derive(Debug)]
pub struct TokenReceiver {
    rx: mpsc::Receiver<Token>,
}

pub fn quantum_link(peer: Party) -> (TokenSender, TokenReceiver) {
    let (tx, rx) = mpsc::channel();
    (TokenSender { peer, tx }, TokenReceiver { rx })
}

impl TokenSender {
    pub fn teleport(&self, token: Token) -> Result<()> {
        self.tx.send(token).map_err(|_| Error::PeerClosed {
            actor: Party::Sender,
            peer: self.peer,
        })?;
        Ok(())
    }
}

impl TokenReceiver {
    /// The next token, or `None` once the Sender dropped the link.
    pub fn receive(&self) -> Option<Token> {
        self.rx.recv().ok()
    }
}
