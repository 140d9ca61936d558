use thiserror::Error;

use crate::Party;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("{0:?} is not connected to {1:?}")]
    NotConnected(Party, Party),
    #[error("{peer:?} hung up before {actor:?} could deliver")]
    PeerClosed { actor: Party, peer: Party },
    #[error("Packet was not destined for this actor: {dest:?} != {actor:?}")]
    WrongDestination { dest: Party, actor: Party },
    #[error("Packet claims to come from {claimed:?} but arrived from {peer:?}")]
    WrongInitiator { claimed: Party, peer: Party },
}
