use super::{Bundle, Message, Outgoing, Party};

// Broadcaster holds the messages a role wants delivered until its driver
// takes them.
#[derive(Debug)]
pub struct Broadcaster {
    self_id: Party,
    outgoings: Vec<Outgoing>,
}

impl Broadcaster {
    pub fn new(self_id: Party) -> Self {
        Self {
            self_id,
            outgoings: Vec::new(),
        }
    }

    pub fn self_id(&self) -> Party {
        self.self_id
    }

    pub fn send_to(&mut self, recipient: Party, message: Message) {
        let bdl = Bundle {
            initiator: self.self_id,
            target: recipient,
            message,
        };
        self.outgoings.push(Outgoing::Direct(recipient, bdl));
    }

    pub fn take_outgoings(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoings)
    }

    #[cfg(test)]
    pub fn has_direct_message(&self, to: Party, msg: &Message) -> bool {
        self.outgoings.iter().any(|out| match out {
            Outgoing::Direct(recipient, bdl) => *recipient == to && &bdl.message == msg,
        })
    }
}
