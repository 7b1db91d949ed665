//! Negotiator that replays a fixed list of messages

use crate::error::Result;
use crate::orchestration::NegotiationContext;
use crate::protocol::Message;
use crate::types::Party;

use super::Negotiator;

/// Replays `script` in order. The next message is picked by counting this
/// party's entries in the log, so the choice still depends only on the context.
#[derive(Clone, Debug)]
pub struct ScriptedNegotiator {
    party: Party,
    script: Vec<Message>,
}

impl ScriptedNegotiator {
    pub fn new(party: Party, script: Vec<Message>) -> Self {
        Self { party, script }
    }
}

impl Negotiator for ScriptedNegotiator {
    fn party(&self) -> Party {
        self.party
    }

    fn decide(&self, ctx: &NegotiationContext) -> Result<Message> {
        let played = ctx
            .messages()
            .iter()
            .filter(|entry| entry.actor == self.party)
            .count();

        match self.script.get(played) {
            Some(message) => Ok(message.clone()),
            None => Message::reject("script exhausted", None),
        }
    }
}
