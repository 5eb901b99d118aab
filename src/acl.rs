// acl.rs - FIPA ACL message envelope
//
// Messages are value types: an endpoint, a conversation id, a small
// string metadata map, and an opaque text body. The metadata map carries
// `performative`, `ontology`, `action`, `language`, and `protocol` — the
// only keys the protocol layer consumes (see content::ContentManager for
// body marshaling).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A transport endpoint, `localpart@domain[/resource]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self(endpoint.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Conversation identifier, auto-generated on origination and echoed on reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed performative set (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Performative {
    Cfp,
    Propose,
    Refuse,
    AcceptProposal,
    RejectProposal,
    Inform,
    Failure,
    Request,
    Agree,
    NotUnderstood,
    Confirm,
    Disconfirm,
    QueryIf,
    QueryRef,
    RequestWhen,
    RequestWhenever,
    Subscribe,
    Proxy,
    Propagate,
    InformIf,
    InformRef,
}

impl Performative {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        use Performative::*;
        const ALL: &[Performative] = &[
            Cfp,
            Propose,
            Refuse,
            AcceptProposal,
            RejectProposal,
            Inform,
            Failure,
            Request,
            Agree,
            NotUnderstood,
            Confirm,
            Disconfirm,
            QueryIf,
            QueryRef,
            RequestWhen,
            RequestWhenever,
            Subscribe,
            Proxy,
            Propagate,
            InformIf,
            InformRef,
        ];
        ALL.get(value as usize).copied()
    }
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Free-form interaction-protocol routing tag; this system only produces
/// `ContractNet` and `Request`, but the field accepts any string per §6.
pub const PROTOCOL_CONTRACT_NET: &str = "ContractNet";
pub const PROTOCOL_REQUEST: &str = "Request";

pub const META_PERFORMATIVE: &str = "performative";
pub const META_ONTOLOGY: &str = "ontology";
pub const META_ACTION: &str = "action";
pub const META_LANGUAGE: &str = "language";
pub const META_PROTOCOL: &str = "protocol";

/// An ACL message. Ownership transfers with send; the receiver mutates its
/// own copy freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclMessage {
    pub sender: AgentId,
    pub receiver: AgentId,
    pub conversation_id: ConversationId,
    pub in_reply_to: Option<ConversationId>,
    pub metadata: HashMap<String, String>,
    pub body: String,
}

impl AclMessage {
    pub fn new(performative: Performative, sender: AgentId, receiver: AgentId) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(META_PERFORMATIVE.to_string(), performative.as_i32().to_string());
        Self {
            sender,
            receiver,
            conversation_id: ConversationId::new(),
            in_reply_to: None,
            metadata,
            body: String::new(),
        }
    }

    pub fn performative(&self) -> Option<Performative> {
        self.metadata
            .get(META_PERFORMATIVE)
            .and_then(|v| v.parse::<i32>().ok())
            .and_then(Performative::from_i32)
    }

    pub fn ontology(&self) -> Option<&str> {
        self.metadata.get(META_ONTOLOGY).map(String::as_str)
    }

    pub fn action(&self) -> Option<&str> {
        self.metadata.get(META_ACTION).map(String::as_str)
    }

    pub fn protocol(&self) -> Option<&str> {
        self.metadata.get(META_PROTOCOL).map(String::as_str)
    }

    pub fn with_conversation_id(mut self, id: ConversationId) -> Self {
        self.conversation_id = id;
        self
    }

    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.metadata.insert(META_PROTOCOL.to_string(), protocol.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Build a reply: swap sender/recipient, preserve conversation id (R2).
    pub fn create_reply(&self, performative: Performative) -> AclMessage {
        let mut reply = AclMessage::new(performative, self.receiver.clone(), self.sender.clone());
        reply.conversation_id = self.conversation_id.clone();
        reply.in_reply_to = Some(self.conversation_id.clone());
        if let Some(protocol) = self.protocol() {
            reply.metadata.insert(META_PROTOCOL.to_string(), protocol.to_string());
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_preserves_conversation_id_and_swaps_endpoints() {
        let cfp = AclMessage::new(Performative::Cfp, AgentId::from("c1@yard"), AgentId::from("s1@yard"))
            .with_protocol(PROTOCOL_CONTRACT_NET);
        let reply = cfp.create_reply(Performative::Propose);

        assert_eq!(reply.conversation_id, cfp.conversation_id);
        assert_eq!(reply.sender, cfp.receiver);
        assert_eq!(reply.receiver, cfp.sender);
        assert_eq!(reply.performative(), Some(Performative::Propose));
        assert_eq!(reply.protocol(), Some(PROTOCOL_CONTRACT_NET));
    }

    #[test]
    fn performative_round_trips_through_metadata_string() {
        for p in [Performative::Cfp, Performative::InformRef, Performative::Subscribe] {
            let encoded = p.as_i32();
            assert_eq!(Performative::from_i32(encoded), Some(p));
        }
    }
}
