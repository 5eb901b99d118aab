// actor/messages.rs - the one inter-agent message type
//
//! Every agent accepts exactly one actix message: deliver this ACL message.
//! Routing by `(ontology, action)` and by conversation id happens inside
//! each actor's own `Handler<Deliver>` impl (§9 Per-agent behavior library).

use crate::acl::AclMessage;
use actix::prelude::*;

#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct Deliver(pub AclMessage);

#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    #[error("agent not found: {0}")]
    NotFound(String),

    #[error("actor mailbox error: {0}")]
    Mailbox(String),
}
