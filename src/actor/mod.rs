// actor/mod.rs - Actor infrastructure
//
//! Every agent in the yard (DF, slot manager, container, port manager,
//! truck) is its own actix `Actor`. `Deliver` is the single message type
//! they all accept; `ActorRegistry` is the in-process, dependency-injected
//! directory of `Recipient<Deliver>` endpoints each agent uses to reach any
//! other agent by name (§9 Singletons).

mod messages;
mod registry;

pub use messages::{AgentError, Deliver};
pub use registry::ActorRegistry;

use crate::acl::AclMessage;
use actix::prelude::*;

/// Deliver `msg` to whatever is registered at `msg.receiver`. A missing
/// recipient is a `TransportError` (§7): it surfaces as silence, not a
/// panic — the protocol stalls unless a deadline is configured.
pub fn send(registry: &ActorRegistry, msg: AclMessage) {
    match registry.lookup(msg.receiver.as_str()) {
        Some(recipient) => {
            if let Err(err) = recipient.try_send(Deliver(msg)) {
                tracing::warn!(error = %err, "transport: mailbox rejected delivery");
            }
        }
        None => tracing::warn!(receiver = %msg.receiver, "transport: no recipient registered"),
    }
}
