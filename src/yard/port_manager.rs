// yard/port_manager.rs - Port Manager (C6, §4.6)
//
//! Sits between the Truck and container agents: on a
//! `containers-deallocation-request` it replies AGREE, then walks the
//! endpoint list in order, sending `deallocation-request` to one container
//! at a time and awaiting INFORM/REFUSE/FAILURE before moving to the next.
//! This serializes outbound truck processing per container (§4.6); a batch
//! arriving while another is in flight queues behind it.

use actix::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

use crate::acl::{AclMessage, AgentId, ConversationId, Performative, PROTOCOL_REQUEST};
use crate::actor::{self, ActorRegistry, Deliver};
use crate::content::schemas::{
    ContainersDeallocationRequest, ACTION_CONTAINERS_DEALLOCATION_REQUEST, ACTION_DEALLOCATION_REQUEST,
    PORT_TERMINAL_ONTOLOGY,
};
use crate::content::{Concept, ContentManager};

struct Batch {
    requester: AclMessage,
    remaining: VecDeque<String>,
}

struct InFlight {
    conversation_id: ConversationId,
    container: String,
}

pub struct PortManager {
    endpoint: String,
    registry: ActorRegistry,
    content: Arc<ContentManager>,
    queue: VecDeque<Batch>,
    current: Option<Batch>,
    in_flight: Option<InFlight>,
}

impl PortManager {
    pub fn new(endpoint: impl Into<String>, registry: ActorRegistry, content: Arc<ContentManager>) -> Self {
        Self { endpoint: endpoint.into(), registry, content, queue: VecDeque::new(), current: None, in_flight: None }
    }

    fn dispatch(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        if msg.ontology() == Some(PORT_TERMINAL_ONTOLOGY) && msg.action() == Some(ACTION_CONTAINERS_DEALLOCATION_REQUEST) {
            return self.handle_batch_request(msg, ctx);
        }

        let matches_in_flight = self.in_flight.as_ref().map(|f| f.conversation_id == msg.conversation_id).unwrap_or(false);
        if matches_in_flight {
            return self.handle_container_reply(msg, ctx);
        }

        warn!(sender = %msg.sender, performative = ?msg.performative(), "port manager: unexpected message");
    }

    fn handle_batch_request(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        let jids = match self.content.extract(&msg) {
            Ok(concept) => ContainersDeallocationRequest::from_concept(&concept).container_jids,
            Err(_) => {
                warn!(sender = %msg.sender, "port manager: malformed containers-deallocation-request");
                return actor::send(&self.registry, msg.create_reply(Performative::Failure));
            }
        };
        actor::send(&self.registry, msg.create_reply(Performative::Agree));

        let batch = Batch { requester: msg, remaining: jids.into_iter().collect() };
        if self.current.is_some() {
            self.queue.push_back(batch);
        } else {
            self.current = Some(batch);
            self.advance_batch(ctx);
        }
    }

    fn advance_batch(&mut self, ctx: &mut Context<Self>) {
        let Some(current) = &mut self.current else { return };
        let Some(container) = current.remaining.pop_front() else {
            let batch = self.current.take().expect("current batch present");
            info!(requester = %batch.requester.sender, "port manager: batch complete");
            actor::send(&self.registry, batch.requester.create_reply(Performative::Inform));
            if let Some(next) = self.queue.pop_front() {
                self.current = Some(next);
                self.advance_batch(ctx);
            }
            return;
        };

        let payload = Concept::new(ACTION_DEALLOCATION_REQUEST).with_str("container_id", container.clone());
        let mut request = AclMessage::new(Performative::Request, AgentId::from(self.endpoint.as_str()), AgentId::from(container.as_str()))
            .with_protocol(PROTOCOL_REQUEST);
        self.content
            .fill(PORT_TERMINAL_ONTOLOGY, ACTION_DEALLOCATION_REQUEST, &payload, &mut request)
            .expect("port_terminal_ontology deallocation-request schema is always registered");
        self.in_flight = Some(InFlight { conversation_id: request.conversation_id.clone(), container });
        actor::send(&self.registry, request);
    }

    fn handle_container_reply(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        let container = self.in_flight.take().map(|f| f.container).unwrap_or_default();
        match msg.performative() {
            Some(Performative::Inform) => info!(container = %container, "port manager: container deallocated"),
            other => warn!(container = %container, performative = ?other, "port manager: deallocation-request refused or failed"),
        }
        self.advance_batch(ctx);
    }
}

impl Actor for PortManager {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!(endpoint = %self.endpoint, "port manager started");
    }
}

impl Handler<Deliver> for PortManager {
    type Result = ();

    fn handle(&mut self, Deliver(msg): Deliver, ctx: &mut Self::Context) {
        self.dispatch(msg, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PortManager {
        PortManager::new("port@yard", ActorRegistry::new(), Arc::new(ContentManager::new()))
    }

    #[test]
    fn new_manager_starts_idle() {
        let pm = manager();
        assert!(pm.current.is_none());
        assert!(pm.queue.is_empty());
        assert!(pm.in_flight.is_none());
    }

    #[test]
    fn batch_request_round_trips_through_content_manager() {
        let content = ContentManager::new();
        let request = ContainersDeallocationRequest { container_jids: vec!["c1@yard".into(), "c2@yard".into()] };
        let mut msg = AclMessage::new(Performative::Request, AgentId::from("truck@yard"), AgentId::from("port@yard"));
        content.fill(PORT_TERMINAL_ONTOLOGY, ACTION_CONTAINERS_DEALLOCATION_REQUEST, &request.to_concept(), &mut msg).unwrap();

        let concept = content.extract(&msg).unwrap();
        let decoded = ContainersDeallocationRequest::from_concept(&concept);
        assert_eq!(decoded.container_jids, vec!["c1@yard".to_string(), "c2@yard".to_string()]);
    }
}
