// yard/slot_manager.rs - Slot Manager (C4, §4.4)
//
//! Per-slot stack state. Serves allocation auctions (Contract-Net
//! responder) and self-deallocation requests (Request responder), and
//! drives the top-down reallocation cascade that a self-deallocation may
//! trigger. The cascade spans several inbound messages (each blocker's
//! AGREE then its eventual INFORM/FAILURE), so it cannot be modeled as a
//! single synchronous handler call: `cascade` holds the in-progress state
//! and `lock_held` gates every other critical-section message behind a
//! `pending` queue for the duration, mirroring the exclusive lock L of §5
//! without blocking the actor's own mailbox.

use actix::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

use crate::acl::{AclMessage, AgentId, ConversationId, Performative, PROTOCOL_REQUEST};
use crate::actor::{self, ActorRegistry, Deliver};
use crate::content::schemas::{
    AllocationProposal, ContainerData, ServiceDescription, ACTION_ALLOCATION_CONFIRMATION,
    ACTION_ALLOCATION_PROPOSAL, ACTION_ALLOCATION_PROPOSAL_ACCEPTANCE, ACTION_ALLOCATION_REQUEST,
    ACTION_REALLOCATION_REQUEST, ACTION_SELF_DEALLOCATION_REQUEST, PORT_TERMINAL_ONTOLOGY,
};
use crate::content::{Concept, ContentManager, Term};
use crate::error::YardError;
use crate::platform::df;

#[derive(Debug, Clone)]
struct StackItem {
    container_id: String,
    departure_time: i64,
    container_endpoint: String,
}

struct Cascade {
    target_container_id: String,
    requester: AclMessage,
    blockers: VecDeque<StackItem>,
    in_flight: Option<ConversationId>,
}

pub struct SlotManager {
    slot_id: String,
    endpoint: String,
    max_height: u32,
    stack: Vec<StackItem>,
    registry: ActorRegistry,
    content: Arc<ContentManager>,
    df_endpoint: String,
    lock_held: bool,
    pending: VecDeque<Deliver>,
    cascade: Option<Cascade>,
}

impl SlotManager {
    pub fn new(slot_id: impl Into<String>, endpoint: impl Into<String>, max_height: u32, df_endpoint: impl Into<String>, registry: ActorRegistry, content: Arc<ContentManager>) -> Self {
        Self {
            slot_id: slot_id.into(),
            endpoint: endpoint.into(),
            max_height,
            stack: Vec::new(),
            registry,
            content,
            df_endpoint: df_endpoint.into(),
            lock_held: false,
            pending: VecDeque::new(),
            cascade: None,
        }
    }

    fn evaluation_score(&self, t_dep: i64) -> i64 {
        self.stack.iter().map(|item| t_dep - item.departure_time).fold(0, i64::max)
    }

    fn dispatch(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        if let Some(cascade) = &self.cascade {
            if cascade.in_flight.as_ref() == Some(&msg.conversation_id) {
                return self.handle_cascade_reply(msg, ctx);
            }
        }

        match (msg.ontology(), msg.action(), msg.performative()) {
            (Some(PORT_TERMINAL_ONTOLOGY), Some(ACTION_ALLOCATION_REQUEST), Some(Performative::Cfp)) => self.guarded(msg, ctx, Self::handle_cfp),
            (Some(PORT_TERMINAL_ONTOLOGY), Some(ACTION_ALLOCATION_PROPOSAL_ACCEPTANCE), Some(Performative::AcceptProposal)) => self.guarded(msg, ctx, Self::handle_accept),
            (_, _, Some(Performative::RejectProposal)) => {
                // No state change (§4.4): the slot was never reserved for this bidder.
            }
            (Some(PORT_TERMINAL_ONTOLOGY), Some(ACTION_SELF_DEALLOCATION_REQUEST), Some(Performative::Request)) => self.guarded(msg, ctx, Self::handle_self_dealloc_request),
            _ => warn!(slot = %self.slot_id, sender = %msg.sender, action = ?msg.action(), "slot manager: unhandled message"),
        }
    }

    /// Enforces L: if the lock is held, queue the message for later instead
    /// of processing it now.
    fn guarded(&mut self, msg: AclMessage, ctx: &mut Context<Self>, handler: fn(&mut Self, AclMessage, &mut Context<Self>)) {
        if self.lock_held {
            self.pending.push_back(Deliver(msg));
        } else {
            handler(self, msg, ctx);
        }
    }

    /// Replays the backlog until the lock is re-acquired or it runs dry; a
    /// single pop would strand every message behind the first if that first
    /// one doesn't itself need the lock.
    fn drain_pending(&mut self, ctx: &mut Context<Self>) {
        while !self.lock_held {
            let Some(Deliver(msg)) = self.pending.pop_front() else { break };
            self.dispatch(msg, ctx);
        }
    }

    fn handle_cfp(&mut self, msg: AclMessage, _ctx: &mut Context<Self>) {
        let container = match self.content.extract(&msg) {
            Ok(concept) => concept.get("container-data").and_then(Term::as_concept).and_then(ContainerData::from_concept),
            Err(e) => {
                let err = YardError::from(e);
                warn!(slot = %self.slot_id, error = %err, "malformed allocation-request");
                None
            }
        };
        let Some(container) = container else {
            return actor::send(&self.registry, msg.create_reply(Performative::Refuse));
        };

        if self.stack.len() as u32 >= self.max_height {
            return actor::send(&self.registry, msg.create_reply(Performative::Refuse));
        }
        if self.stack.iter().any(|item| item.container_id == container.id) {
            return actor::send(&self.registry, msg.create_reply(Performative::Refuse));
        }

        let evaluation = self.evaluation_score(container.departure_time);
        let proposal = AllocationProposal { slot_id: self.slot_id.clone(), evaluation };
        let mut reply = msg.create_reply(Performative::Propose);
        self.content
            .fill(PORT_TERMINAL_ONTOLOGY, ACTION_ALLOCATION_PROPOSAL, &proposal.to_concept(), &mut reply)
            .expect("port_terminal_ontology allocation-proposal schema is always registered");
        actor::send(&self.registry, reply);
    }

    fn handle_accept(&mut self, msg: AclMessage, _ctx: &mut Context<Self>) {
        let container = match self.content.extract(&msg) {
            Ok(concept) => concept.get("container-data").and_then(Term::as_concept).and_then(ContainerData::from_concept),
            Err(e) => {
                let err = YardError::from(e);
                warn!(slot = %self.slot_id, error = %err, "malformed allocation-proposal-acceptance");
                None
            }
        };
        let Some(container) = container else {
            return actor::send(&self.registry, msg.create_reply(Performative::Failure));
        };

        if self.stack.len() as u32 >= self.max_height {
            let err = YardError::StateViolation(format!("slot {} is at capacity", self.slot_id));
            warn!(slot = %self.slot_id, container = %container.id, error = %err, "late-capacity race lost");
            return actor::send(&self.registry, msg.create_reply(Performative::Failure));
        }

        self.stack.push(StackItem {
            container_id: container.id.clone(),
            departure_time: container.departure_time,
            container_endpoint: msg.sender.as_str().to_string(),
        });
        info!(slot = %self.slot_id, container = %container.id, height = self.stack.len(), "placed");

        let mut reply = msg.create_reply(Performative::Inform);
        let confirmation = Concept::new(ACTION_ALLOCATION_CONFIRMATION).with_str("slot_id", self.slot_id.clone());
        self.content
            .fill(PORT_TERMINAL_ONTOLOGY, ACTION_ALLOCATION_CONFIRMATION, &confirmation, &mut reply)
            .expect("port_terminal_ontology allocation-confirmation schema is always registered");
        actor::send(&self.registry, reply);
    }

    fn handle_self_dealloc_request(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        let container_id = match self.content.extract(&msg) {
            Ok(concept) => concept.get("container_id").and_then(Term::as_str).map(str::to_string),
            Err(e) => {
                let err = YardError::from(e);
                warn!(slot = %self.slot_id, error = %err, "malformed self-deallocation-request");
                None
            }
        };
        let Some(container_id) = container_id else {
            return actor::send(&self.registry, msg.create_reply(Performative::Refuse));
        };

        let Some(position) = self.stack.iter().position(|item| item.container_id == container_id) else {
            return actor::send(&self.registry, msg.create_reply(Performative::Refuse));
        };

        self.lock_held = true;
        actor::send(&self.registry, msg.create_reply(Performative::Agree));

        // Blockers: everything above `position`, top-down.
        let blockers: VecDeque<StackItem> = self.stack.drain(position + 1..).rev().collect();
        self.cascade = Some(Cascade { target_container_id: container_id, requester: msg, blockers, in_flight: None });
        self.advance_cascade(ctx);
    }

    /// Send the next reallocation-request, or finalize if there is none left.
    fn advance_cascade(&mut self, ctx: &mut Context<Self>) {
        let Some(cascade) = &mut self.cascade else { return };
        match cascade.blockers.pop_front() {
            Some(blocker) => {
                let mut request = AclMessage::new(Performative::Request, AgentId::from(self.endpoint.as_str()), AgentId::from(blocker.container_endpoint.as_str()))
                    .with_protocol(PROTOCOL_REQUEST);
                let payload = Concept::new(ACTION_REALLOCATION_REQUEST).with_str("origin_slot_id", self.slot_id.clone());
                self.content
                    .fill(PORT_TERMINAL_ONTOLOGY, ACTION_REALLOCATION_REQUEST, &payload, &mut request)
                    .expect("port_terminal_ontology reallocation-request schema is always registered");
                cascade.in_flight = Some(request.conversation_id.clone());
                info!(slot = %self.slot_id, blocker = %blocker.container_id, "cascading reallocation");
                actor::send(&self.registry, request);
            }
            None => self.finalize_cascade(ctx),
        }
    }

    fn finalize_cascade(&mut self, ctx: &mut Context<Self>) {
        let Some(cascade) = self.cascade.take() else { return };
        self.stack.retain(|item| item.container_id != cascade.target_container_id);
        info!(slot = %self.slot_id, container = %cascade.target_container_id, "self-deallocated");
        actor::send(&self.registry, cascade.requester.create_reply(Performative::Inform));
        self.lock_held = false;
        self.drain_pending(ctx);
    }

    fn handle_cascade_reply(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        match msg.performative() {
            Some(Performative::Agree) => {
                // Intermediate: the blocker has acquired its own lock and
                // begun its reallocation sub-auction. Nothing to do yet.
            }
            Some(Performative::Inform) => self.advance_cascade(ctx),
            other => {
                // Refusal or failure of a reallocation request is a
                // contract violation (§4.4): the container contract
                // forbids declining.
                let err = YardError::ContractViolation {
                    agent: msg.sender.to_string(),
                    context: "reallocation-request".to_string(),
                };
                warn!(slot = %self.slot_id, performative = ?other, error = %err, "reallocation sub-request refused or failed");
                if err.is_fatal() {
                    ctx.stop();
                }
            }
        }
    }
}

impl Actor for SlotManager {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!(slot = %self.slot_id, endpoint = %self.endpoint, max_height = self.max_height, "slot manager started");
        let register = df::register_request(&self.endpoint, &self.df_endpoint, PORT_TERMINAL_ONTOLOGY, ServiceDescription::slot(&self.slot_id), &self.content);
        actor::send(&self.registry, register);
    }
}

impl Handler<Deliver> for SlotManager {
    type Result = ();

    fn handle(&mut self, Deliver(msg): Deliver, ctx: &mut Self::Context) {
        self.dispatch(msg, ctx);
    }
}

#[cfg(test)]
#[derive(Message)]
#[rtype(result = "usize")]
pub struct ProbeStackHeight;

#[cfg(test)]
impl Handler<ProbeStackHeight> for SlotManager {
    type Result = usize;

    fn handle(&mut self, _msg: ProbeStackHeight, _ctx: &mut Context<Self>) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(height: u32) -> SlotManager {
        SlotManager::new("0", "slot0@yard", height, "df@yard", ActorRegistry::new(), Arc::new(ContentManager::new()))
    }

    #[test]
    fn evaluation_score_is_zero_on_empty_stack() {
        let slot = manager(2);
        assert_eq!(slot.evaluation_score(1000), 0);
    }

    #[test]
    fn evaluation_score_matches_scenario_s2() {
        let mut slot = manager(3);
        slot.stack.push(StackItem { container_id: "a".into(), departure_time: 10, container_endpoint: "a@yard".into() });
        assert_eq!(slot.evaluation_score(20), 10);
        slot.stack.push(StackItem { container_id: "b".into(), departure_time: 20, container_endpoint: "b@yard".into() });
        assert_eq!(slot.evaluation_score(30), 20);
    }

    #[test]
    fn evaluation_score_matches_scenario_s3() {
        let mut slot_one = manager(2);
        slot_one.stack.push(StackItem { container_id: "x".into(), departure_time: 100, container_endpoint: "x@yard".into() });
        assert_eq!(slot_one.evaluation_score(50), 0);

        let mut slot_two = manager(2);
        slot_two.stack.push(StackItem { container_id: "y".into(), departure_time: 10, container_endpoint: "y@yard".into() });
        assert_eq!(slot_two.evaluation_score(50), 40);
    }

    #[test]
    fn blockers_above_target_are_collected_top_down() {
        let mut slot = manager(3);
        slot.stack.push(StackItem { container_id: "a".into(), departure_time: 30, container_endpoint: "a@yard".into() });
        slot.stack.push(StackItem { container_id: "b".into(), departure_time: 40, container_endpoint: "b@yard".into() });
        slot.stack.push(StackItem { container_id: "c".into(), departure_time: 50, container_endpoint: "c@yard".into() });

        let position = slot.stack.iter().position(|i| i.container_id == "a").unwrap();
        let blockers: VecDeque<StackItem> = slot.stack.drain(position + 1..).rev().collect();
        let ids: Vec<&str> = blockers.iter().map(|i| i.container_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(slot.stack.len(), 1);
    }
}
