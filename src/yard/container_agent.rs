// yard/container_agent.rs - Container Agent (C5, §4.5)
//
//! On startup: query the DF for every port-terminal-ontology agent, then
//! run the allocation initiator (Contract-Net) over the discovered slot
//! endpoints. Once placed, a one-shot timer at `departure_time` (or an
//! external `deallocation-request` from the Port Manager) starts
//! self-deallocation. While acting as a reallocation responder, the
//! container reruns the same allocation initiator over every slot except
//! the one it was just evicted from (§4.5) — reuse, not a separate code
//! path.

use actix::prelude::*;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

use crate::acl::{AclMessage, AgentId, ConversationId, Performative, PROTOCOL_CONTRACT_NET, PROTOCOL_REQUEST};
use crate::actor::{self, ActorRegistry, Deliver};
use crate::content::schemas::{
    AllocationProposal, ContainerData, DfAgentDescription, ACTION_ALLOCATION_CONFIRMATION,
    ACTION_ALLOCATION_PROPOSAL, ACTION_ALLOCATION_PROPOSAL_ACCEPTANCE, ACTION_ALLOCATION_REQUEST,
    ACTION_DEALLOCATION_REQUEST, ACTION_REALLOCATION_REQUEST, ACTION_SEARCH_SERVICE_RESPONSE,
    ACTION_SELF_DEALLOCATION_REQUEST, DF_ONTOLOGY, PORT_TERMINAL_ONTOLOGY,
};
use crate::content::{Concept, ContentManager, Term};
use crate::error::YardError;
use crate::platform::df;
use crate::protocol::ContractNetInitiator;

struct AllocationRound {
    initiator: ContractNetInitiator,
    recipients: Vec<String>,
    departure_time: i64,
    /// Set only when this round is a reallocation: the reallocation-request
    /// to reply INFORM to once the round finalizes.
    reallocation_trigger: Option<AclMessage>,
}

pub struct ContainerAgent {
    id: String,
    endpoint: String,
    departure_time: i64,
    slot_id: Option<String>,
    /// `slot_id` (as reported in `allocation-confirmation`/`reallocation-
    /// request`) -> endpoint (as registered with the DF), built from each
    /// record's `service.slot_id` property (§4.5's endpoint table).
    known_slots: BTreeMap<String, String>,
    registry: ActorRegistry,
    content: Arc<ContentManager>,
    df_endpoint: String,
    lock_held: bool,
    allocation: Option<AllocationRound>,
    awaiting_self_dealloc: Option<ConversationId>,
    self_dealloc_trigger: Option<AclMessage>,
    pending: VecDeque<Deliver>,
}

impl ContainerAgent {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>, departure_time: i64, df_endpoint: impl Into<String>, registry: ActorRegistry, content: Arc<ContentManager>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            departure_time,
            slot_id: None,
            known_slots: BTreeMap::new(),
            registry,
            content,
            df_endpoint: df_endpoint.into(),
            lock_held: false,
            allocation: None,
            awaiting_self_dealloc: None,
            self_dealloc_trigger: None,
            pending: VecDeque::new(),
        }
    }

    fn dispatch(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        match (msg.ontology(), msg.action()) {
            (Some(DF_ONTOLOGY), Some(ACTION_SEARCH_SERVICE_RESPONSE)) => return self.handle_df_search_result(msg, ctx),
            (Some(PORT_TERMINAL_ONTOLOGY), Some(ACTION_ALLOCATION_PROPOSAL)) => return self.handle_cfp_reply(msg, ctx),
            (Some(PORT_TERMINAL_ONTOLOGY), Some(ACTION_ALLOCATION_CONFIRMATION)) => return self.handle_allocation_result(msg, ctx),
            (Some(PORT_TERMINAL_ONTOLOGY), Some(ACTION_REALLOCATION_REQUEST)) => return self.handle_reallocation_request(msg, ctx),
            (Some(PORT_TERMINAL_ONTOLOGY), Some(ACTION_DEALLOCATION_REQUEST)) => return self.handle_deallocation_trigger(msg, ctx),
            _ => {}
        }

        match msg.performative() {
            Some(Performative::Refuse) | Some(Performative::Failure) if self.allocation.is_some() => {
                // Untagged reply: could be a CFP-round REFUSE or the
                // late-capacity-race FAILURE after ACCEPT_PROPOSAL. The two
                // share no content tag, so the round's own phase decides.
                let awaiting_responses = self
                    .allocation
                    .as_ref()
                    .map(|round| round.initiator.state_name() == "await_responses")
                    .unwrap_or(false);
                if awaiting_responses {
                    self.handle_cfp_reply(msg, ctx);
                } else {
                    self.handle_allocation_result(msg, ctx);
                }
            }
            Some(Performative::Inform) | Some(Performative::Refuse) | Some(Performative::Failure)
                if self.awaiting_self_dealloc.as_ref() == Some(&msg.conversation_id) =>
            {
                self.handle_self_dealloc_reply(msg, ctx)
            }
            Some(Performative::Agree) => {
                // Intermediate ack (the slot manager has acquired its lock,
                // or the blocker has acknowledged our reallocation-request).
            }
            other => warn!(container = %self.id, performative = ?other, sender = %msg.sender, "container: unhandled message"),
        }
    }

    fn query_df_for_slots(&self) {
        let msg = df::search_request(&self.endpoint, &self.df_endpoint, PORT_TERMINAL_ONTOLOGY, &self.content);
        actor::send(&self.registry, msg);
    }

    fn handle_df_search_result(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        let concept = match self.content.extract(&msg) {
            Ok(concept) => concept,
            Err(e) => {
                let err = YardError::from(e);
                error!(container = %self.id, error = %err, "malformed search-service-response from df");
                return ctx.stop();
            }
        };
        self.known_slots = concept
            .slots
            .iter()
            .filter(|(k, _)| k == "result")
            .filter_map(|(_, v)| v.as_concept())
            .map(DfAgentDescription::from_concept)
            .filter_map(|d| {
                let endpoint = d.agent_name?;
                let slot_id = d.service.as_ref()?.properties.get("slot_id")?.clone();
                Some((slot_id, endpoint))
            })
            .collect();

        info!(container = %self.id, slots = ?self.known_slots, "discovered slot managers");
        self.start_allocation(ctx, None, None);
    }

    /// `exclude` is set only for a reallocation run; `trigger` is the
    /// reallocation-request to reply to once this round finalizes.
    fn start_allocation(&mut self, ctx: &mut Context<Self>, exclude: Option<&str>, trigger: Option<AclMessage>) {
        let recipients: Vec<String> = self
            .known_slots
            .iter()
            .filter(|(slot_id, _)| Some(slot_id.as_str()) != exclude)
            .map(|(_, endpoint)| endpoint.clone())
            .collect();
        if recipients.is_empty() {
            warn!(container = %self.id, "no slot managers available for allocation");
            return self.terminate_on_allocation_failure(ctx, trigger);
        }

        self.lock_held = true;
        let payload = Concept::new(ACTION_ALLOCATION_REQUEST).with_nested(
            "container-data",
            ContainerData { id: self.id.clone(), departure_time: self.departure_time }.to_concept(),
        );
        for recipient in &recipients {
            let mut cfp = AclMessage::new(Performative::Cfp, AgentId::from(self.endpoint.as_str()), AgentId::from(recipient.as_str()))
                .with_protocol(PROTOCOL_CONTRACT_NET);
            self.content
                .fill(PORT_TERMINAL_ONTOLOGY, ACTION_ALLOCATION_REQUEST, &payload, &mut cfp)
                .expect("port_terminal_ontology allocation-request schema is always registered");
            actor::send(&self.registry, cfp);
        }

        self.allocation = Some(AllocationRound {
            initiator: ContractNetInitiator::new(recipients.len()),
            recipients,
            departure_time: self.departure_time,
            reallocation_trigger: trigger,
        });
    }

    fn decode_proposal(&self, body: &str, sender: &AgentId) -> Option<AllocationProposal> {
        let mut synthetic = AclMessage::new(Performative::Propose, sender.clone(), AgentId::from(self.endpoint.as_str()));
        synthetic.metadata.insert(crate::acl::META_ONTOLOGY.to_string(), PORT_TERMINAL_ONTOLOGY.to_string());
        synthetic.metadata.insert(crate::acl::META_ACTION.to_string(), ACTION_ALLOCATION_PROPOSAL.to_string());
        synthetic.body = body.to_string();
        self.content.extract(&synthetic).ok().and_then(|c| AllocationProposal::from_concept(&c))
    }

    fn handle_cfp_reply(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        let Some(round) = &mut self.allocation else { return };
        use crate::protocol::ContractNetPhase;
        if let ContractNetPhase::AllIn = round.initiator.record_response(msg) {
            self.finalize_cfp_round(ctx);
        }
    }

    fn finalize_cfp_round(&mut self, ctx: &mut Context<Self>) {
        let Some(round) = &mut self.allocation else { return };

        // Stable by endpoint order (§4.5, §9): walk recipients in the order
        // CFPs were sent and keep the first minimal-E proposal.
        let mut winner: Option<(String, i64)> = None;
        for recipient in &round.recipients {
            let Some(proposal) = round.initiator.proposals().find(|p| p.bidder.as_str() == recipient) else { continue };
            let Some(decoded) = self.decode_proposal(&proposal.body, &proposal.bidder) else { continue };
            if winner.as_ref().map(|(_, best)| decoded.evaluation < *best).unwrap_or(true) {
                winner = Some((recipient.clone(), decoded.evaluation));
            }
        }

        let Some((winner_endpoint, _)) = winner else {
            warn!(container = %self.id, "every slot manager refused allocation");
            round.initiator.finalize_decisions(0);
            let trigger = self.allocation.take().and_then(|r| r.reallocation_trigger);
            return self.terminate_on_allocation_failure(ctx, trigger);
        };

        let container_data = ContainerData { id: self.id.clone(), departure_time: round.departure_time };
        for recipient in round.recipients.clone() {
            if recipient == winner_endpoint {
                let mut accept = AclMessage::new(Performative::AcceptProposal, AgentId::from(self.endpoint.as_str()), AgentId::from(recipient.as_str()))
                    .with_protocol(PROTOCOL_CONTRACT_NET);
                let payload = Concept::new(ACTION_ALLOCATION_PROPOSAL_ACCEPTANCE).with_nested("container-data", container_data.to_concept());
                self.content
                    .fill(PORT_TERMINAL_ONTOLOGY, ACTION_ALLOCATION_PROPOSAL_ACCEPTANCE, &payload, &mut accept)
                    .expect("port_terminal_ontology allocation-proposal-acceptance schema is always registered");
                actor::send(&self.registry, accept);
            } else {
                let reject = AclMessage::new(Performative::RejectProposal, AgentId::from(self.endpoint.as_str()), AgentId::from(recipient.as_str()))
                    .with_protocol(PROTOCOL_CONTRACT_NET);
                actor::send(&self.registry, reject);
            }
        }
        round.initiator.finalize_decisions(1);
    }

    /// The terminal result of an accepted proposal: either a tagged
    /// `allocation-confirmation` INFORM, or an untagged FAILURE from the
    /// late-capacity race (B1).
    fn handle_allocation_result(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        let Some(round) = &mut self.allocation else { return };
        use crate::protocol::ContractNetPhase;
        let failed = msg.performative() == Some(Performative::Failure);
        if let ContractNetPhase::AllIn = round.initiator.record_result(msg.clone()) {
            let round = self.allocation.take().expect("round present");
            self.lock_held = false;

            if failed {
                let err = YardError::StateViolation(format!("lost the late-capacity race for {}", self.id));
                warn!(container = %self.id, error = %err, "lost the late-capacity race (B1)");
                if let Some(trigger) = round.reallocation_trigger {
                    actor::send(&self.registry, trigger.create_reply(Performative::Failure));
                }
                error!(container = %self.id, "allocation failed after acceptance");
                return ctx.stop();
            }

            let concept = match self.content.extract(&msg) {
                Ok(concept) => concept,
                Err(e) => {
                    let err = YardError::from(e);
                    error!(container = %self.id, error = %err, "malformed allocation-confirmation");
                    return ctx.stop();
                }
            };
            self.slot_id = concept.get("slot_id").and_then(Term::as_str).map(str::to_string);
            info!(container = %self.id, slot = ?self.slot_id, "placed");

            if let Some(trigger) = round.reallocation_trigger {
                actor::send(&self.registry, trigger.create_reply(Performative::Inform));
            } else {
                self.schedule_departure(ctx);
            }
            self.drain_pending(ctx);
        }
    }

    fn terminate_on_allocation_failure(&mut self, ctx: &mut Context<Self>, trigger: Option<AclMessage>) {
        self.lock_held = false;
        self.allocation = None;
        if let Some(trigger) = trigger {
            // The reallocation contract forbids declining; this only
            // happens if every other slot is also full, which §5's deadlock
            // argument treats as not occurring on the happy path.
            actor::send(&self.registry, trigger.create_reply(Performative::Failure));
        }
        let err = YardError::StateViolation(format!("{} found no placement among known slots", self.id));
        error!(container = %self.id, error = %err, "allocation failed with no placement (B3)");
        ctx.stop();
    }

    fn schedule_departure(&mut self, ctx: &mut Context<Self>) {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock before epoch").as_secs() as i64;
        let delay = (self.departure_time - now).max(0) as u64;
        ctx.run_later(Duration::from_secs(delay), |act, ctx| act.begin_self_deallocation(ctx, None));
    }

    fn begin_self_deallocation(&mut self, _ctx: &mut Context<Self>, trigger: Option<AclMessage>) {
        if self.lock_held {
            if let Some(trigger) = trigger {
                self.pending.push_back(Deliver(trigger));
            }
            return;
        }
        let Some(slot_id) = &self.slot_id else {
            warn!(container = %self.id, "self-deallocation fired with no current slot");
            if let Some(trigger) = trigger {
                // Already gone (its own timer won the race): idempotently
                // confirm rather than leave the requester waiting forever.
                actor::send(&self.registry, trigger.create_reply(Performative::Inform));
            }
            return;
        };
        let Some(slot_endpoint) = self.known_slots.get(slot_id).cloned() else {
            error!(container = %self.id, slot_id, "no known endpoint for current slot_id");
            if let Some(trigger) = trigger {
                actor::send(&self.registry, trigger.create_reply(Performative::Failure));
            }
            return;
        };

        self.lock_held = true;
        self.self_dealloc_trigger = trigger;

        let payload = Concept::new(ACTION_SELF_DEALLOCATION_REQUEST).with_str("container_id", self.id.clone());
        let mut request = AclMessage::new(Performative::Request, AgentId::from(self.endpoint.as_str()), AgentId::from(slot_endpoint.as_str()))
            .with_protocol(PROTOCOL_REQUEST);
        self.content
            .fill(PORT_TERMINAL_ONTOLOGY, ACTION_SELF_DEALLOCATION_REQUEST, &payload, &mut request)
            .expect("port_terminal_ontology self-deallocation-request schema is always registered");
        self.awaiting_self_dealloc = Some(request.conversation_id.clone());
        actor::send(&self.registry, request);
    }

    fn handle_self_dealloc_reply(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        self.awaiting_self_dealloc = None;
        self.lock_held = false;
        match msg.performative() {
            Some(Performative::Inform) => {
                info!(container = %self.id, "self-deallocated");
                self.slot_id = None;
                if let Some(trigger) = self.self_dealloc_trigger.take() {
                    actor::send(&self.registry, trigger.create_reply(Performative::Inform));
                }
            }
            _ => {
                warn!(container = %self.id, "self-deallocation refused or failed");
                if let Some(trigger) = self.self_dealloc_trigger.take() {
                    actor::send(&self.registry, trigger.create_reply(Performative::Failure));
                }
            }
        }
        ctx.stop();
    }

    fn handle_reallocation_request(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        if self.lock_held {
            self.pending.push_back(Deliver(msg));
            return;
        }
        self.lock_held = true;
        actor::send(&self.registry, msg.create_reply(Performative::Agree));

        let origin_slot_id = self.content.extract(&msg).ok().and_then(|c| c.get("origin_slot_id").and_then(Term::as_str).map(str::to_string));

        if origin_slot_id.is_some() && origin_slot_id == self.slot_id {
            self.slot_id = None;
            self.start_allocation(ctx, origin_slot_id.as_deref(), Some(msg));
        } else {
            // Defensive no-op case (§4.5): a sibling sub-auction already
            // re-placed us before this request arrived.
            self.lock_held = false;
            actor::send(&self.registry, msg.create_reply(Performative::Inform));
            self.drain_pending(ctx);
        }
    }

    fn handle_deallocation_trigger(&mut self, msg: AclMessage, ctx: &mut Context<Self>) {
        if self.lock_held {
            self.pending.push_back(Deliver(msg));
            return;
        }
        self.begin_self_deallocation(ctx, Some(msg));
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
}

impl Actor for ContainerAgent {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!(container = %self.id, departure_time = self.departure_time, "container agent started");
        self.query_df_for_slots();
    }
}

impl Handler<Deliver> for ContainerAgent {
    type Result = ();

    fn handle(&mut self, Deliver(msg): Deliver, ctx: &mut Self::Context) {
        self.dispatch(msg, ctx);
    }
}

#[cfg(test)]
#[derive(Message)]
#[rtype(result = "Option<String>")]
pub struct ProbeSlotId;

#[cfg(test)]
impl Handler<ProbeSlotId> for ContainerAgent {
    type Result = Option<String>;

    fn handle(&mut self, _msg: ProbeSlotId, _ctx: &mut Context<Self>) -> Option<String> {
        self.slot_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> ContainerAgent {
        ContainerAgent::new("c1", "c1@yard", 1_000, "df@yard", ActorRegistry::new(), Arc::new(ContentManager::new()))
    }

    #[test]
    fn decode_proposal_round_trips_evaluation_score() {
        let container = agent();
        let content = ContentManager::new();
        let proposal = AllocationProposal { slot_id: "0".into(), evaluation: 10 };
        let mut msg = AclMessage::new(Performative::Propose, AgentId::from("slot0@yard"), AgentId::from("c1@yard"));
        content.fill(PORT_TERMINAL_ONTOLOGY, ACTION_ALLOCATION_PROPOSAL, &proposal.to_concept(), &mut msg).unwrap();

        let decoded = container.decode_proposal(&msg.body, &msg.sender).unwrap();
        assert_eq!(decoded, proposal);
    }

    #[test]
    fn new_agent_starts_with_no_slot_and_empty_pending() {
        let container = agent();
        assert!(container.slot_id.is_none());
        assert!(container.pending.is_empty());
    }
}
