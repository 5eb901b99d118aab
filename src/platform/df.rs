// platform/df.rs - Directory Facilitator (C2, §4.2)
//
//! A single-task yellow-pages registry. Register appends with no
//! deduplication; deregister and search both use
//! `DfAgentDescription::matches`, differing only in whether the
//! ontology/language/protocol axes are compared (§4.2, §9) — search
//! deliberately leaves that axis out, and this implementation keeps that
//! asymmetry rather than "fixing" it.

use actix::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::acl::{AclMessage, AgentId, Performative};
use crate::actor::{self, ActorRegistry, Deliver};
use crate::content::schemas::{
    DfAgentDescription, DF_ONTOLOGY, ACTION_DEREGISTER_SERVICE_REQUEST,
    ACTION_REGISTER_SERVICE_REQUEST, ACTION_SEARCH_SERVICE_REQUEST, ACTION_SEARCH_SERVICE_RESPONSE,
};
use crate::content::{Concept, ContentManager, Term};

pub struct DirectoryFacilitator {
    endpoint: String,
    records: Vec<DfAgentDescription>,
    registry: ActorRegistry,
    content: Arc<ContentManager>,
}

impl DirectoryFacilitator {
    pub fn new(endpoint: impl Into<String>, registry: ActorRegistry, content: Arc<ContentManager>) -> Self {
        Self { endpoint: endpoint.into(), records: Vec::new(), registry, content }
    }

    fn extract_description(&self, msg: &AclMessage) -> Option<DfAgentDescription> {
        let concept = self.content.extract(msg).ok()?;
        let nested = concept.get("df-agent-description").and_then(Term::as_concept)?;
        Some(DfAgentDescription::from_concept(nested))
    }

    fn handle_register(&mut self, msg: AclMessage) {
        let Some(description) = self.extract_description(&msg) else {
            warn!(sender = %msg.sender, "df: malformed register-service-request");
            return actor::send(&self.registry, msg.create_reply(Performative::Failure));
        };
        info!(agent = ?description.agent_name, "df: registered");
        self.records.push(description);
        actor::send(&self.registry, msg.create_reply(Performative::Inform));
    }

    fn handle_deregister(&mut self, msg: AclMessage) {
        let Some(template) = self.extract_description(&msg) else {
            warn!(sender = %msg.sender, "df: malformed deregister-service-request");
            return actor::send(&self.registry, msg.create_reply(Performative::Failure));
        };
        let before = self.records.len();
        self.records.retain(|item| !item.matches(&template, true));
        debug!(removed = before - self.records.len(), "df: deregistered");
        actor::send(&self.registry, msg.create_reply(Performative::Inform));
    }

    fn handle_search(&mut self, msg: AclMessage) {
        let Some(template) = self.extract_description(&msg) else {
            warn!(sender = %msg.sender, "df: malformed search-service-request");
            return actor::send(&self.registry, msg.create_reply(Performative::Failure));
        };
        let mut response = Concept::new(ACTION_SEARCH_SERVICE_RESPONSE);
        for record in self.records.iter().filter(|item| item.matches(&template, false)) {
            response = response.with_nested("result", record.to_concept());
        }
        let mut reply = msg.create_reply(Performative::Inform);
        self.content
            .fill(DF_ONTOLOGY, ACTION_SEARCH_SERVICE_RESPONSE, &response, &mut reply)
            .expect("df_ontology search-service-response schema is always registered");
        actor::send(&self.registry, reply);
    }
}

impl Actor for DirectoryFacilitator {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!(endpoint = %self.endpoint, "directory facilitator started");
    }
}

impl Handler<Deliver> for DirectoryFacilitator {
    type Result = ();

    fn handle(&mut self, Deliver(msg): Deliver, _ctx: &mut Self::Context) {
        match msg.action() {
            Some(ACTION_REGISTER_SERVICE_REQUEST) => self.handle_register(msg),
            Some(ACTION_DEREGISTER_SERVICE_REQUEST) => self.handle_deregister(msg),
            Some(ACTION_SEARCH_SERVICE_REQUEST) => self.handle_search(msg),
            other => warn!(action = ?other, sender = %msg.sender, "df: unhandled action"),
        }
    }
}

/// Helper shared by every agent type that registers itself with the DF
/// (slot managers, per §4.4). Container agents only ever search.
pub fn register_request(
    self_endpoint: &str,
    df_endpoint: &str,
    ontology: &str,
    service: crate::content::schemas::ServiceDescription,
    content: &ContentManager,
) -> AclMessage {
    let description = DfAgentDescription::record(self_endpoint, ontology, service);
    let payload = Concept::new(ACTION_REGISTER_SERVICE_REQUEST).with_nested("df-agent-description", description.to_concept());
    let mut msg = AclMessage::new(Performative::Request, AgentId::from(self_endpoint), AgentId::from(df_endpoint));
    content
        .fill(DF_ONTOLOGY, ACTION_REGISTER_SERVICE_REQUEST, &payload, &mut msg)
        .expect("df_ontology register-service-request schema is always registered");
    msg
}

/// Build a `search-service-request` for every agent registered under
/// `ontology`, with an empty service-property filter (matches B4).
pub fn search_request(self_endpoint: &str, df_endpoint: &str, ontology: &str, content: &ContentManager) -> AclMessage {
    let template = DfAgentDescription {
        ontology: Some(ontology.to_string()),
        service: Some(crate::content::schemas::ServiceDescription::default()),
        ..Default::default()
    };
    let payload = Concept::new(ACTION_SEARCH_SERVICE_REQUEST).with_nested("df-agent-description", template.to_concept());
    let mut msg = AclMessage::new(Performative::Request, AgentId::from(self_endpoint), AgentId::from(df_endpoint));
    content
        .fill(DF_ONTOLOGY, ACTION_SEARCH_SERVICE_REQUEST, &payload, &mut msg)
        .expect("df_ontology search-service-request schema is always registered");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::schemas::{ServiceDescription, PORT_TERMINAL_ONTOLOGY};

    fn new_df() -> DirectoryFacilitator {
        DirectoryFacilitator::new("df@yard", ActorRegistry::new(), Arc::new(ContentManager::new()))
    }

    #[test]
    fn register_then_search_round_trips_a_record() {
        let mut df = new_df();
        let content = ContentManager::new();

        let register = register_request("slot0@yard", "df@yard", PORT_TERMINAL_ONTOLOGY, ServiceDescription::slot("0"), &content);
        df.handle_register(register);
        assert_eq!(df.records.len(), 1);

        let search = search_request("c1@yard", "df@yard", PORT_TERMINAL_ONTOLOGY, &content);
        let template = df.extract_description(&search).unwrap();
        let matches: Vec<_> = df.records.iter().filter(|r| r.matches(&template, false)).collect();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn deregister_removes_matching_records_by_full_axis() {
        let mut df = new_df();
        let content = ContentManager::new();
        let register = register_request("slot0@yard", "df@yard", PORT_TERMINAL_ONTOLOGY, ServiceDescription::slot("0"), &content);
        df.handle_register(register);

        let template = DfAgentDescription { agent_name: Some("slot0@yard".to_string()), ..Default::default() };
        df.records.retain(|item| !item.matches(&template, true));
        assert!(df.records.is_empty());
    }

    // Scenario S6: register three slots, search with an empty property
    // filter returns all three, deregister one by agent name leaves two.
    #[test]
    fn three_slots_register_search_then_one_deregisters() {
        let mut df = new_df();
        let content = ContentManager::new();
        for i in 0..3 {
            let endpoint = format!("slot{i}@yard");
            df.handle_register(register_request(&endpoint, "df@yard", PORT_TERMINAL_ONTOLOGY, ServiceDescription::slot(&i.to_string()), &content));
        }

        let search = search_request("c1@yard", "df@yard", PORT_TERMINAL_ONTOLOGY, &content);
        let template = df.extract_description(&search).unwrap();
        assert_eq!(df.records.iter().filter(|r| r.matches(&template, false)).count(), 3);

        let deregister_template = DfAgentDescription { agent_name: Some("slot1@yard".to_string()), ..Default::default() };
        df.records.retain(|item| !item.matches(&deregister_template, true));
        assert_eq!(df.records.iter().filter(|r| r.matches(&template, false)).count(), 2);
    }

    // §9: search intentionally ignores the ontology axis that deregister
    // enforces. A record whose ontology differs from the search template
    // still matches search, but would survive a deregister by that template.
    #[test]
    fn search_ignores_ontology_mismatch_that_deregister_would_enforce() {
        let mut df = new_df();
        let content = ContentManager::new();
        df.handle_register(register_request("slot0@yard", "df@yard", PORT_TERMINAL_ONTOLOGY, ServiceDescription::slot("0"), &content));

        let mismatched_ontology_template = DfAgentDescription {
            ontology: Some(DF_ONTOLOGY.to_string()),
            service: Some(ServiceDescription::default()),
            ..Default::default()
        };
        assert_eq!(df.records.iter().filter(|r| r.matches(&mismatched_ontology_template, false)).count(), 1);
        assert_eq!(df.records.iter().filter(|r| r.matches(&mismatched_ontology_template, true)).count(), 0);
    }
}
