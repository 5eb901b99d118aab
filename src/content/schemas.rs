// content/schemas.rs - DF and port-terminal ontology schemas and payloads
//
//! Typed payloads for the two required ontologies (§4.1). Each payload
//! knows how to turn itself into a `Concept` and back; the `ContentManager`
//! drives that conversion through the registered schema so `extract` can
//! report `UnknownOntology`/`UnknownAction` before ever touching a payload.

use super::ontology::{Concept, Schema, SchemaField, StaticOntology, Term};
use std::collections::BTreeMap;

pub const DF_ONTOLOGY: &str = "df_ontology";
pub const PORT_TERMINAL_ONTOLOGY: &str = "port_terminal_ontology";

pub const ACTION_REGISTER_SERVICE_REQUEST: &str = "register-service-request";
pub const ACTION_DEREGISTER_SERVICE_REQUEST: &str = "deregister-service-request";
pub const ACTION_SEARCH_SERVICE_REQUEST: &str = "search-service-request";
pub const ACTION_SEARCH_SERVICE_RESPONSE: &str = "search-service-response";

pub const ACTION_ALLOCATION_REQUEST: &str = "allocation-request";
pub const ACTION_ALLOCATION_PROPOSAL: &str = "allocation-proposal";
pub const ACTION_ALLOCATION_PROPOSAL_ACCEPTANCE: &str = "allocation-proposal-acceptance";
pub const ACTION_ALLOCATION_CONFIRMATION: &str = "allocation-confirmation";
pub const ACTION_SELF_DEALLOCATION_REQUEST: &str = "self-deallocation-request";
pub const ACTION_REALLOCATION_REQUEST: &str = "reallocation-request";
pub const ACTION_CONTAINERS_DEALLOCATION_REQUEST: &str = "containers-deallocation-request";
pub const ACTION_DEALLOCATION_REQUEST: &str = "deallocation-request";

/// A service description: `slot_id` for slot managers, extensible string map
/// otherwise (§3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceDescription {
    pub properties: BTreeMap<String, String>,
}

impl ServiceDescription {
    pub fn slot(slot_id: &str) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("slot_id".to_string(), slot_id.to_string());
        Self { properties }
    }

    fn to_concept(&self, name: &str) -> Concept {
        let mut concept = Concept::new(name);
        for (k, v) in &self.properties {
            concept.slots.push((k.clone(), Term::String(v.clone())));
        }
        concept
    }

    fn from_concept(concept: &Concept) -> Self {
        let properties = concept
            .slots
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();
        Self { properties }
    }
}

/// A DF registration record, matched by §4.2's conjunctive template rule.
/// Any field left `None` is a template wildcard; `service` with an empty
/// property map matches any record that carries a service description (B4).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DfAgentDescription {
    pub agent_name: Option<String>,
    pub ontology: Option<String>,
    pub language: Option<String>,
    pub interaction_protocol: Option<String>,
    pub service: Option<ServiceDescription>,
}

impl DfAgentDescription {
    pub fn record(agent_name: &str, ontology: &str, service: ServiceDescription) -> Self {
        Self {
            agent_name: Some(agent_name.to_string()),
            ontology: Some(ontology.to_string()),
            language: Some("xml".to_string()),
            interaction_protocol: None,
            service: Some(service),
        }
    }

    pub fn to_concept(&self) -> Concept {
        let mut concept = Concept::new("df-agent-description");
        if let Some(v) = &self.agent_name {
            concept = concept.with_str("agent_name", v.clone());
        }
        if let Some(v) = &self.ontology {
            concept = concept.with_str("ontology", v.clone());
        }
        if let Some(v) = &self.language {
            concept = concept.with_str("language", v.clone());
        }
        if let Some(v) = &self.interaction_protocol {
            concept = concept.with_str("interaction_protocol", v.clone());
        }
        if let Some(service) = &self.service {
            concept = concept.with_nested("service-description", service.to_concept("service-description"));
        }
        concept
    }

    pub fn from_concept(concept: &Concept) -> Self {
        Self {
            agent_name: concept.get("agent_name").and_then(Term::as_str).map(String::from),
            ontology: concept.get("ontology").and_then(Term::as_str).map(String::from),
            language: concept.get("language").and_then(Term::as_str).map(String::from),
            interaction_protocol: concept.get("interaction_protocol").and_then(Term::as_str).map(String::from),
            service: concept.get("service-description").and_then(Term::as_concept).map(ServiceDescription::from_concept),
        }
    }

    /// The matching relation M(item, template) for both search and
    /// deregister; `compare_ontology_and_protocol` selects which axes beyond
    /// agent-name + service-properties-containment also apply (§4.2, §9).
    pub fn matches(&self, template: &DfAgentDescription, compare_ontology_and_protocol: bool) -> bool {
        if let Some(name) = &template.agent_name {
            if self.agent_name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        if compare_ontology_and_protocol {
            if let Some(ont) = &template.ontology {
                if self.ontology.as_deref() != Some(ont.as_str()) {
                    return false;
                }
            }
            if let Some(lang) = &template.language {
                if self.language.as_deref() != Some(lang.as_str()) {
                    return false;
                }
            }
            if let Some(proto) = &template.interaction_protocol {
                if self.interaction_protocol.as_deref() != Some(proto.as_str()) {
                    return false;
                }
            }
        }
        if let Some(template_service) = &template.service {
            let Some(item_service) = &self.service else { return false };
            for (k, v) in &template_service.properties {
                if item_service.properties.get(k) != Some(v) {
                    return false;
                }
            }
        }
        true
    }
}

/// Container descriptor (§3): id and scheduled departure time in whole
/// seconds since epoch (monotonic-clock comparable within one deployment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerData {
    pub id: String,
    pub departure_time: i64,
}

impl ContainerData {
    pub fn to_concept(&self) -> Concept {
        Concept::new("container-data").with_str("id", self.id.clone()).with_int("departure_time", self.departure_time)
    }

    pub fn from_concept(concept: &Concept) -> Option<Self> {
        let id = concept.get("id").and_then(Term::as_str)?.to_string();
        let departure_time = concept.get("departure_time").and_then(Term::as_int)?;
        Some(Self { id, departure_time })
    }
}

/// `allocation-proposal(slot_id, E)` (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationProposal {
    pub slot_id: String,
    pub evaluation: i64,
}

impl AllocationProposal {
    pub fn to_concept(&self) -> Concept {
        Concept::new(ACTION_ALLOCATION_PROPOSAL)
            .with_str("slot_id", self.slot_id.clone())
            .with_int("evaluation", self.evaluation)
    }

    pub fn from_concept(concept: &Concept) -> Option<Self> {
        Some(Self {
            slot_id: concept.get("slot_id").and_then(Term::as_str)?.to_string(),
            evaluation: concept.get("evaluation").and_then(Term::as_int)?,
        })
    }
}

/// Opaque list of container endpoints carried by `containers-deallocation-
/// request` (§4.6, §9 — kept as endpoints, not split into a separate "id").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainersDeallocationRequest {
    pub container_jids: Vec<String>,
}

impl ContainersDeallocationRequest {
    pub fn to_concept(&self) -> Concept {
        let mut concept = Concept::new(ACTION_CONTAINERS_DEALLOCATION_REQUEST);
        for jid in &self.container_jids {
            concept.slots.push(("jid".to_string(), Term::String(jid.clone())));
        }
        concept
    }

    pub fn from_concept(concept: &Concept) -> Self {
        let container_jids = concept.slots.iter().filter(|(k, _)| k == "jid").filter_map(|(_, v)| v.as_str().map(str::to_string)).collect();
        Self { container_jids }
    }
}

pub fn df_ontology() -> StaticOntology {
    StaticOntology::new(
        DF_ONTOLOGY,
        vec![
            Schema::new(ACTION_REGISTER_SERVICE_REQUEST, vec![SchemaField::nested("df-agent-description")]),
            Schema::new(ACTION_DEREGISTER_SERVICE_REQUEST, vec![SchemaField::nested("df-agent-description")]),
            Schema::new(ACTION_SEARCH_SERVICE_REQUEST, vec![SchemaField::nested("df-agent-description")]),
            // Repeated top-level "result" slots (platform/df.rs), not a
            // single nested field - nothing here needs integer coercion.
            Schema::new(ACTION_SEARCH_SERVICE_RESPONSE, vec![]),
        ],
    )
}

pub fn port_terminal_ontology() -> StaticOntology {
    StaticOntology::new(
        PORT_TERMINAL_ONTOLOGY,
        vec![
            Schema::new("container-data", vec![SchemaField::string("id"), SchemaField::int("departure_time")]),
            Schema::new(ACTION_ALLOCATION_REQUEST, vec![SchemaField::nested("container-data")]),
            Schema::new(
                ACTION_ALLOCATION_PROPOSAL,
                vec![SchemaField::string("slot_id"), SchemaField::int("evaluation")],
            ),
            Schema::new(ACTION_ALLOCATION_PROPOSAL_ACCEPTANCE, vec![SchemaField::nested("container-data")]),
            Schema::new(ACTION_ALLOCATION_CONFIRMATION, vec![SchemaField::string("slot_id")]),
            Schema::new(ACTION_SELF_DEALLOCATION_REQUEST, vec![SchemaField::string("container_id")]),
            Schema::new(ACTION_REALLOCATION_REQUEST, vec![SchemaField::string("origin_slot_id")]),
            Schema::new(ACTION_CONTAINERS_DEALLOCATION_REQUEST, vec![]),
            Schema::new(ACTION_DEALLOCATION_REQUEST, vec![SchemaField::string("container_id")]),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn df_description_round_trips_through_concept() {
        let desc = DfAgentDescription::record("slot1@yard", PORT_TERMINAL_ONTOLOGY, ServiceDescription::slot("1"));
        let concept = desc.to_concept();
        let back = DfAgentDescription::from_concept(&concept);
        assert_eq!(back, desc);
    }

    #[test]
    fn search_ignores_ontology_axis_but_deregister_does_not() {
        let item = DfAgentDescription::record("slot1@yard", "other_ontology", ServiceDescription::slot("1"));
        let template = DfAgentDescription {
            ontology: Some(PORT_TERMINAL_ONTOLOGY.to_string()),
            ..Default::default()
        };

        assert!(item.matches(&template, false), "search ignores the ontology axis");
        assert!(!item.matches(&template, true), "deregister checks the ontology axis");
    }

    #[test]
    fn empty_service_template_matches_any_record_with_a_service() {
        let item = DfAgentDescription::record("slot1@yard", PORT_TERMINAL_ONTOLOGY, ServiceDescription::slot("1"));
        let template = DfAgentDescription { service: Some(ServiceDescription::default()), ..Default::default() };
        assert!(item.matches(&template, false));
    }

    #[test]
    fn container_data_round_trips() {
        let data = ContainerData { id: "c1".into(), departure_time: 1000 };
        let concept = data.to_concept();
        assert_eq!(ContainerData::from_concept(&concept), Some(data));
    }

    #[test]
    fn containers_deallocation_request_round_trips_a_jid_list() {
        let request = ContainersDeallocationRequest { container_jids: vec!["c1@yard".into(), "c2@yard".into()] };
        let concept = request.to_concept();
        assert_eq!(ContainersDeallocationRequest::from_concept(&concept), request);
    }
}
