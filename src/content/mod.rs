// content/mod.rs - Message & Ontology Layer (C1)
//
//! The content manager owns a set of ontologies and a codec registry, and
//! exposes the two operations every agent uses to speak: `fill` marshals a
//! `Concept` to an ACL message body and tags the message's `language`,
//! `ontology`, and `action` metadata; `extract` reverses that, consulting
//! the schema to coerce numeric-looking strings back to integers.

pub mod codec;
pub mod ontology;
pub mod schemas;
pub mod xml_codec;

pub use codec::{Codec, CodecError, CodecRegistry};
pub use ontology::{Concept, Ontology, OntologyRegistry, Schema, SchemaField, SchemaKind, Term};
pub use xml_codec::XmlCodec;

use crate::acl::{AclMessage, META_ACTION, META_LANGUAGE, META_ONTOLOGY};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unknown ontology: {0}")]
    UnknownOntology(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("malformed content: {0}")]
    MalformedContent(String),
}

pub const DEFAULT_LANGUAGE: &str = "xml";

pub struct ContentManager {
    ontologies: OntologyRegistry,
    codecs: CodecRegistry,
    default_codec: String,
}

impl ContentManager {
    pub fn new() -> Self {
        let mut codecs = CodecRegistry::new();
        codecs.register(Arc::new(XmlCodec::new()));

        let mut ontologies = OntologyRegistry::new();
        ontologies.register(Box::new(schemas::df_ontology()));
        ontologies.register(Box::new(schemas::port_terminal_ontology()));

        Self { ontologies, codecs, default_codec: DEFAULT_LANGUAGE.to_string() }
    }

    /// Marshal `concept` into `msg`'s body and tag `ontology`/`action`/`language`.
    pub fn fill(&self, ontology_name: &str, action: &str, concept: &Concept, msg: &mut AclMessage) -> Result<(), ContentError> {
        let ontology = self.ontologies.get(ontology_name).ok_or_else(|| ContentError::UnknownOntology(ontology_name.to_string()))?;
        ontology.schema(action).ok_or_else(|| ContentError::UnknownAction(action.to_string()))?;

        let codec = self.codecs.get(&self.default_codec).expect("default codec is always registered");
        msg.body = codec.encode(concept);
        msg.metadata.insert(META_ONTOLOGY.to_string(), ontology_name.to_string());
        msg.metadata.insert(META_ACTION.to_string(), action.to_string());
        msg.metadata.insert(META_LANGUAGE.to_string(), self.default_codec.clone());
        Ok(())
    }

    /// Look up the ontology and action tag on `msg`, deserialize the body,
    /// and coerce integer fields per the action's schema.
    pub fn extract(&self, msg: &AclMessage) -> Result<Concept, ContentError> {
        let ontology_name = msg.ontology().ok_or_else(|| ContentError::UnknownOntology("<missing>".to_string()))?;
        let ontology = self.ontologies.get(ontology_name).ok_or_else(|| ContentError::UnknownOntology(ontology_name.to_string()))?;

        let action = msg.action().ok_or_else(|| ContentError::UnknownAction("<missing>".to_string()))?;
        let schema = ontology.schema(action).ok_or_else(|| ContentError::UnknownAction(action.to_string()))?;

        let codec = self.codecs.get(&self.default_codec).expect("default codec is always registered");
        let mut concept = codec.decode(&msg.body).map_err(|e| ContentError::MalformedContent(e.to_string()))?;
        schema.coerce(&mut concept, ontology);
        Ok(concept)
    }
}

impl Default for ContentManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{AgentId, Performative};
    use schemas::{ContainerData, ACTION_ALLOCATION_REQUEST, PORT_TERMINAL_ONTOLOGY};

    #[test]
    fn fill_then_extract_round_trips_a_container_data_payload() {
        let manager = ContentManager::new();
        let mut msg = AclMessage::new(Performative::Cfp, AgentId::from("c1@yard"), AgentId::from("s1@yard"));

        let container = ContainerData { id: "c1".into(), departure_time: 1234 };
        let payload = Concept::new(ACTION_ALLOCATION_REQUEST).with_nested("container-data", container.to_concept());
        manager.fill(PORT_TERMINAL_ONTOLOGY, ACTION_ALLOCATION_REQUEST, &payload, &mut msg).unwrap();

        assert_eq!(msg.ontology(), Some(PORT_TERMINAL_ONTOLOGY));
        assert_eq!(msg.action(), Some(ACTION_ALLOCATION_REQUEST));
        assert_eq!(msg.metadata.get(META_LANGUAGE).map(String::as_str), Some("xml"));

        let extracted = manager.extract(&msg).unwrap();
        let nested = extracted.get("container-data").and_then(Term::as_concept).unwrap();
        let back = ContainerData::from_concept(nested).unwrap();
        assert_eq!(back, container);
    }

    #[test]
    fn extract_reports_unknown_ontology_and_action() {
        let manager = ContentManager::new();
        let mut msg = AclMessage::new(Performative::Cfp, AgentId::from("a@yard"), AgentId::from("b@yard"));
        msg.metadata.insert(META_ONTOLOGY.to_string(), "nonexistent".to_string());
        msg.metadata.insert(META_ACTION.to_string(), ACTION_ALLOCATION_REQUEST.to_string());
        assert!(matches!(manager.extract(&msg), Err(ContentError::UnknownOntology(_))));

        msg.metadata.insert(META_ONTOLOGY.to_string(), PORT_TERMINAL_ONTOLOGY.to_string());
        msg.metadata.insert(META_ACTION.to_string(), "no-such-action".to_string());
        assert!(matches!(manager.extract(&msg), Err(ContentError::UnknownAction(_))));
    }
}
