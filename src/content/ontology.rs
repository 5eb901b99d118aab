// content/ontology.rs - Content element tree and ontology schemas
//
//! A `Concept` is the generic, self-describing payload tree every action
//! marshals to: a name plus an ordered list of named slots (key order is
//! preserved so the wire codec can emit/parse key-ordered nesting, §4.1).
//! An `Ontology` maps action keys to the `Schema` used by `extract` to
//! coerce numeric-looking strings back to integers.

use std::collections::HashMap;

/// A single value inside a concept: either a leaf or a nested concept.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Integer(i64),
    String(String),
    Nested(Concept),
}

impl Term {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Term::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_concept(&self) -> Option<&Concept> {
        match self {
            Term::Nested(c) => Some(c),
            _ => None,
        }
    }
}

/// A named, ordered set of slots. The root concept's name is the action key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Concept {
    pub name: String,
    pub slots: Vec<(String, Term)>,
}

impl Concept {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), slots: Vec::new() }
    }

    pub fn with_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.push((key.into(), Term::String(value.into())));
        self
    }

    pub fn with_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.slots.push((key.into(), Term::Integer(value)));
        self
    }

    pub fn with_nested(mut self, key: impl Into<String>, value: Concept) -> Self {
        self.slots.push((key.into(), Term::Nested(value)));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Term> {
        self.slots.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// The declared shape of a field inside a `Schema`, used only to decide
/// whether `extract` coerces a slot's string form to an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Integer,
    String,
    Nested,
}

#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: String,
    pub kind: SchemaKind,
}

impl SchemaField {
    pub fn int(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: SchemaKind::Integer }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: SchemaKind::String }
    }

    pub fn nested(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: SchemaKind::Nested }
    }
}

/// Schema for one action key: its field list, in declaration order.
#[derive(Debug, Clone)]
pub struct Schema {
    pub action: String,
    pub fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new(action: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self { action: action.into(), fields }
    }

    /// Coerce every field the schema declares `Integer` from its wire string
    /// form back to an integer term, in place. A `Nested` field recurses into
    /// whatever schema the owning ontology has registered under that nested
    /// concept's own name, so integers inside e.g. `container-data` embedded
    /// in `allocation-request` get coerced too, not just top-level fields.
    pub fn coerce(&self, concept: &mut Concept, ontology: &dyn Ontology) {
        for field in &self.fields {
            match field.kind {
                SchemaKind::Integer => {
                    if let Some((_, term)) = concept.slots.iter_mut().find(|(k, _)| k == &field.name) {
                        if let Term::String(s) = term {
                            if let Ok(n) = s.parse::<i64>() {
                                *term = Term::Integer(n);
                            }
                        }
                    }
                }
                SchemaKind::Nested => {
                    if let Some((_, Term::Nested(inner))) = concept.slots.iter_mut().find(|(k, _)| k == &field.name) {
                        if let Some(inner_schema) = ontology.schema(&inner.name) {
                            inner_schema.coerce(inner, ontology);
                        }
                    }
                }
                SchemaKind::String => {}
            }
        }
    }
}

/// A named registry mapping action keys to schemas (§4.1).
pub trait Ontology: Send + Sync {
    fn name(&self) -> &str;
    fn schema(&self, action: &str) -> Option<&Schema>;
}

pub struct StaticOntology {
    name: String,
    schemas: HashMap<String, Schema>,
}

impl StaticOntology {
    pub fn new(name: impl Into<String>, schemas: Vec<Schema>) -> Self {
        let mut map = HashMap::new();
        for s in schemas {
            map.insert(s.action.clone(), s);
        }
        Self { name: name.into(), schemas: map }
    }
}

impl Ontology for StaticOntology {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self, action: &str) -> Option<&Schema> {
        self.schemas.get(action)
    }
}

#[derive(Default)]
pub struct OntologyRegistry {
    ontologies: HashMap<String, Box<dyn Ontology>>,
}

impl OntologyRegistry {
    pub fn new() -> Self {
        Self { ontologies: HashMap::new() }
    }

    pub fn register(&mut self, ontology: Box<dyn Ontology>) {
        self.ontologies.insert(ontology.name().to_string(), ontology);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Ontology> {
        self.ontologies.get(name).map(|b| b.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_coerces_only_declared_integer_fields() {
        let schema = Schema::new("container-data", vec![
            SchemaField::string("id"),
            SchemaField::int("departure_time"),
        ]);
        let mut concept = Concept::new("container-data")
            .with_str("id", "c1")
            .with_str("departure_time", "42");
        let ontology = StaticOntology::new("test_ontology", vec![schema.clone()]);
        schema.coerce(&mut concept, &ontology);

        assert_eq!(concept.get("id"), Some(&Term::String("c1".into())));
        assert_eq!(concept.get("departure_time"), Some(&Term::Integer(42)));
    }

    #[test]
    fn schema_coerces_integers_inside_a_nested_concept() {
        let inner = Schema::new("container-data", vec![SchemaField::string("id"), SchemaField::int("departure_time")]);
        let outer = Schema::new("allocation-request", vec![SchemaField::nested("container-data")]);
        let ontology = StaticOntology::new("port_terminal_ontology", vec![inner, outer.clone()]);

        let nested = Concept::new("container-data").with_str("id", "c1").with_str("departure_time", "1234");
        let mut concept = Concept::new("allocation-request").with_nested("container-data", nested);
        outer.coerce(&mut concept, &ontology);

        let nested = concept.get("container-data").and_then(Term::as_concept).unwrap();
        assert_eq!(nested.get("departure_time"), Some(&Term::Integer(1234)));
    }

    #[test]
    fn registry_round_trips_a_schema_lookup() {
        let mut registry = OntologyRegistry::new();
        registry.register(Box::new(StaticOntology::new(
            "port_terminal_ontology",
            vec![Schema::new("container-data", vec![SchemaField::string("id")])],
        )));

        let ontology = registry.get("port_terminal_ontology").expect("registered");
        assert!(ontology.schema("container-data").is_some());
        assert!(ontology.schema("unknown-action").is_none());
    }
}
