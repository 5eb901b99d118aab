// content/codec.rs - Content Language Codecs
//
//! Codec interface for turning a `Concept` tree into message body text and
//! back. A codec is self-describing: decoding never needs a schema, only
//! the schema tells `extract` which string fields to coerce to integers.

use super::ontology::Concept;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected '{expected}' at byte {pos}, found {found:?}")]
    Expected {
        expected: char,
        pos: usize,
        found: Option<char>,
    },

    #[error("mismatched closing tag: expected '{expected}', found '{found}'")]
    MismatchedTag { expected: String, found: String },
}

/// Codec trait for encoding/decoding content
pub trait Codec: Send + Sync {
    /// Get the codec name for registration
    fn name(&self) -> &str;

    /// Encode a concept to a self-describing text body
    fn encode(&self, concept: &Concept) -> String;

    /// Decode a text body to a concept tree
    fn decode(&self, text: &str) -> Result<Concept, CodecError>;
}

/// Registry of available codecs
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Register a codec
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        let name = codec.name().to_string();
        self.codecs.insert(name, codec);
    }

    /// Get a codec by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(name).cloned()
    }

    /// List all registered codec names
    pub fn list(&self) -> Vec<String> {
        self.codecs.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_starts_empty() {
        let registry = CodecRegistry::new();
        assert!(registry.list().is_empty());
    }
}
