// content/xml_codec.rs - hand-rolled XML content codec
//
//! The default wire codec. Encodes a `Concept` as nested tags, root element
//! named after the action key, children in slot order; integers serialize
//! as bare digits, strings as escaped text, nested concepts recurse. This
//! is a minimal, non-validating XML-like format: no attributes, no
//! namespaces, no entity set beyond the five XML predefined ones.

use super::codec::{Codec, CodecError};
use super::ontology::{Concept, Term};

pub struct XmlCodec;

impl XmlCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode_concept(out: &mut String, concept: &Concept) {
        out.push('<');
        out.push_str(&concept.name);
        out.push('>');
        for (key, value) in &concept.slots {
            out.push('<');
            out.push_str(key);
            out.push('>');
            match value {
                Term::Integer(n) => out.push_str(&n.to_string()),
                Term::String(s) => out.push_str(&escape(s)),
                Term::Nested(c) => Self::encode_concept(out, c),
            }
            out.push_str("</");
            out.push_str(key);
            out.push('>');
        }
        out.push_str("</");
        out.push_str(&concept.name);
        out.push('>');
    }
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for XmlCodec {
    fn name(&self) -> &str {
        "xml"
    }

    fn encode(&self, concept: &Concept) -> String {
        let mut out = String::new();
        Self::encode_concept(&mut out, concept);
        out
    }

    fn decode(&self, text: &str) -> Result<Concept, CodecError> {
        let mut parser = XmlParser::new(text);
        let element = parser.parse_element()?;
        Ok(element)
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Recursive-descent parser for the tag subset `encode_concept` emits.
struct XmlParser {
    chars: Vec<char>,
    pos: usize,
}

impl XmlParser {
    fn new(src: &str) -> Self {
        Self { chars: src.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expect(&mut self, expected: char) -> Result<(), CodecError> {
        match self.advance() {
            Some(c) if c == expected => Ok(()),
            found => Err(CodecError::Expected { expected, pos: self.pos, found }),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c != '>' && c != '<' && !c.is_whitespace()) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Parses `<name>...</name>`, where `...` is either nested elements or
    /// plain text — never both, matching what `encode_concept` produces.
    fn parse_element(&mut self) -> Result<Concept, CodecError> {
        self.skip_whitespace();
        self.expect('<')?;
        let name = self.parse_name();
        self.expect('>')?;

        let mut concept = Concept::new(name.clone());
        self.skip_whitespace();

        while self.peek() == Some('<') && self.chars.get(self.pos + 1) != Some(&'/') {
            self.expect('<')?;
            let key = self.parse_name();
            self.expect('>')?;

            self.skip_whitespace();
            let value = if self.peek() == Some('<') && self.chars.get(self.pos + 1) != Some(&'/') {
                Term::Nested(self.parse_element()?)
            } else {
                let text = self.parse_text();
                Term::String(unescape(&text))
            };

            self.skip_whitespace();
            self.expect('<')?;
            self.expect('/')?;
            let closing = self.parse_name();
            if closing != key {
                return Err(CodecError::MismatchedTag { expected: key, found: closing });
            }
            self.expect('>')?;
            self.skip_whitespace();

            concept.slots.push((key, value));
        }

        self.expect('<')?;
        self.expect('/')?;
        let closing = self.parse_name();
        if closing != name {
            return Err(CodecError::MismatchedTag { expected: name, found: closing });
        }
        self.expect('>')?;

        Ok(concept)
    }

    fn parse_text(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c != '<') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_flat_concept_as_nested_tags() {
        let concept = Concept::new("container-data").with_str("id", "c1").with_int("departure_time", 42);
        let xml = XmlCodec::new().encode(&concept);
        assert_eq!(xml, "<container-data><id>c1</id><departure_time>42</departure_time></container-data>");
    }

    #[test]
    fn round_trips_a_nested_concept() {
        let inner = Concept::new("container-data").with_str("id", "c1").with_int("departure_time", 42);
        let outer = Concept::new("allocation-request").with_nested("container-data", inner.clone());

        let codec = XmlCodec::new();
        let xml = codec.encode(&outer);
        let decoded = codec.decode(&xml).expect("valid xml");

        assert_eq!(decoded.name, "allocation-request");
        let nested = decoded.get("container-data").and_then(Term::as_concept).expect("nested concept");
        assert_eq!(nested.get("id").and_then(Term::as_str), Some("c1"));
    }

    #[test]
    fn escapes_and_unescapes_reserved_characters() {
        let concept = Concept::new("note").with_str("text", "a < b & c");
        let codec = XmlCodec::new();
        let xml = codec.encode(&concept);
        let decoded = codec.decode(&xml).expect("valid xml");
        assert_eq!(decoded.get("text").and_then(Term::as_str), Some("a < b & c"));
    }
}
