//! Object Reader
//!
//! Decode-side view of one raw JSON object. Tiers claim the members they
//! understand; whatever is left is the overflow handed to the tracker.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::CodecError;
use crate::options::KeyStyle;
use crate::shape::value_shape;

/// Identity keywords whose spelling depends on the key style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Id,
    Type,
}

impl Keyword {
    pub fn key(self, style: KeyStyle) -> &'static str {
        match self {
            Self::Id => style.id_key(),
            Self::Type => style.type_key(),
        }
    }

    /// Maps a mandatory-field name onto a keyword.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "id" | "@id" => Some(Self::Id),
            "type" | "@type" => Some(Self::Type),
            _ => None,
        }
    }
}

pub struct ObjectReader<'a> {
    owner: String,
    object: &'a Map<String, Value>,
    claimed: HashSet<String>,
    style: KeyStyle,
}

impl<'a> ObjectReader<'a> {
    /// Wraps a raw value, which must be an object.
    pub fn new(
        owner: &str,
        value: &'a Value,
        fallback_style: KeyStyle,
    ) -> Result<Self, CodecError> {
        let object = value
            .as_object()
            .ok_or_else(|| CodecError::shape(owner, "(self)", "object", value_shape(value)))?;
        Ok(Self::from_map(owner, object, fallback_style))
    }

    pub fn from_map(owner: &str, object: &'a Map<String, Value>, fallback_style: KeyStyle) -> Self {
        Self {
            owner: owner.to_string(),
            object,
            claimed: HashSet::new(),
            style: KeyStyle::detect(object).unwrap_or(fallback_style),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Re-labels the owner once polymorphic dispatch has picked a kind.
    pub(crate) fn set_owner(&mut self, owner: &str) {
        self.owner = owner.to_string();
    }

    pub fn style(&self) -> KeyStyle {
        self.style
    }

    pub fn raw(&self) -> &'a Map<String, Value> {
        self.object
    }

    pub fn contains(&self, name: &str) -> bool {
        match Keyword::from_field(name) {
            Some(keyword) => self.peek_keyword(keyword).is_some(),
            None => self.object.contains_key(name),
        }
    }

    /// Looks at a member without claiming it.
    pub fn peek(&self, name: &str) -> Option<&'a Value> {
        self.object.get(name)
    }

    pub fn peek_keyword(&self, keyword: Keyword) -> Option<&'a Value> {
        self.object.get(keyword.key(self.style))
    }

    /// Takes ownership of a member so it is not reported as overflow.
    pub fn claim(&mut self, name: &str) -> Option<&'a Value> {
        let value = self.object.get(name)?;
        self.claimed.insert(name.to_string());
        Some(value)
    }

    pub fn claim_keyword(&mut self, keyword: Keyword) -> Option<&'a Value> {
        self.claim(keyword.key(self.style))
    }

    pub fn require(&mut self, name: &str) -> Result<&'a Value, CodecError> {
        let owner = self.owner.clone();
        self.claim(name).ok_or_else(|| CodecError::missing(&owner, name))
    }

    /// Claims a member that must be a string.
    pub fn claim_str(&mut self, name: &str) -> Result<Option<&'a str>, CodecError> {
        match self.claim(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(CodecError::shape(&self.owner, name, "string", value_shape(other))),
        }
    }

    /// Unclaimed members in original input order, with their raw values.
    pub fn remaining(&self) -> Map<String, Value> {
        self.object
            .iter()
            .filter(|(k, _)| !self.claimed.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remaining_preserves_input_order() {
        let raw = json!({"zeta": 1, "id": "x", "alpha": 2, "label": "L", "mid": 3});
        let mut reader = ObjectReader::new("Manifest", &raw, KeyStyle::Bare).unwrap();
        reader.claim_keyword(Keyword::Id);
        reader.claim("label");

        let keys: Vec<_> = reader.remaining().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_prefixed_style_detected() {
        let raw = json!({"@id": "x", "@type": "sc:Manifest"});
        let mut reader = ObjectReader::new("Manifest", &raw, KeyStyle::Bare).unwrap();
        assert_eq!(reader.style(), KeyStyle::Prefixed);
        assert_eq!(reader.claim_keyword(Keyword::Id), Some(&json!("x")));
        assert!(reader.contains("type"));
    }

    #[test]
    fn test_non_object_is_shape_mismatch() {
        let raw = json!(["not", "an", "object"]);
        let err = ObjectReader::new("Canvas", &raw, KeyStyle::Bare).err().unwrap();
        match err {
            CodecError::ShapeMismatch { expected_shape, actual_shape, .. } => {
                assert_eq!(expected_shape, "object");
                assert_eq!(actual_shape, "array");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_require_reports_owner() {
        let raw = json!({"id": "x"});
        let mut reader = ObjectReader::new("Sequence", &raw, KeyStyle::Bare).unwrap();
        let err = reader.require("canvases").unwrap_err();
        assert_eq!(err.owner_type(), Some("Sequence"));
        assert_eq!(err.field(), Some("canvases"));
    }
}
