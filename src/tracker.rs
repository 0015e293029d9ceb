//! Property Tracker
//!
//! Per-entity ordered store of kind-declared field values plus the overflow
//! set of input members no tier recognized. Neither half ever drops data on
//! its own: values leave only through an explicit `remove`/`clear`.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Number, Value};

use crate::entity::Entity;
use crate::properties::{LangValues, Reference};

/// Typed value held in a tracker slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(Number),
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    Texts(Vec<String>),
    LangValues(LangValues),
    Reference(Reference),
    References(Vec<Reference>),
    Entity(Box<Entity>),
    Entities(Vec<Entity>),
    Raw(Value),
}

impl FieldValue {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::DateTime(_) => "date-time",
            Self::Texts(_) => "text list",
            Self::LangValues(_) => "language values",
            Self::Reference(_) => "reference",
            Self::References(_) => "reference list",
            Self::Entity(_) => "entity",
            Self::Entities(_) => "entity list",
            Self::Raw(_) => "raw JSON",
        }
    }

    /// Collections with no members count as empty; scalars never do.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Texts(v) => v.is_empty(),
            Self::LangValues(v) => v.is_empty(),
            Self::References(v) => v.is_empty(),
            Self::Entities(v) => v.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entities(&self) -> Option<&[Entity]> {
        match self {
            Self::Entities(v) => Some(v),
            Self::Entity(e) => Some(std::slice::from_ref(e.as_ref())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTracker {
    slots: Vec<(String, FieldValue)>,
    additional: Map<String, Value>,
}

impl PropertyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or overwrites a slot. Returns the previous value.
    ///
    /// Overwriting keeps the slot's original position.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        let name = name.into();
        match self.slots.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.slots.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.slots.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.slots.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.slots.iter().position(|(n, _)| n == name)?;
        Some(self.slots.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.slots.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Unrecognized input members, in original input order.
    pub fn additional(&self) -> &Map<String, Value> {
        &self.additional
    }

    pub fn set_additional(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.additional.insert(name.into(), value)
    }

    pub fn remove_additional(&mut self, name: &str) -> Option<Value> {
        // Rebuild so the remaining members keep their input order.
        let value = self.additional.get(name).cloned()?;
        self.additional = std::mem::take(&mut self.additional)
            .into_iter()
            .filter(|(k, _)| k != name)
            .collect();
        Some(value)
    }

    pub fn clear_additional(&mut self) {
        self.additional.clear();
    }

    pub(crate) fn extend_additional(&mut self, members: Map<String, Value>) {
        for (name, value) in members {
            self.additional.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_overwrites_in_place() {
        let mut tracker = PropertyTracker::new();
        tracker.set("navDate", FieldValue::Text("a".into()));
        tracker.set("start", FieldValue::Text("b".into()));
        let previous = tracker.set("navDate", FieldValue::Text("c".into()));

        assert_eq!(previous, Some(FieldValue::Text("a".into())));
        let names: Vec<_> = tracker.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["navDate", "start"]);
        assert_eq!(tracker.get("navDate").and_then(FieldValue::as_text), Some("c"));
    }

    #[test]
    fn test_get_absent_is_none() {
        let tracker = PropertyTracker::new();
        assert!(tracker.get("missing").is_none());
    }

    #[test]
    fn test_untouched_slots_survive_mutation() {
        let mut tracker = PropertyTracker::new();
        tracker.set("a", FieldValue::Integer(1));
        tracker.set("b", FieldValue::Integer(2));
        tracker.set_additional("x-vendor", json!({"k": true}));

        tracker.set("a", FieldValue::Integer(10));
        tracker.remove("a");

        assert_eq!(tracker.get("b"), Some(&FieldValue::Integer(2)));
        assert_eq!(tracker.additional().get("x-vendor"), Some(&json!({"k": true})));
    }

    #[test]
    fn test_remove_additional_keeps_order() {
        let mut tracker = PropertyTracker::new();
        tracker.set_additional("z", json!(1));
        tracker.set_additional("a", json!(2));
        tracker.set_additional("m", json!(3));

        assert_eq!(tracker.remove_additional("a"), Some(json!(2)));
        let keys: Vec<_> = tracker.additional().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "m"]);
    }

    #[test]
    fn test_empty_collections() {
        assert!(FieldValue::Entities(vec![]).is_empty());
        assert!(!FieldValue::Integer(0).is_empty());
    }
}
