//! Entity Model
//!
//! One flat record per decoded object. The tier layering of the document
//! grammar (trackable -> identified -> node -> capabilities) is expressed as
//! plain structs; which of them a kind actually uses is declared in the
//! registry, not in the type system.
//!
//! Mutators take `&mut self` and change the entity in place. Nothing here
//! allocates a new entity behind the caller's back.

use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::options::KeyStyle;
use crate::properties::{
    Dimensions, LangValue, LangValues, MetadataEntry, Reference, ViewingDirection,
};
use crate::tracker::{FieldValue, PropertyTracker};

/// Common descriptive fields, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeFields {
    pub label: LangValues,
    pub summary: LangValues,
    pub description: LangValues,
    pub metadata: Vec<MetadataEntry>,
    pub required_statement: Option<MetadataEntry>,
    pub attribution: LangValues,
    pub rights: Option<String>,
    pub license: Vec<Reference>,
    pub logo: Vec<Reference>,
    pub thumbnail: Vec<Reference>,
    pub viewing_hint: Vec<String>,
    pub behavior: Vec<String>,
    pub rendering: Vec<Reference>,
    pub related: Vec<Reference>,
    pub homepage: Vec<Reference>,
    pub provider: Vec<Reference>,
    pub see_also: Vec<Reference>,
    pub within: Vec<Reference>,
    pub part_of: Vec<Reference>,
}

impl NodeFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Optional capability fields. Only kinds that declare the matching tier
/// may carry them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    pub dimensions: Dimensions,
    pub viewing_direction: Option<ViewingDirection>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: String,
    /// Deprecated kind name the entity was decoded through, if any.
    alias: Option<String>,
    context: Option<Value>,
    id: Option<String>,
    type_name: Option<String>,
    style: Option<KeyStyle>,
    services: Vec<Entity>,
    node: NodeFields,
    capabilities: Capabilities,
    properties: PropertyTracker,
}

impl Entity {
    /// New entity of a registered kind. The id cannot be changed afterwards.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::blank(kind.into(), Some(id.into()), None, None)
    }

    /// New entity without an id, for kinds where the id is optional.
    pub fn anonymous(kind: impl Into<String>) -> Self {
        Self::blank(kind.into(), None, None, None)
    }

    pub(crate) fn decoded(
        kind: &str,
        id: Option<String>,
        type_name: Option<String>,
        style: KeyStyle,
    ) -> Self {
        Self::blank(kind.to_string(), id, type_name, Some(style))
    }

    fn blank(
        kind: String,
        id: Option<String>,
        type_name: Option<String>,
        style: Option<KeyStyle>,
    ) -> Self {
        Self {
            kind,
            alias: None,
            context: None,
            id,
            type_name,
            style,
            services: Vec::new(),
            node: NodeFields::default(),
            capabilities: Capabilities::default(),
            properties: PropertyTracker::new(),
        }
    }

    /// Explicit type tag. Without one the kind's default tag is emitted.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_style(mut self, style: KeyStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub(crate) fn set_alias(&mut self, alias: &str) {
        self.alias = Some(alias.to_string());
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Key style this entity was read in, if any.
    pub fn style(&self) -> Option<KeyStyle> {
        self.style
    }

    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    pub fn set_context(&mut self, context: Value) {
        self.context = Some(context);
    }

    pub fn services(&self) -> &[Entity] {
        &self.services
    }

    pub fn add_service(&mut self, service: Entity) {
        self.services.push(service);
    }

    pub(crate) fn services_mut(&mut self) -> &mut Vec<Entity> {
        &mut self.services
    }

    pub fn node(&self) -> &NodeFields {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut NodeFields {
        &mut self.node
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut Capabilities {
        &mut self.capabilities
    }

    // --- Node conveniences ---

    pub fn label(&self) -> &LangValues {
        &self.node.label
    }

    /// Replaces the whole label.
    pub fn set_label(&mut self, label: impl Into<LangValues>) {
        self.node.label = label.into();
    }

    /// Adds one value to the label, keeping the existing ones.
    pub fn add_label(&mut self, value: LangValue) {
        self.node.label.push(value);
    }

    pub fn add_metadata(&mut self, entry: MetadataEntry) {
        self.node.metadata.push(entry);
    }

    pub fn add_within(&mut self, reference: Reference) {
        self.node.within.push(reference);
    }

    pub fn add_see_also(&mut self, reference: Reference) {
        self.node.see_also.push(reference);
    }

    pub fn add_thumbnail(&mut self, reference: Reference) {
        self.node.thumbnail.push(reference);
    }

    // --- Capability conveniences ---

    pub fn dimensions(&self) -> &Dimensions {
        &self.capabilities.dimensions
    }

    pub fn set_dimensions(&mut self, dimensions: Dimensions) {
        self.capabilities.dimensions = dimensions;
    }

    pub fn viewing_direction(&self) -> Option<&ViewingDirection> {
        self.capabilities.viewing_direction.as_ref()
    }

    pub fn set_viewing_direction(&mut self, direction: ViewingDirection) {
        self.capabilities.viewing_direction = Some(direction);
    }

    pub fn format(&self) -> Option<&str> {
        self.capabilities.format.as_deref()
    }

    pub fn set_format(&mut self, format: impl Into<String>) {
        self.capabilities.format = Some(format.into());
    }

    // --- Kind-declared fields ---

    pub fn properties(&self) -> &PropertyTracker {
        &self.properties
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.properties.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.properties.set(name, value)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        self.properties.remove(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_text)
    }

    /// Child entities held in a field; empty when the field is unset.
    pub fn entities(&self, name: &str) -> &[Entity] {
        self.field(name).and_then(FieldValue::as_entities).unwrap_or(&[])
    }

    /// Appends a child entity to a list field, creating the list if needed.
    ///
    /// Fails if the field already holds a value that is not an entity.
    pub fn push_entity(&mut self, name: &str, child: Entity) -> Result<(), CodecError> {
        match self.properties.get_mut(name) {
            None => {
                self.properties.set(name, FieldValue::Entities(vec![child]));
                Ok(())
            }
            Some(FieldValue::Entities(list)) => {
                list.push(child);
                Ok(())
            }
            Some(slot @ FieldValue::Entity(_)) => {
                let previous = std::mem::replace(slot, FieldValue::Entities(Vec::new()));
                if let (FieldValue::Entity(first), FieldValue::Entities(list)) = (previous, slot) {
                    list.push(*first);
                    list.push(child);
                }
                Ok(())
            }
            Some(other) => Err(CodecError::inconsistent(
                &self.kind,
                format!("field `{name}` holds a {}, not entities", other.variant_name()),
            )),
        }
    }

    // --- Overflow ---

    pub fn additional(&self) -> &Map<String, Value> {
        self.properties.additional()
    }

    pub fn set_additional(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.properties.set_additional(name, value)
    }

    pub fn remove_additional(&mut self, name: &str) -> Option<Value> {
        self.properties.remove_additional(name)
    }

    pub fn clear_additional(&mut self) {
        self.properties.clear_additional();
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertyTracker {
        &mut self.properties
    }

    // --- Graph ---

    /// Direct children: services first, then entities in declared fields.
    pub fn children(&self) -> Vec<&Entity> {
        let mut children: Vec<&Entity> = self.services.iter().collect();
        for (_, value) in self.properties.iter() {
            if let Some(list) = value.as_entities() {
                children.extend(list);
            }
        }
        children
    }

    /// Depth-first, pre-order walk starting at this entity.
    pub fn walk(&self) -> Vec<&Entity> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(entity) = stack.pop() {
            out.push(entity);
            stack.extend(entity.children().into_iter().rev());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canvas(id: &str) -> Entity {
        Entity::new("Canvas", id)
    }

    #[test]
    fn test_setters_mutate_in_place() {
        let mut manifest = Entity::new("Manifest", "https://example.org/m");
        manifest.set_additional("x-vendor", json!(1));
        manifest.set_label("Book");
        manifest.add_label(LangValue::tagged("Livre", "fr"));

        assert_eq!(manifest.label().len(), 2);
        assert_eq!(manifest.additional().get("x-vendor"), Some(&json!(1)));
        assert_eq!(manifest.id(), Some("https://example.org/m"));
    }

    #[test]
    fn test_push_entity_upgrades_single() {
        let mut annotation = Entity::new("Annotation", "a");
        annotation.set_field("body", FieldValue::Entity(Box::new(Entity::new("ImageResource", "i1"))));
        annotation.push_entity("body", Entity::new("ImageResource", "i2")).unwrap();
        let ids: Vec<_> = annotation.entities("body").iter().filter_map(Entity::id).collect();
        assert_eq!(ids, vec!["i1", "i2"]);
    }

    #[test]
    fn test_push_entity_rejects_scalar_slot() {
        let mut manifest = Entity::new("Manifest", "m");
        manifest.set_field("navDate", FieldValue::Text("2020-01-01T00:00:00Z".into()));
        assert!(manifest.push_entity("navDate", canvas("c")).is_err());
        assert_eq!(manifest.text("navDate"), Some("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn test_walk_is_preorder() {
        let mut manifest = Entity::new("Manifest", "m");
        let mut first = canvas("c1");
        first.add_service(Entity::new("Service", "s1"));
        manifest.push_entity("items", first).unwrap();
        manifest.push_entity("items", canvas("c2")).unwrap();

        let order: Vec<_> = manifest.walk().into_iter().filter_map(Entity::id).collect();
        assert_eq!(order, vec!["m", "c1", "s1", "c2"]);
    }
}
