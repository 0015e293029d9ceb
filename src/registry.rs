//! Entity Registry - Kind Contracts
//!
//! A kind spec is the complete contract for one concrete entity kind:
//! mandatory fields, tiers, ordered own-field descriptors and the ordered
//! subtype rules used for polymorphic dispatch. Codec code never hardcodes
//! a kind; everything flows from here.

use std::collections::HashMap;

use crate::entity::Entity;
use crate::error::CodecError;
use crate::fields::FieldCodec;
use crate::options::KeyStyle;
use crate::tracker::FieldValue;

/// Which type tags a kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRule {
    /// Controlled vocabulary, e.g. `["sc:Manifest", "Manifest"]`.
    Fixed(&'static [&'static str]),
    /// Generic resource; any tag is accepted.
    Open,
}

impl TypeRule {
    pub fn accepts(&self, tag: &str) -> bool {
        match self {
            Self::Fixed(tags) => tags.iter().any(|t| *t == tag),
            Self::Open => true,
        }
    }

    /// Tag emitted for entities built without an explicit one.
    pub fn default_tag(&self, style: KeyStyle) -> Option<&'static str> {
        let Self::Fixed(tags) = self else {
            return None;
        };
        let preferred = match style {
            KeyStyle::Prefixed => tags.iter().find(|t| t.contains(':')),
            KeyStyle::Bare => tags.iter().find(|t| !t.contains(':')),
        };
        preferred.or_else(|| tags.first()).copied()
    }
}

/// Optional tiers layered on top of the identified tier, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    Node,
    Dimensions,
    ViewingDirection,
    Format,
}

/// Encode predicate of a field descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmitRule {
    /// Emitted whenever the slot is set, even as an empty list.
    #[default]
    WhenPresent,
    /// Skipped when the slot holds an empty collection.
    WhenNonEmpty,
}

impl EmitRule {
    pub fn should_emit(self, value: &FieldValue) -> bool {
        match self {
            Self::WhenPresent => true,
            Self::WhenNonEmpty => !value.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub codec: FieldCodec,
    pub emit: EmitRule,
}

/// Predicate selecting a subtype during polymorphic decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    /// Explicit type tag equal to one of these.
    TypeTag(&'static [&'static str]),
    /// All of these keys present. Specificity is the number of keys.
    HasKeys(&'static [&'static str]),
    /// A string member (or any string in an array member) contains `needle`.
    FieldContains {
        field: &'static str,
        needle: &'static str,
    },
}

impl Discriminator {
    pub fn describe(&self) -> String {
        match self {
            Self::TypeTag(tags) => format!("type in [{}]", tags.join(", ")),
            Self::HasKeys(keys) => format!("keys {{{}}}", keys.join(", ")),
            Self::FieldContains { field, needle } => format!("{field} contains \"{needle}\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtypeRule {
    pub discriminator: Discriminator,
    pub subtype: &'static str,
}

impl SubtypeRule {
    pub fn describe(&self) -> String {
        format!("{} ({})", self.subtype, self.discriminator.describe())
    }
}

/// What dispatch does when no subtype rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fallback {
    /// Decode as the kind itself; extra keys land in overflow.
    #[default]
    Generic,
    /// Fail with `UnresolvedPolymorphicType`.
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KindSpec {
    pub name: &'static str,
    pub type_rule: TypeRule,
    /// Mandatory member names, checked in this order.
    pub mandatory: Vec<&'static str>,
    pub tiers: Vec<TierKind>,
    pub fields: Vec<FieldDescriptor>,
    pub subtypes: Vec<SubtypeRule>,
    /// Groups of fields of which at most one may be set.
    pub exclusive: Vec<&'static [&'static str]>,
    pub fallback: Fallback,
    /// Abstract kinds exist only to dispatch to a subtype.
    pub is_abstract: bool,
}

impl KindSpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            type_rule: TypeRule::Open,
            mandatory: vec!["id"],
            tiers: Vec::new(),
            fields: Vec::new(),
            subtypes: Vec::new(),
            exclusive: Vec::new(),
            fallback: Fallback::Generic,
            is_abstract: false,
        }
    }

    /// Dispatch-only kind; never decoded as itself.
    pub fn abstract_kind(name: &'static str) -> Self {
        Self {
            mandatory: Vec::new(),
            fallback: Fallback::Reject,
            is_abstract: true,
            ..Self::new(name)
        }
    }

    pub fn type_tags(mut self, tags: &'static [&'static str]) -> Self {
        self.type_rule = TypeRule::Fixed(tags);
        self
    }

    pub fn mandatory(mut self, names: &[&'static str]) -> Self {
        self.mandatory = names.to_vec();
        self
    }

    pub fn tiers(mut self, tiers: &[TierKind]) -> Self {
        self.tiers = tiers.to_vec();
        self
    }

    pub fn field(self, name: &'static str, codec: FieldCodec) -> Self {
        self.field_with(name, codec, EmitRule::WhenPresent)
    }

    pub fn field_with(mut self, name: &'static str, codec: FieldCodec, emit: EmitRule) -> Self {
        self.fields.push(FieldDescriptor { name, codec, emit });
        self
    }

    pub fn subtype(mut self, discriminator: Discriminator, subtype: &'static str) -> Self {
        self.subtypes.push(SubtypeRule {
            discriminator,
            subtype,
        });
        self
    }

    pub fn exclusive(mut self, names: &'static [&'static str]) -> Self {
        self.exclusive.push(names);
        self
    }

    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn has_tier(&self, tier: TierKind) -> bool {
        self.tiers.contains(&tier)
    }

    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.name == name)
    }

    pub fn is_mandatory(&self, name: &str) -> bool {
        self.mandatory.iter().any(|m| *m == name)
    }

    /// First exclusive group with more than one member set, as the set names.
    pub fn exclusive_conflict(&self, is_set: impl Fn(&str) -> bool) -> Option<Vec<&'static str>> {
        self.exclusive.iter().find_map(|group| {
            let set: Vec<_> = group.iter().copied().filter(|&name| is_set(name)).collect();
            (set.len() > 1).then_some(set)
        })
    }
}

pub struct EntityRegistry {
    kinds: HashMap<&'static str, KindSpec>,
    aliases: HashMap<&'static str, &'static str>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Registry holding the default Presentation 2.x / 3.0 catalog.
    pub fn presentation() -> Self {
        let mut registry = Self::new();
        crate::catalog::register_presentation(&mut registry);
        registry
    }

    /// Adds a kind, replacing any previous spec with the same name.
    pub fn register(&mut self, spec: KindSpec) -> Option<KindSpec> {
        self.kinds.insert(spec.name, spec)
    }

    /// Registers `alias` as a deprecated name of `target`.
    pub fn register_alias(&mut self, alias: &'static str, target: &'static str) {
        self.aliases.insert(alias, target);
    }

    pub fn get(&self, name: &str) -> Option<&KindSpec> {
        let name = self.aliases.get(name).copied().unwrap_or(name);
        self.kinds.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<&KindSpec, CodecError> {
        self.get(name)
            .ok_or_else(|| CodecError::UnknownKind(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// All kinds, sorted by name.
    pub fn list(&self) -> Vec<&KindSpec> {
        let mut kinds: Vec<_> = self.kinds.values().collect();
        kinds.sort_by_key(|spec| spec.name);
        kinds
    }

    /// All aliases as `(alias, target)`, sorted by alias.
    pub fn aliases(&self) -> Vec<(&'static str, &'static str)> {
        let mut aliases: Vec<_> = self.aliases.iter().map(|(a, t)| (*a, *t)).collect();
        aliases.sort();
        aliases
    }

    /// Builds an empty entity of a concrete kind.
    pub fn instantiate(&self, kind: &str, id: &str) -> Result<Entity, CodecError> {
        let spec = self.resolve(kind)?;
        if spec.is_abstract {
            return Err(CodecError::UnresolvedPolymorphicType {
                owner_type: spec.name.to_string(),
                available_discriminators: spec.subtypes.iter().map(SubtypeRule::describe).collect(),
            });
        }
        Ok(Entity::new(spec.name, id))
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry.register(
            KindSpec::new("Widget")
                .type_tags(&["ex:Widget", "Widget"])
                .field("size", FieldCodec::Integer)
                .field("colour", FieldCodec::Text)
                .field("color", FieldCodec::Text)
                .exclusive(&["colour", "color"]),
        );
        registry.register(
            KindSpec::abstract_kind("Thing").subtype(Discriminator::TypeTag(&["Widget"]), "Widget"),
        );
        registry.register_alias("Gadget", "Widget");
        registry
    }

    #[test]
    fn test_alias_resolves_to_target() {
        let registry = registry();
        assert_eq!(registry.get("Gadget").map(|s| s.name), Some("Widget"));
        assert!(registry.is_alias("Gadget"));
    }

    #[test]
    fn test_unknown_kind() {
        let err = registry().resolve("Sprocket").unwrap_err();
        assert!(matches!(err, CodecError::UnknownKind(ref k) if k == "Sprocket"));
    }

    #[test]
    fn test_list_sorted() {
        let registry = registry();
        let names: Vec<_> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Thing", "Widget"]);
    }

    #[test]
    fn test_instantiate_abstract_fails() {
        let registry = registry();
        assert!(registry.instantiate("Thing", "x").is_err());
        assert_eq!(registry.instantiate("Gadget", "x").unwrap().kind(), "Widget");
    }

    #[test]
    fn test_default_tag_per_style() {
        let rule = TypeRule::Fixed(&["ex:Widget", "Widget"]);
        assert_eq!(rule.default_tag(KeyStyle::Prefixed), Some("ex:Widget"));
        assert_eq!(rule.default_tag(KeyStyle::Bare), Some("Widget"));
        assert_eq!(TypeRule::Open.default_tag(KeyStyle::Bare), None);
    }

    #[test]
    fn test_exclusive_conflict() {
        let registry = registry();
        let spec = registry.get("Widget").unwrap();
        assert_eq!(spec.exclusive_conflict(|name| name == "size" || name == "color"), None);
        assert_eq!(
            spec.exclusive_conflict(|name| name != "size"),
            Some(vec!["colour", "color"])
        );
    }

    #[test]
    fn test_emit_rule() {
        let empty = FieldValue::Entities(Vec::new());
        assert!(EmitRule::WhenPresent.should_emit(&empty));
        assert!(!EmitRule::WhenNonEmpty.should_emit(&empty));
    }
}
