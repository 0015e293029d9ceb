//! Converter Chain
//!
//! One `Tier` per entity tier. A chain is built per kind, parent tier first:
//!
//! identified -> [node] -> [dimensions] -> [viewing direction] -> [format]
//!   -> own fields -> overflow
//!
//! Reading runs the chain front to back, so later tiers see (and may
//! override) what earlier tiers decoded. Writing runs it in the same order,
//! which fixes member order: id, type, inherited fields, own fields, overflow.

use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::catalog::kinds;
use crate::codec::Codec;
use crate::entity::Entity;
use crate::error::CodecError;
use crate::options::{KeyStyle, TypeChecking};
use crate::properties::{LangValues, Reference, ViewingDirection};
use crate::reader::{Keyword, ObjectReader};
use crate::registry::{KindSpec, TierKind};
use crate::shape::{self, value_shape, ArrayForm};

pub trait Tier {
    fn name(&self) -> &'static str;

    fn read(
        &self,
        codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError>;

    fn write(
        &self,
        codec: &Codec,
        entity: &Entity,
        style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError>;
}

fn put(out: &mut Map<String, Value>, name: &str, value: Option<Value>) {
    if let Some(value) = value {
        out.insert(name.to_string(), value);
    }
}

// --- Identified ---

/// `@context`, id, type and nested services.
pub struct IdentifiedTier<'s> {
    spec: &'s KindSpec,
}

impl Tier for IdentifiedTier<'_> {
    fn name(&self) -> &'static str {
        "identified"
    }

    fn read(
        &self,
        codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError> {
        if let Some(context) = reader.claim("@context") {
            entity.set_context(context.clone());
        }

        if let Some(tag) = entity.type_name() {
            if !self.spec.type_rule.accepts(tag) {
                match codec.options().type_checking {
                    TypeChecking::Strict => {
                        return Err(CodecError::shape(
                            self.spec.name,
                            reader.style().type_key(),
                            &format!("type tag accepted by {}", self.spec.name),
                            &format!("`{tag}`"),
                        ))
                    }
                    TypeChecking::Lenient => warn!(
                        kind = self.spec.name,
                        tag = tag,
                        "Accepting type tag outside the kind's vocabulary"
                    ),
                }
            }
        }

        if let Some(raw) = reader.claim("service") {
            let style = reader.style();
            for item in shape::one_or_many(raw) {
                let service = codec.decode_nested(kinds::SERVICE, item, style)?;
                entity.services_mut().push(service);
            }
        }

        Ok(())
    }

    fn write(
        &self,
        codec: &Codec,
        entity: &Entity,
        style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        if let Some(context) = entity.context() {
            out.insert("@context".to_string(), context.clone());
        }

        match entity.id() {
            Some(id) => {
                out.insert(style.id_key().to_string(), Value::String(id.to_string()));
            }
            None if self.spec.is_mandatory("id") => {
                return Err(CodecError::inconsistent(self.spec.name, "entity has no id"));
            }
            None => {}
        }

        // Only kinds that require a tag get a default one.
        let type_name = entity.type_name().or_else(|| {
            self.spec
                .is_mandatory("type")
                .then(|| self.spec.type_rule.default_tag(style))
                .flatten()
        });
        match type_name {
            Some(tag) => {
                out.insert(style.type_key().to_string(), Value::String(tag.to_string()));
            }
            None if self.spec.is_mandatory("type") => {
                return Err(CodecError::inconsistent(self.spec.name, "entity has no type tag"));
            }
            None => {}
        }

        let services = entity
            .services()
            .iter()
            .map(|service| codec.encode_nested(service, style))
            .collect::<Result<Vec<_>, _>>()?;
        put(
            out,
            "service",
            shape::render_one_or_many(services, ArrayForm::Versioned.is_always(style)),
        );

        Ok(())
    }
}

// --- Node ---

fn claim_lang(reader: &mut ObjectReader<'_>, name: &str) -> Result<LangValues, CodecError> {
    match reader.claim(name) {
        Some(raw) => shape::parse_lang_values(reader.owner(), name, raw),
        None => Ok(LangValues::new()),
    }
}

fn claim_refs(reader: &mut ObjectReader<'_>, name: &str) -> Result<Vec<Reference>, CodecError> {
    match reader.claim(name) {
        Some(raw) => shape::parse_references(reader.owner(), name, raw),
        None => Ok(Vec::new()),
    }
}

fn claim_texts(reader: &mut ObjectReader<'_>, name: &str) -> Result<Vec<String>, CodecError> {
    match reader.claim(name) {
        Some(raw) => shape::parse_texts(reader.owner(), name, raw),
        None => Ok(Vec::new()),
    }
}

/// Descriptive fields shared by every node kind.
pub struct NodeTier;

impl Tier for NodeTier {
    fn name(&self) -> &'static str {
        "node"
    }

    fn read(
        &self,
        _codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError> {
        let owner = reader.owner().to_string();
        let node = entity.node_mut();

        node.label = claim_lang(reader, "label")?;
        node.summary = claim_lang(reader, "summary")?;
        node.description = claim_lang(reader, "description")?;
        if let Some(raw) = reader.claim("metadata") {
            node.metadata = shape::parse_metadata(&owner, "metadata", raw)?;
        }
        if let Some(raw) = reader.claim("requiredStatement") {
            node.required_statement = Some(shape::parse_metadata_entry(&owner, "requiredStatement", raw)?);
        }
        node.attribution = claim_lang(reader, "attribution")?;
        node.rights = reader.claim_str("rights")?.map(str::to_string);
        node.license = claim_refs(reader, "license")?;
        node.logo = claim_refs(reader, "logo")?;
        node.thumbnail = claim_refs(reader, "thumbnail")?;
        node.viewing_hint = claim_texts(reader, "viewingHint")?;
        node.behavior = claim_texts(reader, "behavior")?;
        node.rendering = claim_refs(reader, "rendering")?;
        node.related = claim_refs(reader, "related")?;
        node.homepage = claim_refs(reader, "homepage")?;
        node.provider = claim_refs(reader, "provider")?;
        node.see_also = claim_refs(reader, "seeAlso")?;
        node.within = claim_refs(reader, "within")?;
        node.part_of = claim_refs(reader, "partOf")?;

        Ok(())
    }

    fn write(
        &self,
        _codec: &Codec,
        entity: &Entity,
        style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        let node = entity.node();
        let refs = |references: &[Reference]| shape::render_references(references, style, ArrayForm::Versioned);

        put(out, "label", shape::render_lang_values(&node.label, style));
        put(out, "summary", shape::render_lang_values(&node.summary, style));
        put(out, "description", shape::render_lang_values(&node.description, style));
        put(out, "metadata", shape::render_metadata(&node.metadata, style));
        put(
            out,
            "requiredStatement",
            node.required_statement
                .as_ref()
                .map(|entry| shape::render_metadata_entry(entry, style)),
        );
        put(out, "attribution", shape::render_lang_values(&node.attribution, style));
        put(out, "rights", node.rights.clone().map(Value::String));
        put(out, "license", refs(&node.license));
        put(out, "logo", refs(&node.logo));
        put(out, "thumbnail", refs(&node.thumbnail));
        put(out, "viewingHint", shape::render_texts(&node.viewing_hint, style, ArrayForm::Minimal));
        put(out, "behavior", shape::render_texts(&node.behavior, style, ArrayForm::Always));
        put(out, "rendering", refs(&node.rendering));
        put(out, "related", refs(&node.related));
        put(out, "homepage", refs(&node.homepage));
        put(out, "provider", refs(&node.provider));
        put(out, "seeAlso", refs(&node.see_also));
        put(out, "within", refs(&node.within));
        put(out, "partOf", refs(&node.part_of));

        Ok(())
    }
}

// --- Capabilities ---

pub struct DimensionsTier;

impl Tier for DimensionsTier {
    fn name(&self) -> &'static str {
        "dimensions"
    }

    fn read(
        &self,
        _codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError> {
        let owner = reader.owner().to_string();
        let mut extent = |name: &str| -> Result<Option<u64>, CodecError> {
            match reader.claim(name) {
                None => Ok(None),
                Some(raw) => raw.as_u64().map(Some).ok_or_else(|| {
                    CodecError::shape(&owner, name, "non-negative integer", value_shape(raw))
                }),
            }
        };
        let width = extent("width")?;
        let height = extent("height")?;

        let duration = match reader.claim("duration") {
            None => None,
            Some(Value::Number(n)) => Some(n.clone()),
            Some(other) => return Err(CodecError::shape(&owner, "duration", "number", value_shape(other))),
        };

        let dimensions = &mut entity.capabilities_mut().dimensions;
        dimensions.width = width;
        dimensions.height = height;
        dimensions.duration = duration;
        Ok(())
    }

    fn write(
        &self,
        _codec: &Codec,
        entity: &Entity,
        _style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        let dimensions = entity.dimensions();
        put(out, "width", dimensions.width.map(Value::from));
        put(out, "height", dimensions.height.map(Value::from));
        put(out, "duration", dimensions.duration.clone().map(Value::Number));
        Ok(())
    }
}

pub struct ViewingDirectionTier;

impl Tier for ViewingDirectionTier {
    fn name(&self) -> &'static str {
        "viewing-direction"
    }

    fn read(
        &self,
        _codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError> {
        if let Some(direction) = reader.claim_str("viewingDirection")? {
            entity.set_viewing_direction(ViewingDirection::parse(direction));
        }
        Ok(())
    }

    fn write(
        &self,
        _codec: &Codec,
        entity: &Entity,
        _style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        put(
            out,
            "viewingDirection",
            entity.viewing_direction().map(|d| Value::String(d.as_str().to_string())),
        );
        Ok(())
    }
}

pub struct FormatTier;

impl Tier for FormatTier {
    fn name(&self) -> &'static str {
        "format"
    }

    fn read(
        &self,
        _codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError> {
        if let Some(format) = reader.claim_str("format")? {
            entity.set_format(format);
        }
        Ok(())
    }

    fn write(
        &self,
        _codec: &Codec,
        entity: &Entity,
        _style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        put(out, "format", entity.format().map(|f| Value::String(f.to_string())));
        Ok(())
    }
}

// --- Own fields ---

/// Kind-declared fields, driven by the registry's descriptors.
pub struct OwnFieldsTier<'s> {
    spec: &'s KindSpec,
}

impl Tier for OwnFieldsTier<'_> {
    fn name(&self) -> &'static str {
        "own-fields"
    }

    fn read(
        &self,
        codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError> {
        let style = reader.style();
        for descriptor in &self.spec.fields {
            if let Some(raw) = reader.claim(descriptor.name) {
                let value = descriptor
                    .codec
                    .decode(codec, reader.owner(), descriptor.name, raw, style)?;
                entity.properties_mut().set(descriptor.name, value);
            }
        }
        check_exclusive(self.spec, entity)
    }

    fn write(
        &self,
        codec: &Codec,
        entity: &Entity,
        style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        for (name, _) in entity.properties().iter() {
            if self.spec.descriptor(name).is_none() {
                return Err(CodecError::inconsistent(
                    self.spec.name,
                    format!("field `{name}` is not declared by this kind"),
                ));
            }
        }
        check_exclusive(self.spec, entity)?;

        for descriptor in &self.spec.fields {
            let Some(value) = entity.field(descriptor.name) else {
                continue;
            };
            if !descriptor.emit.should_emit(value) {
                continue;
            }
            let rendered = descriptor
                .codec
                .encode(codec, self.spec.name, descriptor.name, value, style)?;
            put(out, descriptor.name, rendered);
        }

        // Last schema tier: every mandatory member must have been written.
        for name in &self.spec.mandatory {
            let key = Keyword::from_field(name).map_or(*name, |keyword| keyword.key(style));
            if !out.contains_key(key) {
                return Err(CodecError::inconsistent(
                    self.spec.name,
                    format!("mandatory field `{key}` is not set"),
                ));
            }
        }

        Ok(())
    }
}

fn check_exclusive(spec: &KindSpec, entity: &Entity) -> Result<(), CodecError> {
    match spec.exclusive_conflict(|name| entity.field(name).is_some()) {
        Some(set) => Err(CodecError::inconsistent(
            spec.name,
            format!("fields `{}` are mutually exclusive", set.join("`, `")),
        )),
        None => Ok(()),
    }
}

// --- Overflow ---

/// Unclaimed input members, replayed last in input order.
pub struct OverflowTier;

impl Tier for OverflowTier {
    fn name(&self) -> &'static str {
        "overflow"
    }

    fn read(
        &self,
        _codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError> {
        let remaining = reader.remaining();
        for key in remaining.keys() {
            trace!(kind = reader.owner(), key = key.as_str(), "Captured unrecognized member");
        }
        entity.properties_mut().extend_additional(remaining);
        Ok(())
    }

    fn write(
        &self,
        _codec: &Codec,
        entity: &Entity,
        _style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        for (key, value) in entity.additional() {
            if out.contains_key(key) {
                return Err(CodecError::inconsistent(
                    entity.kind(),
                    format!("overflow member `{key}` collides with a schema field"),
                ));
            }
            out.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

// --- Chain ---

const CAPABILITY_ORDER: [TierKind; 4] = [
    TierKind::Node,
    TierKind::Dimensions,
    TierKind::ViewingDirection,
    TierKind::Format,
];

pub struct ConverterChain<'s> {
    spec: &'s KindSpec,
    tiers: Vec<Box<dyn Tier + 's>>,
}

impl<'s> ConverterChain<'s> {
    pub fn for_kind(spec: &'s KindSpec) -> Self {
        let mut tiers: Vec<Box<dyn Tier + 's>> = vec![Box::new(IdentifiedTier { spec })];

        for tier in CAPABILITY_ORDER.iter().filter(|t| spec.has_tier(**t)) {
            let boxed: Box<dyn Tier + 's> = match tier {
                TierKind::Node => Box::new(NodeTier),
                TierKind::Dimensions => Box::new(DimensionsTier),
                TierKind::ViewingDirection => Box::new(ViewingDirectionTier),
                TierKind::Format => Box::new(FormatTier),
            };
            tiers.push(boxed);
        }

        tiers.push(Box::new(OwnFieldsTier { spec }));
        tiers.push(Box::new(OverflowTier));

        Self { spec, tiers }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    pub fn read(
        &self,
        codec: &Codec,
        reader: &mut ObjectReader<'_>,
        entity: &mut Entity,
    ) -> Result<(), CodecError> {
        for tier in &self.tiers {
            tier.read(codec, reader, entity)?;
        }
        Ok(())
    }

    pub fn write(
        &self,
        codec: &Codec,
        entity: &Entity,
        style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        self.check_capabilities(entity)?;
        for tier in &self.tiers {
            tier.write(codec, entity, style, out)?;
        }
        Ok(())
    }

    /// Values on a tier the kind does not have would otherwise be dropped.
    fn check_capabilities(&self, entity: &Entity) -> Result<(), CodecError> {
        let spec = self.spec;
        let caps = entity.capabilities();
        let stray = [
            (TierKind::Node, !entity.node().is_empty()),
            (TierKind::Dimensions, !caps.dimensions.is_empty()),
            (TierKind::ViewingDirection, caps.viewing_direction.is_some()),
            (TierKind::Format, caps.format.is_some()),
        ]
        .into_iter()
        .find(|(tier, set)| *set && !spec.has_tier(*tier));

        match stray {
            Some((tier, _)) => Err(CodecError::inconsistent(
                spec.name,
                format!("{tier:?} fields are set but the kind has no {tier:?} tier"),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EntityRegistry;

    #[test]
    fn test_chain_order_is_parent_first() {
        let registry = EntityRegistry::presentation();
        let canvas = registry.get("Canvas").unwrap();
        assert_eq!(
            ConverterChain::for_kind(canvas).tier_names(),
            vec!["identified", "node", "dimensions", "own-fields", "overflow"]
        );
    }

    #[test]
    fn test_stray_capability_is_inconsistent() {
        let registry = EntityRegistry::presentation();
        let codec = Codec::presentation();
        let manifest = registry.get("Manifest").unwrap();

        let mut entity = Entity::new("Manifest", "https://example.org/m");
        entity.set_format("image/jpeg");

        let mut out = Map::new();
        let err = ConverterChain::for_kind(manifest)
            .write(&codec, &entity, KeyStyle::Bare, &mut out)
            .unwrap_err();
        assert!(matches!(err, CodecError::InconsistentEntity { .. }));
    }
}
