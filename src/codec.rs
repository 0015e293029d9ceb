//! Codec - Single Entry Point
//!
//! Every decode goes through the same template:
//!
//! 1. resolve the concrete kind (polymorphic dispatch)
//! 2. `create_instance` from the mandatory members
//! 3. `enrich_read` through the kind's converter chain
//!
//! Decode is all-or-nothing. The first error is returned unmodified and no
//! partial graph escapes.

use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::kinds;
use crate::dispatch;
use crate::entity::Entity;
use crate::error::CodecError;
use crate::options::{CodecOptions, KeyStyle};
use crate::reader::{Keyword, ObjectReader};
use crate::registry::{EntityRegistry, KindSpec};
use crate::shape::value_shape;
use crate::tiers::ConverterChain;

pub struct Codec {
    registry: EntityRegistry,
    options: CodecOptions,
}

impl Codec {
    pub fn new(registry: EntityRegistry, options: CodecOptions) -> Self {
        Self { registry, options }
    }

    /// Codec over the default Presentation catalog with default options.
    pub fn presentation() -> Self {
        Self::new(EntityRegistry::presentation(), CodecOptions::default())
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    // --- Decode ---

    /// Parses and decodes a whole document (Manifest, Collection, ...).
    pub fn decode_str(&self, input: &str) -> Result<Entity, CodecError> {
        let raw: Value = serde_json::from_str(input)?;
        self.decode_document(&raw)
    }

    /// Decodes a document root, dispatching on its type tag.
    pub fn decode_document(&self, raw: &Value) -> Result<Entity, CodecError> {
        self.decode_kind(kinds::DOCUMENT, raw)
    }

    /// Decodes a value as the named kind (or one of its subtypes).
    pub fn decode_kind(&self, kind: &str, raw: &Value) -> Result<Entity, CodecError> {
        self.decode_nested(kind, raw, self.options.default_key_style)
    }

    pub(crate) fn decode_nested(
        &self,
        kind: &str,
        raw: &Value,
        fallback_style: KeyStyle,
    ) -> Result<Entity, CodecError> {
        let requested = self.registry.resolve(kind)?;
        let object = raw
            .as_object()
            .ok_or_else(|| CodecError::shape(requested.name, "(self)", "object", value_shape(raw)))?;

        let mut reader = ObjectReader::from_map(requested.name, object, fallback_style);
        let spec = dispatch::resolve(&self.registry, requested, object, reader.style())?;
        reader.set_owner(spec.name);

        let entity = self.create_instance(spec, &mut reader)?;
        let mut entity = self.enrich_read(spec, entity, &mut reader)?;
        if self.registry.is_alias(kind) {
            entity.set_alias(kind);
        }

        debug!(
            kind = spec.name,
            id = entity.id().unwrap_or("-"),
            overflow = entity.additional().len(),
            "Decoded entity"
        );
        Ok(entity)
    }

    /// Builds the minimal instance from the mandatory members.
    ///
    /// Mandatory members are checked in declaration order, so the reported
    /// field is always the first one missing.
    pub fn create_instance(
        &self,
        spec: &KindSpec,
        reader: &mut ObjectReader<'_>,
    ) -> Result<Entity, CodecError> {
        let style = reader.style();

        for name in &spec.mandatory {
            if !reader.contains(name) {
                let key = Keyword::from_field(name).map_or(*name, |keyword| keyword.key(style));
                return Err(CodecError::missing(spec.name, key));
            }
        }

        let mut identity = |keyword: Keyword| -> Result<Option<String>, CodecError> {
            match reader.claim_keyword(keyword) {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(CodecError::shape(
                    spec.name,
                    keyword.key(style),
                    "string",
                    value_shape(other),
                )),
            }
        };
        let id = identity(Keyword::Id)?;
        let type_name = identity(Keyword::Type)?;

        Ok(Entity::decoded(spec.name, id, type_name, style))
    }

    /// Layers optional fields onto an instance, parent tier first.
    pub fn enrich_read(
        &self,
        spec: &KindSpec,
        mut entity: Entity,
        reader: &mut ObjectReader<'_>,
    ) -> Result<Entity, CodecError> {
        ConverterChain::for_kind(spec).read(self, reader, &mut entity)?;
        Ok(entity)
    }

    // --- Encode ---

    pub fn encode(&self, entity: &Entity) -> Result<Value, CodecError> {
        self.encode_nested(entity, self.options.default_key_style)
    }

    pub fn encode_string(&self, entity: &Entity) -> Result<String, CodecError> {
        let value = self.encode(entity)?;
        let text = if self.options.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    pub(crate) fn encode_nested(&self, entity: &Entity, fallback_style: KeyStyle) -> Result<Value, CodecError> {
        let spec = self.registry.resolve(entity.kind())?;
        let style = entity.style().unwrap_or(fallback_style);
        let mut out = Map::new();
        self.write_fields(spec, entity, style, &mut out)?;
        Ok(Value::Object(out))
    }

    /// Writes an entity's members in chain order: id, type, inherited
    /// fields, own fields, overflow.
    pub fn write_fields(
        &self,
        spec: &KindSpec,
        entity: &Entity,
        style: KeyStyle,
        out: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        ConverterChain::for_kind(spec).write(self, entity, style, out)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::presentation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_missing_mandatory_uses_document_spelling() {
        let codec = Codec::presentation();
        let err = codec
            .decode_kind("Manifest", &json!({"@type": "sc:Manifest"}))
            .unwrap_err();
        assert_eq!(err.field(), Some("@id"));

        let err = codec.decode_kind("Manifest", &json!({"type": "Manifest"})).unwrap_err();
        assert_eq!(err.field(), Some("id"));
    }

    #[test]
    fn test_non_string_id_is_shape_mismatch() {
        let codec = Codec::presentation();
        let err = codec
            .decode_kind("Manifest", &json!({"id": 7, "type": "Manifest"}))
            .unwrap_err();
        assert!(matches!(err, CodecError::ShapeMismatch { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_unknown_kind() {
        let codec = Codec::presentation();
        let err = codec.decode_kind("Folio", &json!({"id": "x"})).unwrap_err();
        assert!(matches!(err, CodecError::UnknownKind(_)));
    }

    #[test]
    fn test_built_entity_gets_default_tag() {
        let codec = Codec::presentation();
        let mut manifest = Entity::new("Manifest", "https://example.org/m");
        manifest.set_label("Book");
        assert_eq!(
            codec.encode(&manifest).unwrap(),
            json!({"id": "https://example.org/m", "type": "Manifest", "label": "Book"})
        );

        let v2 = manifest.with_style(KeyStyle::Prefixed);
        assert_eq!(
            codec.encode(&v2).unwrap(),
            json!({"@id": "https://example.org/m", "@type": "sc:Manifest", "label": "Book"})
        );
    }

    #[test]
    fn test_encode_string_pretty() {
        let options = CodecOptions {
            pretty: true,
            ..CodecOptions::default()
        };
        let codec = Codec::new(EntityRegistry::presentation(), options);
        let text = codec.encode_string(&Entity::new("Manifest", "m")).unwrap();
        assert!(text.contains('\n'));
    }
}
