//! Field Codecs
//!
//! The decode function and encode half of a field descriptor. Each codec
//! maps one JSON member to exactly one `FieldValue` variant and back.

use chrono::{DateTime, SecondsFormat};
use serde_json::Value;

use crate::codec::Codec;
use crate::error::CodecError;
use crate::options::KeyStyle;
use crate::shape::{self, value_shape, ArrayForm};
use crate::tracker::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCodec {
    Text,
    Integer,
    Number,
    Boolean,
    /// RFC 3339 date-time, e.g. `navDate`.
    DateTime,
    Texts(ArrayForm),
    LangValues,
    Reference,
    References(ArrayForm),
    /// Exactly one nested entity of the named kind.
    Entity(&'static str),
    /// Array of nested entities; a non-array is a shape mismatch.
    Entities(&'static str),
    /// One entity or an array of them. Stored as a list.
    OneOrMany(&'static str),
    /// Kept verbatim.
    Raw,
}

impl FieldCodec {
    pub fn decode(
        &self,
        codec: &Codec,
        owner: &str,
        field: &str,
        raw: &Value,
        style: KeyStyle,
    ) -> Result<FieldValue, CodecError> {
        let mismatch = |expected: &str| CodecError::shape(owner, field, expected, value_shape(raw));

        match self {
            Self::Text => raw
                .as_str()
                .map(|s| FieldValue::Text(s.to_string()))
                .ok_or_else(|| mismatch("string")),
            Self::Integer => raw
                .as_i64()
                .map(FieldValue::Integer)
                .ok_or_else(|| mismatch("integer")),
            Self::Number => match raw {
                Value::Number(n) => Ok(FieldValue::Number(n.clone())),
                _ => Err(mismatch("number")),
            },
            Self::Boolean => raw
                .as_bool()
                .map(FieldValue::Boolean)
                .ok_or_else(|| mismatch("boolean")),
            Self::DateTime => {
                let text = raw.as_str().ok_or_else(|| mismatch("RFC 3339 date-time string"))?;
                decode_date_time(owner, field, text)
            }
            Self::Texts(_) => shape::parse_texts(owner, field, raw).map(FieldValue::Texts),
            Self::LangValues => shape::parse_lang_values(owner, field, raw).map(FieldValue::LangValues),
            Self::Reference => shape::parse_reference(owner, field, raw).map(FieldValue::Reference),
            Self::References(_) => shape::parse_references(owner, field, raw).map(FieldValue::References),
            Self::Entity(kind) => {
                let entity = codec.decode_nested(kind, raw, style)?;
                Ok(FieldValue::Entity(Box::new(entity)))
            }
            Self::Entities(kind) => {
                let items = raw.as_array().ok_or_else(|| mismatch("array"))?;
                items
                    .iter()
                    .map(|item| codec.decode_nested(kind, item, style))
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldValue::Entities)
            }
            Self::OneOrMany(kind) => shape::one_or_many(raw)
                .into_iter()
                .map(|item| codec.decode_nested(kind, item, style))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::Entities),
            Self::Raw => Ok(FieldValue::Raw(raw.clone())),
        }
    }

    /// Renders a slot value. `None` means the value has no JSON form
    /// (an empty language set) and the member is omitted.
    pub fn encode(
        &self,
        codec: &Codec,
        owner: &str,
        field: &str,
        value: &FieldValue,
        style: KeyStyle,
    ) -> Result<Option<Value>, CodecError> {
        let rendered = match (self, value) {
            (Self::Text, FieldValue::Text(s)) => Some(Value::String(s.clone())),
            (Self::Integer, FieldValue::Integer(n)) => Some(Value::from(*n)),
            (Self::Number, FieldValue::Number(n)) => Some(Value::Number(n.clone())),
            (Self::Number, FieldValue::Integer(n)) => Some(Value::from(*n)),
            (Self::Boolean, FieldValue::Boolean(b)) => Some(Value::Bool(*b)),
            (Self::DateTime, FieldValue::DateTime(dt)) => {
                Some(Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            }
            // Date-times that would not re-render byte-for-byte are kept as text.
            (Self::DateTime, FieldValue::Text(s)) => Some(Value::String(s.clone())),
            (Self::Texts(form), FieldValue::Texts(texts)) => shape::render_texts(texts, style, *form),
            (Self::LangValues, FieldValue::LangValues(values)) => shape::render_lang_values(values, style),
            (Self::Reference, FieldValue::Reference(reference)) => {
                Some(shape::render_reference(reference, style))
            }
            (Self::References(form), FieldValue::References(references)) => {
                shape::render_references(references, style, *form)
            }
            (Self::Entity(_), FieldValue::Entity(entity)) => Some(codec.encode_nested(entity, style)?),
            (Self::Entities(_), FieldValue::Entities(entities)) => Some(Value::Array(
                entities
                    .iter()
                    .map(|entity| codec.encode_nested(entity, style))
                    .collect::<Result<_, _>>()?,
            )),
            (Self::OneOrMany(_), FieldValue::Entities(entities)) => {
                let items = entities
                    .iter()
                    .map(|entity| codec.encode_nested(entity, style))
                    .collect::<Result<Vec<_>, _>>()?;
                // An explicit empty list stays explicit, as with `Entities`.
                if items.is_empty() {
                    Some(Value::Array(items))
                } else {
                    shape::render_one_or_many(items, false)
                }
            }
            (Self::OneOrMany(_), FieldValue::Entity(entity)) => Some(codec.encode_nested(entity, style)?),
            (Self::Raw, FieldValue::Raw(raw)) => Some(raw.clone()),
            (codec_kind, value) => {
                return Err(CodecError::inconsistent(
                    owner,
                    format!(
                        "field `{field}` holds a {} but is declared as {codec_kind:?}",
                        value.variant_name()
                    ),
                ))
            }
        };
        Ok(rendered)
    }
}

fn decode_date_time(owner: &str, field: &str, text: &str) -> Result<FieldValue, CodecError> {
    let parsed = DateTime::parse_from_rfc3339(text).map_err(|_| {
        CodecError::shape(owner, field, "RFC 3339 date-time string", &format!("string `{text}`"))
    })?;

    if parsed.to_rfc3339_opts(SecondsFormat::AutoSi, true) == text {
        Ok(FieldValue::DateTime(parsed))
    } else {
        Ok(FieldValue::Text(text.to_string()))
    }
}
