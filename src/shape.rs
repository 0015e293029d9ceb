//! Shape Normalizer
//!
//! Several properties have more than one legal JSON encoding. Each is parsed
//! into one canonical in-memory form and rendered back in the simplest shape
//! that recovers that form:
//!
//! - no values: the property is omitted
//! - one untagged value: bare scalar
//! - one tagged value, or several values: object / array
//!
//! A redundant one-element array therefore comes back as its scalar. The value
//! survives; the shape is simplified.

use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::options::KeyStyle;
use crate::properties::{LangForm, LangValue, LangValues, MetadataEntry, Reference};

/// Name of a raw value's JSON shape, for mismatch reports.
pub fn value_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// When a multi-valued property is written as an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayForm {
    /// Single values are written bare.
    Minimal,
    /// Always an array, even for one value.
    Always,
    /// Minimal in prefixed (2.x) documents, always an array in bare (3.0) ones.
    Versioned,
}

impl ArrayForm {
    pub fn is_always(self, style: KeyStyle) -> bool {
        match self {
            Self::Minimal => false,
            Self::Always => true,
            Self::Versioned => style == KeyStyle::Bare,
        }
    }
}

/// Elements of an array, or the value itself.
pub fn one_or_many(raw: &Value) -> Vec<&Value> {
    match raw {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

pub fn render_one_or_many(mut items: Vec<Value>, always_array: bool) -> Option<Value> {
    match items.len() {
        0 => None,
        1 if !always_array => items.pop(),
        _ => Some(Value::Array(items)),
    }
}

// --- Language-tagged values ---

pub fn parse_lang_values(owner: &str, field: &str, raw: &Value) -> Result<LangValues, CodecError> {
    match raw {
        Value::String(s) => Ok(LangValues::from(s.as_str())),
        Value::Object(map) if is_tagged_object(map) => {
            let style = KeyStyle::detect_tagged(map);
            let value = parse_tagged(owner, field, map)?;
            Ok(LangValues::from_values(vec![value]).with_style(style))
        }
        Value::Object(map) => parse_language_map(owner, field, map),
        Value::Array(items) => {
            if items.iter().all(Value::is_string) {
                let values = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(LangValue::new)
                    .collect();
                return Ok(LangValues::from_values(values));
            }

            let mut style = None;
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(map) if is_tagged_object(map) => {
                        style = style.or_else(|| KeyStyle::detect_tagged(map));
                        values.push(parse_tagged(owner, field, map)?);
                    }
                    other => {
                        return Err(CodecError::shape(
                            owner,
                            field,
                            "homogeneous array of strings or language-tagged objects",
                            &format!("array containing {}", value_shape(other)),
                        ))
                    }
                }
            }
            Ok(LangValues::from_values(values).with_style(style))
        }
        other => Err(CodecError::shape(
            owner,
            field,
            "string, language-tagged object or array",
            value_shape(other),
        )),
    }
}

fn is_tagged_object(map: &Map<String, Value>) -> bool {
    map.contains_key("@value")
        || map.contains_key("value")
        || map.contains_key("@language")
        || map.contains_key("language")
}

fn parse_tagged(owner: &str, field: &str, map: &Map<String, Value>) -> Result<LangValue, CodecError> {
    let style = KeyStyle::detect_tagged(map).unwrap_or_default();

    for key in map.keys() {
        if key != style.value_key() && key != style.language_key() {
            return Err(CodecError::shape(
                owner,
                field,
                "language-tagged object",
                &format!("object with member `{key}`"),
            ));
        }
    }

    let value = match map.get(style.value_key()) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(CodecError::shape(
                owner,
                &format!("{field}.{}", style.value_key()),
                "string",
                value_shape(other),
            ))
        }
        None => return Err(CodecError::missing(owner, &format!("{field}.{}", style.value_key()))),
    };

    let language = match map.get(style.language_key()) {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(CodecError::shape(
                owner,
                &format!("{field}.{}", style.language_key()),
                "string",
                value_shape(other),
            ))
        }
    };

    Ok(LangValue { value, language })
}

fn parse_language_map(owner: &str, field: &str, map: &Map<String, Value>) -> Result<LangValues, CodecError> {
    let mut values = Vec::new();
    for (language, entries) in map {
        let language = (language != "none").then(|| language.clone());
        for entry in one_or_many(entries) {
            let text = entry.as_str().ok_or_else(|| {
                CodecError::shape(
                    owner,
                    &format!("{field}.{}", language.as_deref().unwrap_or("none")),
                    "string",
                    value_shape(entry),
                )
            })?;
            values.push(LangValue {
                value: text.to_string(),
                language: language.clone(),
            });
        }
    }
    Ok(LangValues::language_map(values))
}

pub fn render_lang_values(values: &LangValues, fallback_style: KeyStyle) -> Option<Value> {
    if values.is_empty() {
        return None;
    }

    if values.form() == LangForm::LanguageMap {
        let mut map = Map::new();
        for value in values.iter() {
            let language = value.language.as_deref().unwrap_or("none");
            let slot = map
                .entry(language.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = slot {
                items.push(Value::String(value.value.clone()));
            }
        }
        return Some(Value::Object(map));
    }

    let style = values.style().unwrap_or(fallback_style);
    let any_tagged = values.iter().any(LangValue::is_tagged);

    // Mixed lists are written as objects throughout so they parse back
    // as a homogeneous array.
    let items = values
        .iter()
        .map(|value| {
            if any_tagged {
                render_tagged(value, style)
            } else {
                Value::String(value.value.clone())
            }
        })
        .collect();

    render_one_or_many(items, false)
}

fn render_tagged(value: &LangValue, style: KeyStyle) -> Value {
    let mut map = Map::new();
    map.insert(style.value_key().to_string(), Value::String(value.value.clone()));
    if let Some(language) = &value.language {
        map.insert(style.language_key().to_string(), Value::String(language.clone()));
    }
    Value::Object(map)
}

// --- Metadata ---

/// Metadata is an array of label/value entries; a single entry object is
/// accepted on input.
pub fn parse_metadata(owner: &str, field: &str, raw: &Value) -> Result<Vec<MetadataEntry>, CodecError> {
    match raw {
        Value::Object(_) => Ok(vec![parse_metadata_entry(owner, field, raw)?]),
        Value::Array(items) => items
            .iter()
            .map(|item| parse_metadata_entry(owner, field, item))
            .collect(),
        other => Err(CodecError::shape(owner, field, "object or array of objects", value_shape(other))),
    }
}

pub fn parse_metadata_entry(owner: &str, field: &str, raw: &Value) -> Result<MetadataEntry, CodecError> {
    let map = raw
        .as_object()
        .ok_or_else(|| CodecError::shape(owner, field, "label/value object", value_shape(raw)))?;

    let label_field = format!("{field}.label");
    let value_field = format!("{field}.value");

    let label = map
        .get("label")
        .ok_or_else(|| CodecError::missing(owner, &label_field))?;
    let value = map
        .get("value")
        .ok_or_else(|| CodecError::missing(owner, &value_field))?;

    let additional = map
        .iter()
        .filter(|(k, _)| k.as_str() != "label" && k.as_str() != "value")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(MetadataEntry {
        label: parse_lang_values(owner, &label_field, label)?,
        value: parse_lang_values(owner, &value_field, value)?,
        additional,
    })
}

pub fn render_metadata(entries: &[MetadataEntry], style: KeyStyle) -> Option<Value> {
    if entries.is_empty() {
        return None;
    }
    Some(Value::Array(
        entries.iter().map(|entry| render_metadata_entry(entry, style)).collect(),
    ))
}

pub fn render_metadata_entry(entry: &MetadataEntry, style: KeyStyle) -> Value {
    let mut map = Map::new();
    if let Some(label) = render_lang_values(&entry.label, style) {
        map.insert("label".to_string(), label);
    }
    if let Some(value) = render_lang_values(&entry.value, style) {
        map.insert("value".to_string(), value);
    }
    for (key, value) in &entry.additional {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

// --- References ---

pub fn parse_references(owner: &str, field: &str, raw: &Value) -> Result<Vec<Reference>, CodecError> {
    one_or_many(raw)
        .into_iter()
        .map(|item| parse_reference(owner, field, item))
        .collect()
}

/// A reference is a bare id or an object carrying one.
pub fn parse_reference(owner: &str, field: &str, raw: &Value) -> Result<Reference, CodecError> {
    let map = match raw {
        Value::String(id) => return Ok(Reference::new(id.clone())),
        Value::Object(map) => map,
        other => return Err(CodecError::shape(owner, field, "id string or object", value_shape(other))),
    };

    let style = KeyStyle::detect(map);
    let keys = style.unwrap_or_default();
    let id_field = format!("{field}.{}", keys.id_key());

    let id = match map.get(keys.id_key()) {
        Some(Value::String(id)) => id.clone(),
        Some(other) => return Err(CodecError::shape(owner, &id_field, "string", value_shape(other))),
        None => return Err(CodecError::missing(owner, &id_field)),
    };

    let mut reference = Reference::new(id);
    reference.style = style;

    for (key, value) in map {
        match key.as_str() {
            k if k == keys.id_key() => {}
            k if k == keys.type_key() => match value {
                Value::String(s) => reference.type_name = Some(s.clone()),
                other => {
                    return Err(CodecError::shape(owner, &format!("{field}.{k}"), "string", value_shape(other)))
                }
            },
            "label" => reference.label = parse_lang_values(owner, &format!("{field}.label"), value)?,
            "format" => match value {
                Value::String(s) => reference.format = Some(s.clone()),
                other => {
                    return Err(CodecError::shape(owner, &format!("{field}.format"), "string", value_shape(other)))
                }
            },
            _ => {
                reference.additional.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(reference)
}

pub fn render_reference(reference: &Reference, fallback_style: KeyStyle) -> Value {
    if reference.is_bare() {
        return Value::String(reference.id.clone());
    }

    let style = reference.style().unwrap_or(fallback_style);
    let mut map = Map::new();
    map.insert(style.id_key().to_string(), Value::String(reference.id.clone()));
    if let Some(type_name) = &reference.type_name {
        map.insert(style.type_key().to_string(), Value::String(type_name.clone()));
    }
    if let Some(label) = render_lang_values(&reference.label, style) {
        map.insert("label".to_string(), label);
    }
    if let Some(format) = &reference.format {
        map.insert("format".to_string(), Value::String(format.clone()));
    }
    for (key, value) in &reference.additional {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}

pub fn render_references(references: &[Reference], style: KeyStyle, form: ArrayForm) -> Option<Value> {
    let items = references
        .iter()
        .map(|reference| render_reference(reference, style))
        .collect();
    render_one_or_many(items, form.is_always(style))
}

// --- Plain strings ---

pub fn parse_texts(owner: &str, field: &str, raw: &Value) -> Result<Vec<String>, CodecError> {
    one_or_many(raw)
        .into_iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| CodecError::shape(owner, field, "string or array of strings", value_shape(item)))
        })
        .collect()
}

pub fn render_texts(texts: &[String], style: KeyStyle, form: ArrayForm) -> Option<Value> {
    let items = texts.iter().cloned().map(Value::String).collect();
    render_one_or_many(items, form.is_always(style))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip_label(raw: Value) -> Option<Value> {
        let values = parse_lang_values("Manifest", "label", &raw).unwrap();
        render_lang_values(&values, KeyStyle::Bare)
    }

    #[test]
    fn test_bare_label_stays_bare() {
        assert_eq!(round_trip_label(json!("Hello")), Some(json!("Hello")));
    }

    #[test]
    fn test_tagged_label_stays_tagged() {
        let raw = json!({"value": "Hello", "language": "en"});
        assert_eq!(round_trip_label(raw.clone()), Some(raw));
    }

    #[test]
    fn test_prefixed_tagged_label_keeps_keywords() {
        let raw = json!({"@value": "Bonjour", "@language": "fr"});
        assert_eq!(round_trip_label(raw.clone()), Some(raw));
    }

    #[test]
    fn test_redundant_single_array_simplifies() {
        assert_eq!(round_trip_label(json!(["Hello"])), Some(json!("Hello")));
    }

    #[test]
    fn test_empty_array_is_omitted() {
        assert_eq!(round_trip_label(json!([])), None);
    }

    #[test]
    fn test_language_map_round_trip() {
        let raw = json!({"en": ["Book of Hours"], "none": ["MS 12"]});
        assert_eq!(round_trip_label(raw.clone()), Some(raw));
    }

    #[test]
    fn test_mixed_array_is_shape_mismatch() {
        let raw = json!(["plain", {"value": "tagged", "language": "en"}]);
        let err = parse_lang_values("Manifest", "label", &raw).unwrap_err();
        assert!(matches!(err, CodecError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_mixed_tagging_renders_homogeneous() {
        let values = LangValues::from_values(vec![
            LangValue::new("Untitled"),
            LangValue::tagged("Sans titre", "fr"),
        ]);
        let rendered = render_lang_values(&values, KeyStyle::Bare).unwrap();
        assert_eq!(
            rendered,
            json!([{"value": "Untitled"}, {"value": "Sans titre", "language": "fr"}])
        );
        let reparsed = parse_lang_values("Manifest", "label", &rendered).unwrap();
        assert_eq!(reparsed.values(), values.values());
    }

    #[test]
    fn test_tagged_without_value_is_missing() {
        let err = parse_lang_values("Manifest", "label", &json!({"language": "en"})).unwrap_err();
        assert_eq!(err.field(), Some("label.value"));
    }

    #[test]
    fn test_metadata_multi_value_preserved() {
        let raw = json!([{"label": "Creator", "value": ["A", "B"]}]);
        let entries = parse_metadata("Manifest", "metadata", &raw).unwrap();
        assert_eq!(entries[0].value.len(), 2);
        assert_eq!(render_metadata(&entries, KeyStyle::Bare), Some(raw));
    }

    #[test]
    fn test_metadata_single_object_becomes_array() {
        let raw = json!({"label": "Date", "value": "1850"});
        let entries = parse_metadata("Manifest", "metadata", &raw).unwrap();
        assert_eq!(render_metadata(&entries, KeyStyle::Bare), Some(json!([raw])));
    }

    #[test]
    fn test_within_bare_and_object() {
        let bare = parse_references("Manifest", "within", &json!("https://example.org/c")).unwrap();
        assert_eq!(
            render_references(&bare, KeyStyle::Prefixed, ArrayForm::Versioned),
            Some(json!("https://example.org/c"))
        );

        let raw = json!({"@id": "https://example.org/c", "label": "Parent"});
        let object = parse_references("Manifest", "within", &raw).unwrap();
        assert_eq!(object[0].label.for_language("en"), Some("Parent"));
        assert_eq!(
            render_references(&object, KeyStyle::Prefixed, ArrayForm::Versioned),
            Some(raw)
        );
    }

    #[test]
    fn test_versioned_references_are_arrays_in_bare_documents() {
        let raw = json!([{"id": "https://example.org/t.jpg", "type": "Image"}]);
        let refs = parse_references("Manifest", "thumbnail", &raw).unwrap();
        assert_eq!(render_references(&refs, KeyStyle::Bare, ArrayForm::Versioned), Some(raw));
    }

    #[test]
    fn test_reference_keeps_unknown_members() {
        let raw = json!({"id": "https://example.org/t.jpg", "type": "Image", "width": 100});
        let reference = parse_reference("Canvas", "thumbnail", &raw).unwrap();
        assert_eq!(reference.additional.get("width"), Some(&json!(100)));
        assert_eq!(render_reference(&reference, KeyStyle::Bare), raw);
    }

    #[test]
    fn test_reference_without_id() {
        let err = parse_reference("Manifest", "seeAlso", &json!({"format": "text/xml"})).unwrap_err();
        assert!(matches!(err, CodecError::MissingRequiredField { .. }));
        assert_eq!(err.field(), Some("seeAlso.id"));
    }

    #[test]
    fn test_texts_shapes() {
        let texts = parse_texts("Range", "behavior", &json!("paged")).unwrap();
        assert_eq!(render_texts(&texts, KeyStyle::Bare, ArrayForm::Always), Some(json!(["paged"])));
        assert_eq!(render_texts(&texts, KeyStyle::Bare, ArrayForm::Minimal), Some(json!("paged")));
        assert!(parse_texts("Range", "behavior", &json!([1])).is_err());
    }
}
