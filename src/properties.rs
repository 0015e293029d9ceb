//! Property Values - canonical in-memory forms of node properties

use serde_json::{Map, Number, Value};

use crate::options::KeyStyle;

/// One string value with an optional BCP 47 language tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangValue {
    pub value: String,
    pub language: Option<String>,
}

impl LangValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
        }
    }

    pub fn tagged(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: Some(language.into()),
        }
    }

    pub fn is_tagged(&self) -> bool {
        self.language.is_some()
    }
}

/// JSON form a set of language values was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LangForm {
    /// Bare string, tagged object, or array of either.
    #[default]
    Minimal,
    /// `{"en": ["..."], "none": ["..."]}`
    LanguageMap,
}

/// Ordered set of language-tagged values. This is the canonical form of
/// every language-sensitive property (label, description, metadata values).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LangValues {
    values: Vec<LangValue>,
    form: LangForm,
    style: Option<KeyStyle>,
}

impl LangValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<LangValue>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn language_map(values: Vec<LangValue>) -> Self {
        Self {
            values,
            form: LangForm::LanguageMap,
            style: None,
        }
    }

    pub(crate) fn with_style(mut self, style: Option<KeyStyle>) -> Self {
        self.style = style;
        self
    }

    pub fn values(&self) -> &[LangValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = &LangValue> {
        self.values.iter()
    }

    pub fn first(&self) -> Option<&LangValue> {
        self.values.first()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn form(&self) -> LangForm {
        self.form
    }

    /// Key style of tagged objects, when it was observed on input.
    pub fn style(&self) -> Option<KeyStyle> {
        self.style
    }

    /// Appends a value if an equal one is not already present.
    pub fn push(&mut self, value: LangValue) {
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }

    pub fn remove(&mut self, value: &LangValue) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v != value);
        before != self.values.len()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// First value for a language, falling back to the first untagged value.
    pub fn for_language(&self, language: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.language.as_deref() == Some(language))
            .or_else(|| self.values.iter().find(|v| v.language.is_none()))
            .map(|v| v.value.as_str())
    }
}

impl From<&str> for LangValues {
    fn from(value: &str) -> Self {
        Self::from_values(vec![LangValue::new(value)])
    }
}

impl From<LangValue> for LangValues {
    fn from(value: LangValue) -> Self {
        Self::from_values(vec![value])
    }
}

/// A label/value pair. Also used for `requiredStatement`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataEntry {
    pub label: LangValues,
    pub value: LangValues,
    pub additional: Map<String, Value>,
}

impl MetadataEntry {
    pub fn new(label: impl Into<LangValues>, value: impl Into<LangValues>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            additional: Map::new(),
        }
    }

    pub fn add_value(&mut self, value: LangValue) -> &mut Self {
        self.value.push(value);
        self
    }
}

/// Lookup relation to another resource by id (within, seeAlso, thumbnail...).
///
/// A reference never owns the referenced resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub id: String,
    pub type_name: Option<String>,
    pub label: LangValues,
    pub format: Option<String>,
    pub additional: Map<String, Value>,
    pub(crate) style: Option<KeyStyle>,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: None,
            label: LangValues::new(),
            format: None,
            additional: Map::new(),
            style: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<LangValues>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// True when the id alone recovers the reference.
    pub fn is_bare(&self) -> bool {
        self.type_name.is_none()
            && self.label.is_empty()
            && self.format.is_none()
            && self.additional.is_empty()
    }

    pub fn style(&self) -> Option<KeyStyle> {
        self.style
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewingDirection {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
    Other(String),
}

impl ViewingDirection {
    pub fn as_str(&self) -> &str {
        match self {
            Self::LeftToRight => "left-to-right",
            Self::RightToLeft => "right-to-left",
            Self::TopToBottom => "top-to-bottom",
            Self::BottomToTop => "bottom-to-top",
            Self::Other(value) => value,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "left-to-right" => Self::LeftToRight,
            "right-to-left" => Self::RightToLeft,
            "top-to-bottom" => Self::TopToBottom,
            "bottom-to-top" => Self::BottomToTop,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimensions {
    pub width: Option<u64>,
    pub height: Option<u64>,
    /// Seconds. Kept as the JSON number that was read.
    pub duration: Option<Number>,
}

impl Dimensions {
    pub fn new(width: u64, height: u64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            duration: None,
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.as_ref().and_then(Number::as_f64)
    }

    pub fn set_duration_secs(&mut self, seconds: f64) {
        self.duration = Number::from_f64(seconds);
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.duration.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_values_push_dedupes() {
        let mut values = LangValues::new();
        values.push(LangValue::new("Hello"));
        values.push(LangValue::new("Hello"));
        values.push(LangValue::tagged("Hello", "en"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_for_language_falls_back_to_untagged() {
        let values = LangValues::from_values(vec![
            LangValue::new("Untitled"),
            LangValue::tagged("Titre", "fr"),
        ]);
        assert_eq!(values.for_language("fr"), Some("Titre"));
        assert_eq!(values.for_language("de"), Some("Untitled"));
    }

    #[test]
    fn test_reference_bare() {
        assert!(Reference::new("https://example.org/c/1").is_bare());
        assert!(!Reference::new("https://example.org/c/1").with_type("sc:Collection").is_bare());
    }

    #[test]
    fn test_viewing_direction_round_trip() {
        for raw in ["left-to-right", "right-to-left", "top-to-bottom", "bottom-to-top", "spiral"] {
            assert_eq!(ViewingDirection::parse(raw).as_str(), raw);
        }
    }
}
