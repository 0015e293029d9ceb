//! Codec Options - versioned key vocabulary and decode policy

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Keyword spelling used by a JSON object.
///
/// Presentation 2.x documents are JSON-LD with `@`-prefixed keywords,
/// Presentation 3.0 documents use the bare forms.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KeyStyle {
    Prefixed,
    #[default]
    Bare,
}

impl KeyStyle {
    pub fn id_key(self) -> &'static str {
        match self {
            Self::Prefixed => "@id",
            Self::Bare => "id",
        }
    }

    pub fn type_key(self) -> &'static str {
        match self {
            Self::Prefixed => "@type",
            Self::Bare => "type",
        }
    }

    pub fn value_key(self) -> &'static str {
        match self {
            Self::Prefixed => "@value",
            Self::Bare => "value",
        }
    }

    pub fn language_key(self) -> &'static str {
        match self {
            Self::Prefixed => "@language",
            Self::Bare => "language",
        }
    }

    /// Detect the style of an object from its identity keywords.
    pub fn detect(object: &Map<String, Value>) -> Option<Self> {
        if object.contains_key("@id") || object.contains_key("@type") {
            Some(Self::Prefixed)
        } else if object.contains_key("id") || object.contains_key("type") {
            Some(Self::Bare)
        } else {
            None
        }
    }

    /// Detect the style of a language-tagged object.
    pub fn detect_tagged(object: &Map<String, Value>) -> Option<Self> {
        if object.contains_key("@value") || object.contains_key("@language") {
            Some(Self::Prefixed)
        } else if object.contains_key("value") || object.contains_key("language") {
            Some(Self::Bare)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TypeChecking {
    /// Unknown type tags on fixed kinds are accepted and logged.
    #[default]
    Lenient,
    /// Unknown type tags on fixed kinds fail the decode.
    Strict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodecOptions {
    #[serde(default)]
    pub default_key_style: KeyStyle,
    #[serde(default)]
    pub type_checking: TypeChecking,
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid options file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CodecOptions {
    pub fn from_json_str(content: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn with_key_style(mut self, style: KeyStyle) -> Self {
        self.default_key_style = style;
        self
    }

    pub fn strict(mut self) -> Self {
        self.type_checking = TypeChecking::Strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_object() {
        let options = CodecOptions::from_json_str("{}").unwrap();
        assert_eq!(options, CodecOptions::default());
        assert_eq!(options.default_key_style, KeyStyle::Bare);
        assert_eq!(options.type_checking, TypeChecking::Lenient);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"defaultKeyStyle": "prefixed", "typeChecking": "strict", "pretty": true}}"#
        )
        .unwrap();

        let options = CodecOptions::load(file.path()).unwrap();
        assert_eq!(options.default_key_style, KeyStyle::Prefixed);
        assert_eq!(options.type_checking, TypeChecking::Strict);
        assert!(options.pretty);
    }

    #[test]
    fn test_load_rejects_unknown_style() {
        let err = CodecOptions::from_json_str(r#"{"defaultKeyStyle": "jsonld"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid options file"));
    }

    #[test]
    fn test_detect_style() {
        let v2 = json!({"@id": "a", "@type": "sc:Manifest"});
        let v3 = json!({"id": "a", "type": "Manifest"});
        let none = json!({"label": "x"});
        assert_eq!(KeyStyle::detect(v2.as_object().unwrap()), Some(KeyStyle::Prefixed));
        assert_eq!(KeyStyle::detect(v3.as_object().unwrap()), Some(KeyStyle::Bare));
        assert_eq!(KeyStyle::detect(none.as_object().unwrap()), None);
    }
}
