//! Codec Errors
//!
//! Decode is atomic: the first error raised anywhere in the tier chain is
//! returned as-is to the caller, so the owner type and field always point at
//! the object that actually failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Missing required field `{field}` on {owner_type}")]
    MissingRequiredField { owner_type: String, field: String },

    #[error("Field `{field}` on {owner_type} must be {expected_shape}, found {actual_shape}")]
    ShapeMismatch {
        owner_type: String,
        field: String,
        expected_shape: String,
        actual_shape: String,
    },

    #[error(
        "Cannot resolve a concrete type for {owner_type}; known discriminators: {}",
        available_discriminators.join(", ")
    )]
    UnresolvedPolymorphicType {
        owner_type: String,
        available_discriminators: Vec<String>,
    },

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Inconsistent {owner_type}: {reason}")]
    InconsistentEntity { owner_type: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    pub fn missing(owner_type: &str, field: &str) -> Self {
        Self::MissingRequiredField {
            owner_type: owner_type.to_string(),
            field: field.to_string(),
        }
    }

    pub fn shape(owner_type: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::ShapeMismatch {
            owner_type: owner_type.to_string(),
            field: field.to_string(),
            expected_shape: expected.to_string(),
            actual_shape: actual.to_string(),
        }
    }

    pub fn inconsistent(owner_type: &str, reason: impl Into<String>) -> Self {
        Self::InconsistentEntity {
            owner_type: owner_type.to_string(),
            reason: reason.into(),
        }
    }

    /// Field name carried by field-level errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field, .. } | Self::ShapeMismatch { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }

    /// Owner type carried by entity-level errors.
    pub fn owner_type(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { owner_type, .. }
            | Self::ShapeMismatch { owner_type, .. }
            | Self::UnresolvedPolymorphicType { owner_type, .. }
            | Self::InconsistentEntity { owner_type, .. } => Some(owner_type),
            Self::UnknownKind(kind) => Some(kind),
            Self::Json(_) => None,
        }
    }
}
