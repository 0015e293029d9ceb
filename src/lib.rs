//! IIIF Manifest Codec - Lossless Presentation Document Codec
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Unknown Members Survive
//! 2. Parent Tiers Read And Write First
//! 3. One Canonical Form Per Property
//! 4. Decode Is All-Or-Nothing
//! 5. Encode Fails Loudly, Never Drops

pub mod canonical;
pub mod catalog;
pub mod codec;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod fields;
pub mod lint;
pub mod options;
pub mod properties;
pub mod reader;
pub mod registry;
pub mod shape;
pub mod tiers;
pub mod tracker;

pub use canonical::{canonical_json, fingerprint, structurally_equal};
pub use catalog::kinds;
pub use codec::Codec;
pub use entity::{Capabilities, Entity, NodeFields};
pub use error::CodecError;
pub use lint::{LintFinding, LintReport, LintSeverity, Linter};
pub use options::{CodecOptions, KeyStyle, OptionsError, TypeChecking};
pub use properties::{Dimensions, LangValue, LangValues, MetadataEntry, Reference, ViewingDirection};
pub use registry::{EntityRegistry, KindSpec};
pub use tracker::{FieldValue, PropertyTracker};

pub const CODEC_VERSION: &str = env!("CARGO_PKG_VERSION");
