//! Presentation Catalog
//!
//! Default kind specs for Presentation 2.x and 3.0 documents. Both versions
//! share one spec per concept; version-specific members are simply optional
//! fields of that spec.

use crate::fields::FieldCodec;
use crate::registry::{Discriminator, EntityRegistry, Fallback, KindSpec, TierKind};
use crate::shape::ArrayForm;

/// Kind names registered by the default catalog.
pub mod kinds {
    pub const DOCUMENT: &str = "Document";
    pub const COLLECTION: &str = "Collection";
    pub const COLLECTION_MEMBER: &str = "CollectionMember";
    pub const MANIFEST: &str = "Manifest";
    pub const SEQUENCE: &str = "Sequence";
    pub const CANVAS: &str = "Canvas";
    pub const RANGE: &str = "Range";
    pub const LAYER: &str = "Layer";
    pub const ANNOTATION_LIST: &str = "AnnotationList";
    pub const ANNOTATION_PAGE: &str = "AnnotationPage";
    pub const ANNOTATION: &str = "Annotation";
    pub const CONTENT_RESOURCE: &str = "ContentResource";
    pub const IMAGE_RESOURCE: &str = "ImageResource";
    pub const SOUND_RESOURCE: &str = "SoundResource";
    pub const VIDEO_RESOURCE: &str = "VideoResource";
    pub const TEXT_RESOURCE: &str = "TextResource";
    pub const CHOICE: &str = "Choice";
    pub const SEGMENT_RESOURCE: &str = "SegmentResource";
    pub const SERVICE: &str = "Service";
    pub const IMAGE_SERVICE: &str = "ImageService";
    pub const AUTH_SERVICE: &str = "AuthService";
    pub const SEARCH_SERVICE: &str = "SearchService";
    pub const AUTOCOMPLETE_SERVICE: &str = "AutoCompleteService";
    pub const DISCOVERY_SERVICE: &str = "DiscoveryService";
    pub const CONTENT_STATE_SERVICE: &str = "ContentStateService";

    #[deprecated(note = "use RANGE")]
    pub const STRUCTURE: &str = "Structure";
}

use kinds::*;

const MANIFEST_TAGS: &[&str] = &["sc:Manifest", "Manifest"];
const COLLECTION_TAGS: &[&str] = &["sc:Collection", "Collection"];
const SEQUENCE_TAGS: &[&str] = &["sc:Sequence"];
const CANVAS_TAGS: &[&str] = &["sc:Canvas", "Canvas"];
const RANGE_TAGS: &[&str] = &["sc:Range", "Range"];
const LAYER_TAGS: &[&str] = &["sc:Layer"];
const ANNOTATION_LIST_TAGS: &[&str] = &["sc:AnnotationList"];
const ANNOTATION_PAGE_TAGS: &[&str] = &["AnnotationPage"];
const ANNOTATION_TAGS: &[&str] = &["oa:Annotation", "Annotation"];

const IMAGE_TAGS: &[&str] = &["dctypes:Image", "Image"];
const SOUND_TAGS: &[&str] = &["dctypes:Sound", "Sound", "Audio"];
const VIDEO_TAGS: &[&str] = &["dctypes:MovingImage", "Video"];
const TEXT_TAGS: &[&str] = &["cnt:ContentAsText", "dctypes:Text", "TextualBody", "Text"];
const CHOICE_TAGS: &[&str] = &["oa:Choice", "Choice"];
const SEGMENT_TAGS: &[&str] = &["oa:SpecificResource", "SpecificResource"];

const IMAGE_SERVICE_TAGS: &[&str] = &["ImageService1", "ImageService2", "ImageService3"];
const AUTH_SERVICE_TAGS: &[&str] = &[
    "AuthCookieService1",
    "AuthTokenService1",
    "AuthLogoutService1",
    "AuthProbeService2",
    "AuthAccessService2",
    "AuthAccessTokenService2",
    "AuthLogoutService2",
];
const SEARCH_SERVICE_TAGS: &[&str] = &["SearchService1", "SearchService2"];
const AUTOCOMPLETE_SERVICE_TAGS: &[&str] = &["AutoCompleteService1", "AutoCompleteService2"];
const DISCOVERY_SERVICE_TAGS: &[&str] = &["OrderedCollection"];
const CONTENT_STATE_SERVICE_TAGS: &[&str] = &["ContentStateService"];

const NODE: &[TierKind] = &[TierKind::Node];
const NODE_DIRECTIONAL: &[TierKind] = &[TierKind::Node, TierKind::ViewingDirection];
const RESOURCE_TIERS: &[TierKind] = &[TierKind::Node, TierKind::Dimensions, TierKind::Format];

/// Registers every default kind plus the deprecated `Structure` alias.
pub fn register_presentation(registry: &mut EntityRegistry) {
    for spec in [
        document(),
        collection(),
        collection_member(),
        manifest(),
        sequence(),
        canvas(),
        range(),
        layer(),
        annotation_list(),
        annotation_page(),
        annotation(),
        content_resource(),
        media_resource(IMAGE_RESOURCE, IMAGE_TAGS),
        media_resource(SOUND_RESOURCE, SOUND_TAGS),
        media_resource(VIDEO_RESOURCE, VIDEO_TAGS),
        text_resource(),
        choice(),
        segment_resource(),
        service(),
        image_service(),
        auth_service(),
        KindSpec::new(SEARCH_SERVICE)
            .type_tags(SEARCH_SERVICE_TAGS)
            .field("profile", FieldCodec::Raw),
        KindSpec::new(AUTOCOMPLETE_SERVICE)
            .type_tags(AUTOCOMPLETE_SERVICE_TAGS)
            .field("profile", FieldCodec::Raw),
        discovery_service(),
        KindSpec::new(CONTENT_STATE_SERVICE)
            .type_tags(CONTENT_STATE_SERVICE_TAGS)
            .mandatory(&["id", "profile"])
            .field("profile", FieldCodec::Raw),
    ] {
        registry.register(spec);
    }
    register_aliases(registry);
}

#[allow(deprecated)]
fn register_aliases(registry: &mut EntityRegistry) {
    registry.register_alias(STRUCTURE, RANGE);
}

fn document() -> KindSpec {
    KindSpec::abstract_kind(DOCUMENT)
        .subtype(Discriminator::TypeTag(MANIFEST_TAGS), MANIFEST)
        .subtype(Discriminator::TypeTag(COLLECTION_TAGS), COLLECTION)
        .subtype(Discriminator::TypeTag(CANVAS_TAGS), CANVAS)
        .subtype(Discriminator::TypeTag(SEQUENCE_TAGS), SEQUENCE)
        .subtype(Discriminator::TypeTag(RANGE_TAGS), RANGE)
        .subtype(Discriminator::TypeTag(ANNOTATION_LIST_TAGS), ANNOTATION_LIST)
        .subtype(Discriminator::TypeTag(ANNOTATION_PAGE_TAGS), ANNOTATION_PAGE)
        .subtype(Discriminator::TypeTag(LAYER_TAGS), LAYER)
}

fn collection() -> KindSpec {
    KindSpec::new(COLLECTION)
        .type_tags(COLLECTION_TAGS)
        .mandatory(&["id", "type"])
        .tiers(NODE_DIRECTIONAL)
        .field("navDate", FieldCodec::DateTime)
        .field("collections", FieldCodec::Entities(COLLECTION))
        .field("manifests", FieldCodec::Entities(MANIFEST))
        .field("members", FieldCodec::Entities(COLLECTION_MEMBER))
        .field("items", FieldCodec::Entities(COLLECTION_MEMBER))
        .field("total", FieldCodec::Integer)
        .field("startIndex", FieldCodec::Integer)
        .field("first", FieldCodec::Reference)
        .field("last", FieldCodec::Reference)
        .field("next", FieldCodec::Reference)
        .field("prev", FieldCodec::Reference)
        .field("placeholderCanvas", FieldCodec::Entity(CANVAS))
        .field("accompanyingCanvas", FieldCodec::Entity(CANVAS))
        .field("annotations", FieldCodec::Entities(ANNOTATION_PAGE))
        .field("services", FieldCodec::Entities(SERVICE))
}

/// Entries of a collection's `members` / `items`.
fn collection_member() -> KindSpec {
    KindSpec::abstract_kind(COLLECTION_MEMBER)
        .subtype(Discriminator::TypeTag(MANIFEST_TAGS), MANIFEST)
        .subtype(Discriminator::TypeTag(COLLECTION_TAGS), COLLECTION)
}

fn manifest() -> KindSpec {
    KindSpec::new(MANIFEST)
        .type_tags(MANIFEST_TAGS)
        .mandatory(&["id", "type"])
        .tiers(NODE_DIRECTIONAL)
        .field("navDate", FieldCodec::DateTime)
        .field("sequences", FieldCodec::Entities(SEQUENCE))
        .field("structures", FieldCodec::Entities(RANGE))
        .field("items", FieldCodec::Entities(CANVAS))
        .field("start", FieldCodec::Reference)
        .field("placeholderCanvas", FieldCodec::Entity(CANVAS))
        .field("accompanyingCanvas", FieldCodec::Entity(CANVAS))
        .field("annotations", FieldCodec::Entities(ANNOTATION_PAGE))
        .field("services", FieldCodec::Entities(SERVICE))
}

/// 2.x only. The id is optional; the canvases are not.
fn sequence() -> KindSpec {
    KindSpec::new(SEQUENCE)
        .type_tags(SEQUENCE_TAGS)
        .mandatory(&["type", "canvases"])
        .tiers(NODE_DIRECTIONAL)
        .field("canvases", FieldCodec::Entities(CANVAS))
        .field("startCanvas", FieldCodec::Reference)
}

fn canvas() -> KindSpec {
    KindSpec::new(CANVAS)
        .type_tags(CANVAS_TAGS)
        .mandatory(&["id", "type"])
        .tiers(&[TierKind::Node, TierKind::Dimensions])
        .field("images", FieldCodec::Entities(ANNOTATION))
        .field("otherContent", FieldCodec::Entities(ANNOTATION_LIST))
        .field("items", FieldCodec::Entities(ANNOTATION_PAGE))
        .field("annotations", FieldCodec::Entities(ANNOTATION_PAGE))
        .field("placeholderCanvas", FieldCodec::Entity(CANVAS))
        .field("accompanyingCanvas", FieldCodec::Entity(CANVAS))
}

fn range() -> KindSpec {
    KindSpec::new(RANGE)
        .type_tags(RANGE_TAGS)
        .mandatory(&["id", "type"])
        .tiers(NODE_DIRECTIONAL)
        .field("canvases", FieldCodec::Texts(ArrayForm::Always))
        .field("ranges", FieldCodec::Texts(ArrayForm::Always))
        .field("members", FieldCodec::Raw)
        .field("items", FieldCodec::Raw)
        .field("startCanvas", FieldCodec::Reference)
        .field("start", FieldCodec::Reference)
        .field("contentLayer", FieldCodec::Reference)
        .field("supplementary", FieldCodec::Reference)
        .field("annotations", FieldCodec::Entities(ANNOTATION_PAGE))
}

/// 2.x only. `otherContent` lists annotation list ids, not embedded lists.
fn layer() -> KindSpec {
    KindSpec::new(LAYER)
        .type_tags(LAYER_TAGS)
        .tiers(NODE)
        .field("otherContent", FieldCodec::Texts(ArrayForm::Always))
}

fn annotation_list() -> KindSpec {
    KindSpec::new(ANNOTATION_LIST)
        .type_tags(ANNOTATION_LIST_TAGS)
        .tiers(NODE)
        .field("resources", FieldCodec::Entities(ANNOTATION))
}

fn annotation_page() -> KindSpec {
    KindSpec::new(ANNOTATION_PAGE)
        .type_tags(ANNOTATION_PAGE_TAGS)
        .tiers(NODE)
        .field("items", FieldCodec::Entities(ANNOTATION))
}

fn annotation() -> KindSpec {
    KindSpec::new(ANNOTATION)
        .type_tags(ANNOTATION_TAGS)
        .mandatory(&["type"])
        .tiers(NODE)
        .field("motivation", FieldCodec::Texts(ArrayForm::Minimal))
        .field("resource", FieldCodec::OneOrMany(CONTENT_RESOURCE))
        .field("on", FieldCodec::Raw)
        .field("body", FieldCodec::OneOrMany(CONTENT_RESOURCE))
        .field("target", FieldCodec::Raw)
        .field("timeMode", FieldCodec::Text)
        .exclusive(&["resource", "body"])
        .exclusive(&["on", "target"])
}

/// Generic content resource. Subtypes are picked by tag, then by shape.
fn content_resource() -> KindSpec {
    KindSpec::new(CONTENT_RESOURCE)
        .tiers(RESOURCE_TIERS)
        .subtype(Discriminator::TypeTag(IMAGE_TAGS), IMAGE_RESOURCE)
        .subtype(Discriminator::TypeTag(SOUND_TAGS), SOUND_RESOURCE)
        .subtype(Discriminator::TypeTag(VIDEO_TAGS), VIDEO_RESOURCE)
        .subtype(Discriminator::TypeTag(TEXT_TAGS), TEXT_RESOURCE)
        .subtype(Discriminator::TypeTag(CHOICE_TAGS), CHOICE)
        .subtype(Discriminator::TypeTag(SEGMENT_TAGS), SEGMENT_RESOURCE)
        .subtype(Discriminator::HasKeys(&["duration", "width", "height"]), VIDEO_RESOURCE)
        .subtype(Discriminator::HasKeys(&["width", "height"]), IMAGE_RESOURCE)
        .subtype(Discriminator::HasKeys(&["duration"]), SOUND_RESOURCE)
        .subtype(Discriminator::HasKeys(&["chars"]), TEXT_RESOURCE)
        .subtype(Discriminator::HasKeys(&["default", "item"]), CHOICE)
        .subtype(Discriminator::HasKeys(&["full"]), SEGMENT_RESOURCE)
        .fallback(Fallback::Generic)
}

fn media_resource(name: &'static str, tags: &'static [&'static str]) -> KindSpec {
    KindSpec::new(name).type_tags(tags).tiers(RESOURCE_TIERS)
}

/// Embedded text. 2.x `chars`, 3.0 `value`; no id required.
fn text_resource() -> KindSpec {
    KindSpec::new(TEXT_RESOURCE)
        .type_tags(TEXT_TAGS)
        .mandatory(&[])
        .tiers(&[TierKind::Node, TierKind::Format])
        .field("chars", FieldCodec::Text)
        .field("value", FieldCodec::Text)
        .field("language", FieldCodec::Texts(ArrayForm::Minimal))
        .exclusive(&["chars", "value"])
}

fn choice() -> KindSpec {
    KindSpec::new(CHOICE)
        .type_tags(CHOICE_TAGS)
        .mandatory(&["type"])
        .tiers(NODE)
        .field("default", FieldCodec::Entity(CONTENT_RESOURCE))
        .field("item", FieldCodec::OneOrMany(CONTENT_RESOURCE))
        .field("items", FieldCodec::Entities(CONTENT_RESOURCE))
        .exclusive(&["item", "items"])
}

/// Region of another resource. `full` is the whole resource, decoded like
/// any other content resource; 3.0 documents point at it through `source`.
fn segment_resource() -> KindSpec {
    KindSpec::new(SEGMENT_RESOURCE)
        .type_tags(SEGMENT_TAGS)
        .mandatory(&[])
        .tiers(RESOURCE_TIERS)
        .field("full", FieldCodec::Entity(CONTENT_RESOURCE))
        .field("source", FieldCodec::Raw)
        .field("selector", FieldCodec::Raw)
}

/// Generic service. 2.x services usually carry no type, so the profile
/// and context URIs are the discriminators there.
fn service() -> KindSpec {
    KindSpec::new(SERVICE)
        .field("profile", FieldCodec::Raw)
        .subtype(Discriminator::TypeTag(IMAGE_SERVICE_TAGS), IMAGE_SERVICE)
        .subtype(Discriminator::TypeTag(AUTH_SERVICE_TAGS), AUTH_SERVICE)
        .subtype(Discriminator::TypeTag(SEARCH_SERVICE_TAGS), SEARCH_SERVICE)
        .subtype(Discriminator::TypeTag(AUTOCOMPLETE_SERVICE_TAGS), AUTOCOMPLETE_SERVICE)
        .subtype(Discriminator::TypeTag(DISCOVERY_SERVICE_TAGS), DISCOVERY_SERVICE)
        .subtype(Discriminator::TypeTag(CONTENT_STATE_SERVICE_TAGS), CONTENT_STATE_SERVICE)
        .subtype(
            Discriminator::FieldContains {
                field: "profile",
                needle: "iiif.io/api/image",
            },
            IMAGE_SERVICE,
        )
        .subtype(
            Discriminator::FieldContains {
                field: "@context",
                needle: "iiif.io/api/image",
            },
            IMAGE_SERVICE,
        )
        .subtype(
            Discriminator::FieldContains {
                field: "profile",
                needle: "iiif.io/api/auth",
            },
            AUTH_SERVICE,
        )
        .subtype(
            Discriminator::FieldContains {
                field: "profile",
                needle: "autocomplete",
            },
            AUTOCOMPLETE_SERVICE,
        )
        .subtype(
            Discriminator::FieldContains {
                field: "profile",
                needle: "iiif.io/api/search",
            },
            SEARCH_SERVICE,
        )
        .subtype(
            Discriminator::FieldContains {
                field: "profile",
                needle: "iiif.io/api/discovery",
            },
            DISCOVERY_SERVICE,
        )
        .subtype(
            Discriminator::FieldContains {
                field: "profile",
                needle: "iiif.io/api/content-state",
            },
            CONTENT_STATE_SERVICE,
        )
        .fallback(Fallback::Generic)
}

fn image_service() -> KindSpec {
    KindSpec::new(IMAGE_SERVICE)
        .type_tags(IMAGE_SERVICE_TAGS)
        .tiers(&[TierKind::Dimensions])
        .field("protocol", FieldCodec::Text)
        .field("profile", FieldCodec::Raw)
        .field("tiles", FieldCodec::Raw)
        .field("sizes", FieldCodec::Raw)
        .field("maxWidth", FieldCodec::Integer)
        .field("maxHeight", FieldCodec::Integer)
        .field("maxArea", FieldCodec::Integer)
        .field("rights", FieldCodec::Text)
        .field("preferredFormats", FieldCodec::Texts(ArrayForm::Always))
        .field("extraQualities", FieldCodec::Texts(ArrayForm::Always))
        .field("extraFormats", FieldCodec::Texts(ArrayForm::Always))
        .field("extraFeatures", FieldCodec::Texts(ArrayForm::Always))
}

fn auth_service() -> KindSpec {
    KindSpec::new(AUTH_SERVICE)
        .type_tags(AUTH_SERVICE_TAGS)
        .field("profile", FieldCodec::Raw)
        .field("label", FieldCodec::LangValues)
        .field("header", FieldCodec::LangValues)
        .field("description", FieldCodec::LangValues)
        .field("confirmLabel", FieldCodec::LangValues)
        .field("failureHeader", FieldCodec::LangValues)
        .field("failureDescription", FieldCodec::LangValues)
}

/// Change Discovery endpoint. Activities stay verbatim.
fn discovery_service() -> KindSpec {
    KindSpec::new(DISCOVERY_SERVICE)
        .type_tags(DISCOVERY_SERVICE_TAGS)
        .mandatory(&["id", "profile"])
        .field("profile", FieldCodec::Raw)
        .field("orderedItems", FieldCodec::Raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_referenced_kind_is_registered() {
        let registry = EntityRegistry::presentation();
        for spec in registry.list() {
            for rule in &spec.subtypes {
                assert!(registry.get(rule.subtype).is_some(), "{} -> {}", spec.name, rule.subtype);
            }
            for descriptor in &spec.fields {
                let nested = match descriptor.codec {
                    FieldCodec::Entity(kind) | FieldCodec::Entities(kind) | FieldCodec::OneOrMany(kind) => kind,
                    _ => continue,
                };
                assert!(registry.get(nested).is_some(), "{}.{} -> {}", spec.name, descriptor.name, nested);
            }
        }
    }

    #[test]
    fn test_exclusive_groups_name_declared_fields() {
        let registry = EntityRegistry::presentation();
        for spec in registry.list() {
            for name in spec.exclusive.iter().flat_map(|group| group.iter()) {
                assert!(spec.descriptor(name).is_some(), "{}.{name}", spec.name);
            }
        }
    }

    #[test]
    #[allow(deprecated)]
    fn test_structure_is_range_alias() {
        let registry = EntityRegistry::presentation();
        assert!(registry.is_alias(STRUCTURE));
        assert_eq!(registry.get(STRUCTURE).map(|s| s.name), Some(RANGE));
    }

    #[test]
    fn test_subtype_tags_agree_with_subtype_specs() {
        let registry = EntityRegistry::presentation();
        for spec in registry.list() {
            for rule in &spec.subtypes {
                if let Discriminator::TypeTag(tags) = rule.discriminator {
                    let subtype = registry.get(rule.subtype).unwrap();
                    for tag in tags {
                        assert!(subtype.type_rule.accepts(tag), "{} rejects {tag}", subtype.name);
                    }
                }
            }
        }
    }
}
