//! Polymorphic Dispatch
//!
//! Subtype selection is an ordered list of `(discriminator, subtype)` rules
//! evaluated without side effects:
//!
//! 1. An explicit type tag is matched against `TypeTag` rules, in order.
//! 2. Otherwise shape rules are scored by specificity. The highest score
//!    wins; equal scores go to the earlier rule.
//! 3. With nothing matched the kind's fallback applies.
//!
//! Resolution repeats on the chosen subtype until it has no further rules.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CodecError;
use crate::options::KeyStyle;
use crate::registry::{Discriminator, EntityRegistry, Fallback, KindSpec, SubtypeRule};

/// Specificity of a shape rule against an object; `None` if it does not match.
pub fn shape_score(discriminator: &Discriminator, object: &Map<String, Value>) -> Option<usize> {
    match discriminator {
        Discriminator::TypeTag(_) => None,
        Discriminator::HasKeys(keys) => keys
            .iter()
            .all(|key| object.contains_key(*key))
            .then_some(keys.len()),
        Discriminator::FieldContains { field, needle } => {
            let matches = match object.get(*field) {
                Some(Value::String(s)) => s.contains(needle),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|s| s.contains(needle)),
                _ => false,
            };
            matches.then_some(1)
        }
    }
}

fn type_tag<'a>(object: &'a Map<String, Value>, style: KeyStyle) -> Option<&'a str> {
    object.get(style.type_key()).and_then(Value::as_str)
}

/// Picks one subtype rule for a single level of the hierarchy.
fn select<'s>(
    registry: &EntityRegistry,
    spec: &'s KindSpec,
    object: &Map<String, Value>,
    style: KeyStyle,
) -> Option<&'s SubtypeRule> {
    let tag = type_tag(object, style);

    if let Some(tag) = tag {
        let tagged = spec.subtypes.iter().find(|rule| match rule.discriminator {
            Discriminator::TypeTag(tags) => tags.iter().any(|t| *t == tag),
            _ => false,
        });
        if tagged.is_some() {
            return tagged;
        }
    }

    let mut best: Option<(usize, &SubtypeRule)> = None;
    for rule in &spec.subtypes {
        let Some(score) = shape_score(&rule.discriminator, object) else {
            continue;
        };
        // A present tag that the subtype cannot carry rules it out.
        if let (Some(tag), Some(subtype)) = (tag, registry.get(rule.subtype)) {
            if !subtype.type_rule.accepts(tag) {
                continue;
            }
        }
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, rule));
        }
    }
    best.map(|(_, rule)| rule)
}

/// Resolves the concrete kind for a raw object decoded as `spec`.
pub fn resolve<'r>(
    registry: &'r EntityRegistry,
    spec: &'r KindSpec,
    object: &Map<String, Value>,
    style: KeyStyle,
) -> Result<&'r KindSpec, CodecError> {
    let mut current = spec;

    // Bounded by the registry size so an alias cycle cannot loop forever.
    for _ in 0..=registry.len() {
        if current.subtypes.is_empty() {
            break;
        }

        match select(registry, current, object, style) {
            Some(rule) => {
                let next = registry.resolve(rule.subtype)?;
                debug!(
                    from = current.name,
                    to = next.name,
                    rule = %rule.discriminator.describe(),
                    "Dispatched to subtype"
                );
                if next.name == current.name {
                    break;
                }
                current = next;
            }
            None => match current.fallback {
                Fallback::Generic => {
                    debug!(kind = current.name, "No subtype rule matched, using generic kind");
                    break;
                }
                Fallback::Reject => {
                    return Err(CodecError::UnresolvedPolymorphicType {
                        owner_type: current.name.to_string(),
                        available_discriminators: current
                            .subtypes
                            .iter()
                            .map(SubtypeRule::describe)
                            .collect(),
                    })
                }
            },
        }
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::KindSpec;
    use serde_json::json;

    fn registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry.register(
            KindSpec::new("Resource")
                .subtype(Discriminator::TypeTag(&["Image"]), "Image")
                .subtype(Discriminator::TypeTag(&["Video"]), "Video")
                .subtype(Discriminator::HasKeys(&["width", "height"]), "Image")
                .subtype(Discriminator::HasKeys(&["duration", "width", "height"]), "Video")
                .subtype(Discriminator::HasKeys(&["width", "height"]), "Panel"),
        );
        registry.register(KindSpec::new("Image").type_tags(&["Image"]));
        registry.register(KindSpec::new("Video").type_tags(&["Video"]));
        registry.register(KindSpec::new("Panel").type_tags(&["Panel"]));
        registry.register(
            KindSpec::abstract_kind("Root").subtype(Discriminator::TypeTag(&["Image"]), "Image"),
        );
        registry
    }

    fn pick(kind: &str, raw: Value) -> Result<&'static str, CodecError> {
        let registry = registry();
        let spec = registry.resolve(kind)?;
        let object = raw.as_object().cloned().unwrap_or_default();
        resolve(&registry, spec, &object, KeyStyle::Bare).map(|s| s.name)
    }

    #[test]
    fn test_type_tag_wins_over_shape() {
        let raw = json!({"type": "Image", "duration": 1, "width": 1, "height": 1});
        assert_eq!(pick("Resource", raw).unwrap(), "Image");
    }

    #[test]
    fn test_most_specific_shape_wins() {
        let raw = json!({"duration": 3.5, "width": 640, "height": 480});
        assert_eq!(pick("Resource", raw).unwrap(), "Video");
    }

    #[test]
    fn test_equal_scores_go_to_earlier_rule() {
        for _ in 0..16 {
            assert_eq!(pick("Resource", json!({"width": 1, "height": 2})).unwrap(), "Image");
        }
    }

    #[test]
    fn test_unknown_tag_skips_incompatible_shapes() {
        let raw = json!({"type": "Dataset", "width": 1, "height": 2});
        assert_eq!(pick("Resource", raw).unwrap(), "Resource");
    }

    #[test]
    fn test_reject_fallback_lists_discriminators() {
        let err = pick("Root", json!({"type": "Sound"})).unwrap_err();
        match err {
            CodecError::UnresolvedPolymorphicType {
                owner_type,
                available_discriminators,
            } => {
                assert_eq!(owner_type, "Root");
                assert_eq!(available_discriminators, vec!["Image (type in [Image])"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_field_contains_on_arrays() {
        let discriminator = Discriminator::FieldContains {
            field: "profile",
            needle: "iiif.io/api/image",
        };
        let raw = json!({"profile": ["http://iiif.io/api/image/2/level2.json", {"formats": ["png"]}]});
        assert_eq!(shape_score(&discriminator, raw.as_object().unwrap()), Some(1));
    }
}
