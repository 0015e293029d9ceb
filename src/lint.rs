//! Version Lint - Rule/Report Separation
//!
//! Rules inspect a decoded graph against a target Presentation version and
//! produce structured findings. The lifecycle tables are static metadata;
//! the codec never reads them.

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LintSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintFinding {
    pub rule: String,
    pub severity: LintSeverity,
    pub kind: String,
    pub entity_id: Option<String>,
    pub field: Option<String>,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintReport {
    pub target: String,
    pub findings: Vec<LintFinding>,
}

impl LintReport {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == LintSeverity::Error)
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Version window of a field or kind.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    /// `None` applies to every kind.
    pub kind: Option<&'static str>,
    pub name: &'static str,
    pub introduced: (u64, u64),
    pub deprecated: Option<(u64, u64)>,
    pub replaced_by: Option<&'static str>,
}

const fn field(
    kind: Option<&'static str>,
    name: &'static str,
    introduced: (u64, u64),
    deprecated: Option<(u64, u64)>,
    replaced_by: Option<&'static str>,
) -> Lifecycle {
    Lifecycle {
        kind,
        name,
        introduced,
        deprecated,
        replaced_by,
    }
}

const V2_0: (u64, u64) = (2, 0);
const V2_1: (u64, u64) = (2, 1);
const V3_0: (u64, u64) = (3, 0);

pub static FIELD_LIFECYCLE: &[Lifecycle] = &[
    field(None, "viewingHint", V2_0, Some(V3_0), Some("behavior")),
    field(None, "attribution", V2_0, Some(V3_0), Some("requiredStatement")),
    field(None, "license", V2_0, Some(V3_0), Some("rights")),
    field(None, "description", V2_0, Some(V3_0), Some("summary")),
    field(None, "related", V2_0, Some(V3_0), Some("homepage")),
    field(None, "within", V2_0, Some(V3_0), Some("partOf")),
    field(None, "summary", V3_0, None, None),
    field(None, "requiredStatement", V3_0, None, None),
    field(None, "rights", V3_0, None, None),
    field(None, "behavior", V3_0, None, None),
    field(None, "homepage", V3_0, None, None),
    field(None, "provider", V3_0, None, None),
    field(None, "partOf", V3_0, None, None),
    field(None, "placeholderCanvas", V3_0, None, None),
    field(None, "accompanyingCanvas", V3_0, None, None),
    field(None, "annotations", V3_0, None, None),
    field(None, "services", V3_0, None, None),
    field(None, "duration", V2_1, None, None),
    field(Some("Manifest"), "sequences", V2_0, Some(V3_0), Some("items")),
    field(Some("Manifest"), "items", V3_0, None, None),
    field(Some("Manifest"), "start", V3_0, None, None),
    field(Some("Collection"), "collections", V2_0, Some(V3_0), Some("items")),
    field(Some("Collection"), "manifests", V2_0, Some(V3_0), Some("items")),
    field(Some("Collection"), "members", V2_1, Some(V3_0), Some("items")),
    field(Some("Collection"), "items", V3_0, None, None),
    field(Some("Canvas"), "images", V2_0, Some(V3_0), Some("items")),
    field(Some("Canvas"), "otherContent", V2_0, Some(V3_0), Some("annotations")),
    field(Some("Canvas"), "items", V3_0, None, None),
    field(Some("Range"), "canvases", V2_0, Some(V3_0), Some("items")),
    field(Some("Range"), "ranges", V2_0, Some(V3_0), Some("items")),
    field(Some("Range"), "members", V2_1, Some(V3_0), Some("items")),
    field(Some("Range"), "items", V3_0, None, None),
    field(Some("Annotation"), "resource", V2_0, Some(V3_0), Some("body")),
    field(Some("Annotation"), "on", V2_0, Some(V3_0), Some("target")),
    field(Some("Annotation"), "timeMode", V3_0, None, None),
];

pub static KIND_LIFECYCLE: &[Lifecycle] = &[
    field(None, "Sequence", V2_0, Some(V3_0), Some("Manifest items")),
    field(None, "AnnotationList", V2_0, Some(V3_0), Some("AnnotationPage")),
    field(None, "AnnotationPage", V3_0, None, None),
    field(None, "Layer", V2_0, Some(V3_0), Some("AnnotationCollection")),
    field(None, "Structure", V2_0, Some(V2_0), Some("Range")),
];

fn version(pair: (u64, u64)) -> Version {
    Version::new(pair.0, pair.1, 0)
}

/// Parses `3`, `3.0` or `3.0.0`.
pub fn parse_target(raw: &str) -> Result<Version, semver::Error> {
    let padded = match raw.matches('.').count() {
        0 => format!("{raw}.0.0"),
        1 => format!("{raw}.0"),
        _ => raw.to_string(),
    };
    Version::parse(&padded)
}

/// Member names an entity would emit, excluding identity and overflow.
fn present_fields(entity: &Entity) -> Vec<&str> {
    let node = entity.node();
    let caps = entity.capabilities();
    let mut names = Vec::new();

    let flags = [
        ("label", !node.label.is_empty()),
        ("summary", !node.summary.is_empty()),
        ("description", !node.description.is_empty()),
        ("metadata", !node.metadata.is_empty()),
        ("requiredStatement", node.required_statement.is_some()),
        ("attribution", !node.attribution.is_empty()),
        ("rights", node.rights.is_some()),
        ("license", !node.license.is_empty()),
        ("logo", !node.logo.is_empty()),
        ("thumbnail", !node.thumbnail.is_empty()),
        ("viewingHint", !node.viewing_hint.is_empty()),
        ("behavior", !node.behavior.is_empty()),
        ("rendering", !node.rendering.is_empty()),
        ("related", !node.related.is_empty()),
        ("homepage", !node.homepage.is_empty()),
        ("provider", !node.provider.is_empty()),
        ("seeAlso", !node.see_also.is_empty()),
        ("within", !node.within.is_empty()),
        ("partOf", !node.part_of.is_empty()),
        ("width", caps.dimensions.width.is_some()),
        ("height", caps.dimensions.height.is_some()),
        ("duration", caps.dimensions.duration.is_some()),
        ("viewingDirection", caps.viewing_direction.is_some()),
        ("format", caps.format.is_some()),
    ];
    names.extend(flags.iter().filter(|(_, set)| *set).map(|(name, _)| *name));
    names.extend(entity.properties().iter().map(|(name, _)| name));
    names
}

fn finding(
    rule: &str,
    severity: LintSeverity,
    entity: &Entity,
    field: Option<&str>,
    message: String,
    remediation: Vec<String>,
) -> LintFinding {
    LintFinding {
        rule: rule.to_string(),
        severity,
        kind: entity.kind().to_string(),
        entity_id: entity.id().map(str::to_string),
        field: field.map(str::to_string),
        message,
        remediation,
    }
}

/// Lint rule trait - produces findings for one entity
pub trait LintRule {
    fn name(&self) -> &'static str;
    fn check(&self, entity: &Entity, target: &Version) -> Vec<LintFinding>;
}

// --- Concrete Rules ---

fn field_entries<'e>(entity: &'e Entity) -> impl Iterator<Item = (&'e str, &'static Lifecycle)> + 'e {
    present_fields(entity).into_iter().filter_map(move |name| {
        FIELD_LIFECYCLE
            .iter()
            .find(|l| l.name == name && l.kind.map_or(true, |k| k == entity.kind()))
            .map(|l| (name, l))
    })
}

pub struct DeprecatedFieldRule;

impl LintRule for DeprecatedFieldRule {
    fn name(&self) -> &'static str {
        "deprecated_field"
    }

    fn check(&self, entity: &Entity, target: &Version) -> Vec<LintFinding> {
        field_entries(entity)
            .filter_map(|(name, lifecycle)| {
                let since = lifecycle.deprecated?;
                (*target >= version(since)).then(|| {
                    finding(
                        self.name(),
                        LintSeverity::Warning,
                        entity,
                        Some(name),
                        format!("`{name}` is deprecated since {}.{}", since.0, since.1),
                        lifecycle
                            .replaced_by
                            .map(|r| vec![format!("Use `{r}` instead")])
                            .unwrap_or_default(),
                    )
                })
            })
            .collect()
    }
}

pub struct UnavailableFieldRule;

impl LintRule for UnavailableFieldRule {
    fn name(&self) -> &'static str {
        "field_not_available"
    }

    fn check(&self, entity: &Entity, target: &Version) -> Vec<LintFinding> {
        field_entries(entity)
            .filter(|(_, lifecycle)| *target < version(lifecycle.introduced))
            .map(|(name, lifecycle)| {
                let (major, minor) = lifecycle.introduced;
                finding(
                    self.name(),
                    LintSeverity::Error,
                    entity,
                    Some(name),
                    format!("`{name}` requires Presentation {major}.{minor}"),
                    vec![format!("Target {major}.{minor} or later, or drop `{name}`")],
                )
            })
            .collect()
    }
}

pub struct KindLifecycleRule;

impl LintRule for KindLifecycleRule {
    fn name(&self) -> &'static str {
        "kind_lifecycle"
    }

    fn check(&self, entity: &Entity, target: &Version) -> Vec<LintFinding> {
        [Some(entity.kind()), entity.alias()]
            .into_iter()
            .flatten()
            .filter_map(|name| KIND_LIFECYCLE.iter().find(|l| l.name == name))
            .flat_map(|lifecycle| self.check_lifecycle(entity, lifecycle, target))
            .collect()
    }
}

impl KindLifecycleRule {
    fn check_lifecycle(
        &self,
        entity: &Entity,
        lifecycle: &Lifecycle,
        target: &Version,
    ) -> Vec<LintFinding> {
        let mut findings = vec![];
        if *target < version(lifecycle.introduced) {
            findings.push(finding(
                self.name(),
                LintSeverity::Error,
                entity,
                None,
                format!(
                    "{} requires Presentation {}.{}",
                    lifecycle.name, lifecycle.introduced.0, lifecycle.introduced.1
                ),
                vec![],
            ));
        }
        if let Some(since) = lifecycle.deprecated {
            if *target >= version(since) {
                findings.push(finding(
                    self.name(),
                    LintSeverity::Warning,
                    entity,
                    None,
                    format!("{} is deprecated since {}.{}", lifecycle.name, since.0, since.1),
                    lifecycle
                        .replaced_by
                        .map(|r| vec![format!("Use {r} instead")])
                        .unwrap_or_default(),
                ));
            }
        }
        findings
    }
}

pub struct UnrecognizedPropertiesRule;

impl LintRule for UnrecognizedPropertiesRule {
    fn name(&self) -> &'static str {
        "unrecognized_properties"
    }

    fn check(&self, entity: &Entity, _target: &Version) -> Vec<LintFinding> {
        entity
            .additional()
            .keys()
            .map(|key| {
                finding(
                    self.name(),
                    LintSeverity::Info,
                    entity,
                    Some(key),
                    format!("`{key}` is not part of the {} schema; kept verbatim", entity.kind()),
                    vec![],
                )
            })
            .collect()
    }
}

/// Linter orchestrates rules over every entity of a graph
pub struct Linter {
    rules: Vec<Box<dyn LintRule>>,
}

impl Linter {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(DeprecatedFieldRule),
                Box::new(UnavailableFieldRule),
                Box::new(KindLifecycleRule),
                Box::new(UnrecognizedPropertiesRule),
            ],
        }
    }

    pub fn lint(&self, root: &Entity, target: &Version) -> LintReport {
        let findings = root
            .walk()
            .into_iter()
            .flat_map(|entity| self.rules.iter().flat_map(move |rule| rule.check(entity, target)))
            .collect();

        LintReport {
            target: target.to_string(),
            findings,
        }
    }
}

impl Default for Linter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::Reference;
    use crate::tracker::FieldValue;

    fn v(raw: &str) -> Version {
        parse_target(raw).unwrap()
    }

    #[test]
    fn test_parse_target_pads() {
        assert_eq!(v("3"), Version::new(3, 0, 0));
        assert_eq!(v("2.1"), Version::new(2, 1, 0));
        assert_eq!(v("2.1.1"), Version::new(2, 1, 1));
    }

    #[test]
    fn test_within_deprecated_for_v3() {
        let mut manifest = Entity::new("Manifest", "m");
        manifest.add_within(Reference::new("https://example.org/c"));

        let report = Linter::new().lint(&manifest, &v("3.0"));
        let finding = report
            .findings
            .iter()
            .find(|f| f.rule == "deprecated_field")
            .unwrap();
        assert_eq!(finding.field.as_deref(), Some("within"));
        assert_eq!(finding.remediation, vec!["Use `partOf` instead"]);

        assert!(Linter::new().lint(&manifest, &v("2.1")).is_clean());
    }

    #[test]
    fn test_behavior_unavailable_in_v2() {
        let mut manifest = Entity::new("Manifest", "m");
        manifest.node_mut().behavior.push("paged".into());
        let report = Linter::new().lint(&manifest, &v("2.1"));
        assert!(report.has_errors());
    }

    #[test]
    fn test_kind_lifecycle_walks_children() {
        let mut manifest = Entity::new("Manifest", "m");
        manifest
            .push_entity("sequences", Entity::anonymous("Sequence"))
            .unwrap();
        let report = Linter::new().lint(&manifest, &v("3.0"));
        assert!(report
            .findings
            .iter()
            .any(|f| f.rule == "kind_lifecycle" && f.kind == "Sequence"));
    }

    #[test]
    fn test_alias_use_is_linted() {
        let mut range = Entity::new("Range", "r");
        range.set_alias("Structure");

        let report = Linter::new().lint(&range, &v("2.1"));
        let finding = report
            .findings
            .iter()
            .find(|f| f.rule == "kind_lifecycle")
            .unwrap();
        assert_eq!(finding.kind, "Range");
        assert!(finding.message.starts_with("Structure"));
        assert_eq!(finding.remediation, vec!["Use Range instead"]);

        assert!(Linter::new().lint(&Entity::new("Range", "r"), &v("2.1")).is_clean());
    }

    #[test]
    fn test_layer_deprecated_for_v3() {
        let layer = Entity::new("Layer", "l");
        assert!(Linter::new().lint(&layer, &v("2.1")).is_clean());

        let report = Linter::new().lint(&layer, &v("3.0"));
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, LintSeverity::Warning);
        assert_eq!(report.findings[0].remediation, vec!["Use AnnotationCollection instead"]);
    }

    #[test]
    fn test_overflow_reported_as_info() {
        let mut canvas = Entity::new("Canvas", "c");
        canvas.set_additional("x-vendor", serde_json::json!(true));
        let report = Linter::new().lint(&canvas, &v("3.0"));
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, LintSeverity::Info);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_field_entries_use_slot_names() {
        let mut manifest = Entity::new("Manifest", "m");
        manifest.set_field("sequences", FieldValue::Entities(vec![]));
        let names: Vec<_> = field_entries(&manifest).map(|(n, _)| n).collect();
        assert_eq!(names, vec!["sequences"]);
    }
}
