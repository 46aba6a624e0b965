//! Story document validation, import and export.
//!
//! Validation works on the raw JSON so that every violation of a document is
//! reported at once, with a JSON pointer to the offending value.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ImportError;
use crate::story::Story;

/// One violated constraint of a story document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// JSON pointer to the offending value
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// JSON shape a typed field accepts
#[derive(Clone, Copy)]
enum Shape {
    /// String, may be absent
    Text,
    /// String, must be present
    RequiredText,
    /// String or null, may be absent
    OptionalText,
    /// Array of strings, may be absent
    TextList,
    /// Object, may be absent
    Object,
    /// Object, must be present
    RequiredObject,
}

type Fields = &'static [(&'static str, Shape)];

const STORY_METADATA_FIELDS: Fields = &[
    ("title", Shape::Text),
    ("subtitle", Shape::OptionalText),
    ("authors", Shape::TextList),
    ("abstract", Shape::OptionalText),
];

const STORY_SETTINGS_FIELDS: Fields = &[
    ("template", Shape::Text),
    ("css", Shape::Text),
    ("stylesVariables", Shape::Object),
    ("options", Shape::Object),
    ("citationStyle", Shape::OptionalText),
    ("citationLocale", Shape::OptionalText),
];

const SECTION_FIELDS: Fields = &[("metadata", Shape::Object)];

const SECTION_METADATA_FIELDS: Fields = &[("title", Shape::Text)];

const RESOURCE_FIELDS: Fields = &[("metadata", Shape::RequiredObject)];

const RESOURCE_METADATA_FIELDS: Fields = &[
    ("type", Shape::RequiredText),
    ("title", Shape::Text),
    ("description", Shape::OptionalText),
    ("source", Shape::OptionalText),
];

const CONTEXTUALIZER_FIELDS: Fields = &[("type", Shape::RequiredText)];

const CONTEXTUALIZATION_FIELDS: Fields = &[("sectionId", Shape::OptionalText)];

const ENTITY_MAPS: [&str; 4] = [
    "sections",
    "resources",
    "contextualizers",
    "contextualizations",
];

/// Check a JSON story document against the story schema
pub fn validate_story(document: &Value) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();

    let Some(root) = document.as_object() else {
        violations.push(SchemaViolation::new("", "story must be an object"));
        return violations;
    };

    match root.get("id") {
        Some(Value::String(_)) => {}
        Some(_) => violations.push(SchemaViolation::new("/id", "must be a string")),
        None => violations.push(SchemaViolation::new("/id", "is required")),
    }

    for key in ["metadata", "settings"] {
        expect_object(root, key, &mut violations);
    }

    for key in ENTITY_MAPS {
        if let Some(entries) = expect_object(root, key, &mut violations) {
            check_entry_ids(key, entries, &mut violations);
        }
    }

    if let Some(metadata) = root.get("metadata").and_then(Value::as_object) {
        check_fields(metadata, "/metadata", STORY_METADATA_FIELDS, &mut violations);
    }
    if let Some(settings) = root.get("settings").and_then(Value::as_object) {
        check_fields(settings, "/settings", STORY_SETTINGS_FIELDS, &mut violations);
    }

    check_sections_order(root, &mut violations);
    check_references(root, &mut violations);

    violations
}

fn expect_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
    violations: &mut Vec<SchemaViolation>,
) -> Option<&'a Map<String, Value>> {
    match root.get(key) {
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            violations.push(SchemaViolation::new(format!("/{}", key), "must be an object"));
            None
        }
        None => {
            violations.push(SchemaViolation::new(format!("/{}", key), "is required"));
            None
        }
    }
}

fn check_entry_ids(collection: &str, entries: &Map<String, Value>, violations: &mut Vec<SchemaViolation>) {
    for (key, entry) in entries {
        let path = format!("/{}/{}", collection, key);
        let Some(record) = entry.as_object() else {
            violations.push(SchemaViolation::new(path, "must be an object"));
            continue;
        };
        check_entry_shape(collection, &path, record, violations);

        match record.get("id") {
            Some(Value::String(id)) if id == key => {}
            Some(Value::String(id)) => violations.push(SchemaViolation::new(
                format!("{}/id", path),
                format!("id '{}' does not match key '{}'", id, key),
            )),
            Some(_) => violations.push(SchemaViolation::new(format!("{}/id", path), "must be a string")),
            None => violations.push(SchemaViolation::new(format!("{}/id", path), "is required")),
        }
    }
}

fn check_fields(
    record: &Map<String, Value>,
    path: &str,
    fields: Fields,
    violations: &mut Vec<SchemaViolation>,
) {
    for (field, shape) in fields {
        let field_path = format!("{}/{}", path, field);
        let value = record.get(*field);

        let problem = match (shape, value) {
            (Shape::RequiredText | Shape::RequiredObject, None) => Some("is required"),
            (_, None) => None,
            (Shape::OptionalText, Some(Value::Null)) => None,
            (Shape::Text | Shape::RequiredText | Shape::OptionalText, Some(value)) => {
                (!value.is_string()).then_some("must be a string")
            }
            (Shape::TextList, Some(Value::Array(items))) => items
                .iter()
                .any(|item| !item.is_string())
                .then_some("must be an array of strings"),
            (Shape::TextList, Some(_)) => Some("must be an array of strings"),
            (Shape::Object | Shape::RequiredObject, Some(value)) => {
                (!value.is_object()).then_some("must be an object")
            }
        };

        if let Some(message) = problem {
            violations.push(SchemaViolation::new(field_path, message));
        }
    }
}

fn check_entry_shape(
    collection: &str,
    path: &str,
    record: &Map<String, Value>,
    violations: &mut Vec<SchemaViolation>,
) {
    let (fields, metadata_fields) = match collection {
        "sections" => (SECTION_FIELDS, Some(SECTION_METADATA_FIELDS)),
        "resources" => (RESOURCE_FIELDS, Some(RESOURCE_METADATA_FIELDS)),
        "contextualizers" => (CONTEXTUALIZER_FIELDS, None),
        "contextualizations" => (CONTEXTUALIZATION_FIELDS, None),
        _ => return,
    };

    check_fields(record, path, fields, violations);

    if let (Some(metadata_fields), Some(metadata)) =
        (metadata_fields, record.get("metadata").and_then(Value::as_object))
    {
        check_fields(metadata, &format!("{}/metadata", path), metadata_fields, violations);
    }
}

fn check_sections_order(root: &Map<String, Value>, violations: &mut Vec<SchemaViolation>) {
    let order = match root.get("sectionsOrder") {
        Some(Value::Array(order)) => order,
        Some(_) => {
            violations.push(SchemaViolation::new("/sectionsOrder", "must be an array"));
            return;
        }
        None => {
            violations.push(SchemaViolation::new("/sectionsOrder", "is required"));
            return;
        }
    };

    let sections = root.get("sections").and_then(Value::as_object);
    let mut seen = BTreeSet::new();

    for (index, entry) in order.iter().enumerate() {
        let path = format!("/sectionsOrder/{}", index);
        let Some(id) = entry.as_str() else {
            violations.push(SchemaViolation::new(path, "must be a string"));
            continue;
        };

        if !seen.insert(id) {
            violations.push(SchemaViolation::new(path, format!("duplicate section id '{}'", id)));
        } else if let Some(sections) = sections {
            if !sections.contains_key(id) {
                violations.push(SchemaViolation::new(path, format!("unknown section '{}'", id)));
            }
        }
    }

    if let Some(sections) = sections {
        for id in sections.keys() {
            if !seen.contains(id.as_str()) {
                violations.push(SchemaViolation::new(
                    "/sectionsOrder",
                    format!("section '{}' is missing from the order", id),
                ));
            }
        }
    }
}

fn check_references(root: &Map<String, Value>, violations: &mut Vec<SchemaViolation>) {
    let Some(contextualizations) = root.get("contextualizations").and_then(Value::as_object) else {
        return;
    };
    let resources = root.get("resources").and_then(Value::as_object);
    let contextualizers = root.get("contextualizers").and_then(Value::as_object);

    for (key, contextualization) in contextualizations {
        for (field, targets) in [("resourceId", resources), ("contextualizerId", contextualizers)] {
            let path = format!("/contextualizations/{}/{}", key, field);
            match contextualization.get(field) {
                Some(Value::String(target)) => {
                    if let Some(targets) = targets {
                        if !targets.contains_key(target) {
                            violations.push(SchemaViolation::new(
                                path,
                                format!("references missing entity '{}'", target),
                            ));
                        }
                    }
                }
                Some(_) => violations.push(SchemaViolation::new(path, "must be a string")),
                None => violations.push(SchemaViolation::new(path, "is required")),
            }
        }
    }
}

/// Parse and validate a serialized story.
///
/// Any violation aborts the import; no partial story is produced.
pub fn import_story(source: &str) -> Result<Story, ImportError> {
    let document: Value = serde_json::from_str(source)?;

    check_story(document).map_err(|violations| {
        tracing::warn!(count = violations.len(), "Story import rejected");
        ImportError::Validation(violations)
    })
}

/// Validate a JSON story document and build the typed story from it.
///
/// A document the typed model still refuses after validation is reported as
/// one violation at the document root.
pub fn check_story(document: Value) -> Result<Story, Vec<SchemaViolation>> {
    let violations = validate_story(&document);
    if !violations.is_empty() {
        return Err(violations);
    }

    serde_json::from_value(document).map_err(|e| vec![SchemaViolation::new("", e.to_string())])
}

/// Serialize a story as pretty-printed JSON
pub fn export_story(story: &Story) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(story)
}
