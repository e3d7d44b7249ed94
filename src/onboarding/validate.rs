//! Record validator: applies step schemas to candidate sections.
//!
//! Validation is pure: no I/O, no logging. Failures are data
//! (`FieldErrors`), keyed by field path, never `std::error::Error` values.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::model::{CompleteRecord, PartialRecord, Section};
use super::schema::{FieldRule, Rule, StepDefinition, StepKind, StepRegistry};

const REQUIRED_MESSAGE: &str = "Required";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email regex compiles")
});

/// Local part may not start with a dot or contain `..`. Those two checks
/// live outside the pattern because `regex` has no look-ahead.
fn is_email(s: &str) -> bool {
    !s.starts_with('.') && !s.contains("..") && EMAIL_RE.is_match(s)
}

/// Human-readable messages keyed by field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Record an error. The first message for a path wins.
    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other`, qualifying each path with `prefix.`.
    fn extend_prefixed(&mut self, prefix: &str, other: FieldErrors) {
        for (path, message) in other.0 {
            self.insert(format!("{prefix}.{path}"), message);
        }
    }
}

/// Validate one step's section against that step's schema.
///
/// Errors are keyed by field name relative to the section (`name`, `email`).
pub fn validate_step(step: &StepDefinition, candidate: &Value) -> Result<Section, FieldErrors> {
    let mut errors = FieldErrors::default();

    let Some(fields) = candidate.as_object() else {
        errors.insert(step.kind.section_key(), type_message("object", candidate));
        return Err(errors);
    };

    for field_rule in &step.schema {
        check_field(field_rule, fields.get(field_rule.field), &mut errors);
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    into_section(step.kind, candidate).map_err(|e| {
        let mut errors = FieldErrors::default();
        errors.insert(step.kind.section_key(), e.to_string());
        errors
    })
}

/// Validate a whole record against every step's schema.
///
/// Absent sections fail as `Required` under the section key; invalid
/// fields are keyed by full path (`personalInfo.email`).
pub fn validate_complete(
    registry: &StepRegistry,
    record: &PartialRecord,
) -> Result<CompleteRecord, FieldErrors> {
    let mut errors = FieldErrors::default();
    let mut personal_info = None;
    let mut professional_info = None;
    let mut preferences = None;

    for step in registry.iter() {
        let key = step.kind.section_key();
        let Some(candidate) = record.section(step.kind) else {
            errors.insert(key, REQUIRED_MESSAGE);
            continue;
        };
        match validate_step(step, candidate) {
            Ok(Section::PersonalInfo(info)) => personal_info = Some(info),
            Ok(Section::ProfessionalInfo(info)) => professional_info = Some(info),
            Ok(Section::Preferences(prefs)) => preferences = Some(prefs),
            Err(section_errors) => {
                if let Some(message) = section_errors.get(key) {
                    // whole-section failure (e.g. not an object)
                    errors.insert(key, message);
                } else {
                    errors.extend_prefixed(key, section_errors);
                }
            }
        }
    }

    match (personal_info, professional_info, preferences) {
        (Some(personal_info), Some(professional_info), Some(preferences)) if errors.is_empty() => {
            Ok(CompleteRecord {
                personal_info,
                professional_info,
                preferences,
            })
        }
        _ => {
            if errors.is_empty() {
                // registry missing a section; StepRegistry::new rules this out
                errors.insert("", "Record is incomplete");
            }
            Err(errors)
        }
    }
}

fn check_field(field_rule: &FieldRule, value: Option<&Value>, errors: &mut FieldErrors) {
    let field = field_rule.field;
    // only a missing key is "Required"; null falls through to the type checks
    let Some(value) = value else {
        errors.insert(field, REQUIRED_MESSAGE);
        return;
    };

    match &field_rule.rule {
        Rule::MinLength { min, message } => match value.as_str() {
            // length in UTF-16 code units
            Some(s) if s.encode_utf16().count() >= *min => {}
            Some(_) => errors.insert(field, *message),
            None => errors.insert(field, type_message("string", value)),
        },
        Rule::Email { message } => match value.as_str() {
            Some(s) if is_email(s) => {}
            Some(_) => errors.insert(field, *message),
            None => errors.insert(field, type_message("string", value)),
        },
        Rule::OneOf { allowed } => match value.as_str() {
            Some(s) if allowed.iter().any(|option| *option == s) => {}
            _ => errors.insert(field, enum_message(allowed, value)),
        },
        Rule::NumberMin { min, message } => match value.as_f64() {
            Some(n) if n >= *min => {}
            Some(_) => errors.insert(field, *message),
            None => errors.insert(field, type_message("number", value)),
        },
        Rule::MinItems { min, message } => match value.as_array() {
            Some(items) => {
                let mut items_ok = true;
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        errors.insert(format!("{field}.{i}"), type_message("string", item));
                        items_ok = false;
                    }
                }
                if items_ok && items.len() < *min {
                    errors.insert(field, *message);
                }
            }
            None => errors.insert(field, type_message("array", value)),
        },
        Rule::Boolean => {
            if !value.is_boolean() {
                errors.insert(field, type_message("boolean", value));
            }
        }
    }
}

fn into_section(kind: StepKind, candidate: &Value) -> Result<Section, serde_json::Error> {
    let candidate = candidate.clone();
    Ok(match kind {
        StepKind::PersonalInfo => Section::PersonalInfo(serde_json::from_value(candidate)?),
        StepKind::ProfessionalInfo => Section::ProfessionalInfo(serde_json::from_value(candidate)?),
        StepKind::Preferences => Section::Preferences(serde_json::from_value(candidate)?),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_message(expected: &str, value: &Value) -> String {
    format!("Expected {expected}, received {}", json_type_name(value))
}

fn enum_message(allowed: &[&str], received: &Value) -> String {
    let options = allowed
        .iter()
        .map(|option| format!("'{option}'"))
        .collect::<Vec<_>>()
        .join(" | ");
    match received.as_str() {
        Some(s) => format!("Invalid enum value. Expected {options}, received '{s}'"),
        // non-strings are reported by type
        None => format!("Expected {options}, received {}", json_type_name(received)),
    }
}
