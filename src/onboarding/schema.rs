//! Step schema registry: the ordered steps of the wizard and the
//! declarative rules each step's section must satisfy.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WizardError;

use super::model::{INTEREST_OPTIONS, ROLE_OPTIONS};

/// Identity of a step. One variant per record section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    PersonalInfo,
    ProfessionalInfo,
    Preferences,
}

impl StepKind {
    pub const ALL: [StepKind; 3] = [
        StepKind::PersonalInfo,
        StepKind::ProfessionalInfo,
        StepKind::Preferences,
    ];

    /// Top-level record key owned by this step.
    pub fn section_key(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "personalInfo",
            Self::ProfessionalInfo => "professionalInfo",
            Self::Preferences => "preferences",
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "Personal Info",
            Self::ProfessionalInfo => "Professional Info",
            Self::Preferences => "Preferences",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.section_key())
    }
}

/// A single declarative check on one field of a section.
///
/// Every rule also implies the JSON type it expects; a value of the wrong
/// type fails with a type message before the rule itself is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// String with at least `min` characters.
    MinLength { min: usize, message: &'static str },
    /// String that looks like an email address.
    Email { message: &'static str },
    /// String equal to one of `allowed`.
    OneOf { allowed: &'static [&'static str] },
    /// Number greater than or equal to `min`.
    NumberMin { min: f64, message: &'static str },
    /// List of strings with at least `min` entries.
    MinItems { min: usize, message: &'static str },
    /// Any boolean.
    Boolean,
}

/// Rule attached to a field of the step's section.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: &'static str,
    pub rule: Rule,
}

impl FieldRule {
    pub const fn new(field: &'static str, rule: Rule) -> Self {
        Self { field, rule }
    }
}

const PERSONAL_INFO_RULES: &[FieldRule] = &[
    FieldRule::new(
        "name",
        Rule::MinLength {
            min: 2,
            message: "Name must be at least 2 characters",
        },
    ),
    FieldRule::new(
        "email",
        Rule::Email {
            message: "Invalid email address",
        },
    ),
];

const PROFESSIONAL_INFO_RULES: &[FieldRule] = &[
    FieldRule::new(
        "role",
        Rule::OneOf {
            allowed: &ROLE_OPTIONS,
        },
    ),
    FieldRule::new(
        "experience",
        Rule::NumberMin {
            min: 0.0,
            message: "Experience must be a positive number",
        },
    ),
];

const PREFERENCES_RULES: &[FieldRule] = &[
    FieldRule::new(
        "interests",
        Rule::MinItems {
            min: 1,
            message: "Select at least one interest",
        },
    ),
    FieldRule::new("newsletter", Rule::Boolean),
];

/// One page of the wizard.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    /// Ordinal position in the wizard.
    pub id: usize,
    pub kind: StepKind,
    pub label: String,
    pub schema: Vec<FieldRule>,
}

impl StepDefinition {
    /// Build a step with the built-in rules for `kind`.
    pub fn standard(id: usize, kind: StepKind) -> Self {
        let schema = match kind {
            StepKind::PersonalInfo => PERSONAL_INFO_RULES,
            StepKind::ProfessionalInfo => PROFESSIONAL_INFO_RULES,
            StepKind::Preferences => PREFERENCES_RULES,
        };
        Self {
            id,
            kind,
            label: kind.default_label().to_string(),
            schema: schema.to_vec(),
        }
    }

    /// The schema's fields of `candidate`, as entered. Unknown keys are
    /// dropped; non-objects yield an empty object.
    pub fn project(&self, candidate: &Value) -> Value {
        let mut kept = serde_json::Map::new();
        if let Some(fields) = candidate.as_object() {
            for rule in &self.schema {
                if let Some(value) = fields.get(rule.field) {
                    kept.insert(rule.field.to_string(), value.clone());
                }
            }
        }
        Value::Object(kept)
    }

    /// Full record paths of the fields this step owns, e.g. `personalInfo.name`.
    pub fn field_paths(&self) -> Vec<String> {
        self.schema
            .iter()
            .map(|rule| format!("{}.{}", self.kind.section_key(), rule.field))
            .collect()
    }
}

/// Read-only, ordered set of steps.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<StepDefinition>,
}

impl StepRegistry {
    /// Validate and freeze a step list.
    ///
    /// Every `StepKind` must appear exactly once and ids must match positions.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::EmptyRegistry);
        }

        let mut kinds = HashSet::new();
        for (position, step) in steps.iter().enumerate() {
            if step.id != position {
                return Err(WizardError::MalformedRegistry(format!(
                    "step `{}` has id {} but sits at position {}",
                    step.kind, step.id, position
                )));
            }
            if !kinds.insert(step.kind) {
                return Err(WizardError::MalformedRegistry(format!(
                    "step `{}` is declared twice",
                    step.kind
                )));
            }
            let mut fields = HashSet::new();
            for rule in &step.schema {
                if !fields.insert(rule.field) {
                    return Err(WizardError::MalformedRegistry(format!(
                        "field `{}` has more than one rule in step `{}`",
                        rule.field, step.kind
                    )));
                }
            }
        }
        if let Some(missing) = StepKind::ALL.iter().find(|kind| !kinds.contains(kind)) {
            return Err(WizardError::MalformedRegistry(format!(
                "no step declared for section `{missing}`"
            )));
        }

        Ok(Self { steps })
    }

    /// The onboarding wizard: personal info, professional info, preferences.
    pub fn onboarding() -> Self {
        Self {
            steps: StepKind::ALL
                .iter()
                .enumerate()
                .map(|(id, kind)| StepDefinition::standard(id, *kind))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// Look up a step. Out-of-range indices are a programming fault.
    pub fn step(&self, index: usize) -> Result<&StepDefinition, WizardError> {
        self.steps.get(index).ok_or(WizardError::StepOutOfRange {
            index,
            count: self.steps.len(),
        })
    }

    pub fn index_of(&self, kind: StepKind) -> Option<usize> {
        self.steps.iter().position(|step| step.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.iter()
    }
}

/// Options offered for list-valued fields, used by the form renderer.
pub fn field_options(kind: StepKind, field: &str) -> &'static [&'static str] {
    match (kind, field) {
        (StepKind::ProfessionalInfo, "role") => &ROLE_OPTIONS,
        (StepKind::Preferences, "interests") => &INTEREST_OPTIONS,
        _ => &[],
    }
}
