//! Per-step form descriptors for whatever surface renders the wizard.

use serde::Serialize;
use serde_json::Value;

use super::schema::{StepDefinition, StepKind, field_options};

/// One form control, pre-filled from the saved section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    TextInput {
        field: String,
        label: &'static str,
        value: String,
    },
    EmailInput {
        field: String,
        label: &'static str,
        value: String,
    },
    RadioGroup {
        field: String,
        label: &'static str,
        options: Vec<&'static str>,
        selected: Option<String>,
    },
    NumberInput {
        field: String,
        label: &'static str,
        min: f64,
        value: Option<f64>,
    },
    CheckboxGroup {
        field: String,
        label: &'static str,
        options: Vec<&'static str>,
        checked: Vec<String>,
    },
    Checkbox {
        field: String,
        label: &'static str,
        checked: bool,
    },
}

/// Widgets for a step, pre-filled from `section` where it holds usable values.
pub fn step_view(kind: StepKind, section: Option<&Value>) -> Vec<Widget> {
    let path = |field: &str| format!("{}.{}", kind.section_key(), field);
    let text = |field: &str| {
        section
            .and_then(|s| s.get(field))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match kind {
        StepKind::PersonalInfo => vec![
            Widget::TextInput {
                field: path("name"),
                label: "Name",
                value: text("name"),
            },
            Widget::EmailInput {
                field: path("email"),
                label: "Email",
                value: text("email"),
            },
        ],
        StepKind::ProfessionalInfo => vec![
            Widget::RadioGroup {
                field: path("role"),
                label: "Role",
                options: field_options(kind, "role").to_vec(),
                selected: section
                    .and_then(|s| s.get("role"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            Widget::NumberInput {
                field: path("experience"),
                label: "Years of Experience",
                min: 0.0,
                value: section
                    .and_then(|s| s.get("experience"))
                    .and_then(Value::as_f64),
            },
        ],
        StepKind::Preferences => vec![
            Widget::CheckboxGroup {
                field: path("interests"),
                label: "Interests",
                options: field_options(kind, "interests").to_vec(),
                checked: section
                    .and_then(|s| s.get("interests"))
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            Widget::Checkbox {
                field: path("newsletter"),
                label: "Subscribe to newsletter",
                checked: section
                    .and_then(|s| s.get("newsletter"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
        ],
    }
}

/// Everything needed to draw the current page of the wizard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub index: usize,
    pub step_count: usize,
    pub label: String,
    pub kind: StepKind,
    pub progress: f64,
    pub widgets: Vec<Widget>,
    pub show_previous: bool,
    pub confirm_label: &'static str,
}

impl StepView {
    pub fn new(step: &StepDefinition, step_count: usize, section: Option<&Value>) -> Self {
        let index = step.id;
        let is_last = index + 1 == step_count;
        Self {
            index,
            step_count,
            label: step.label.clone(),
            kind: step.kind,
            progress: (index + 1) as f64 / step_count as f64,
            widgets: step_view(step.kind, section),
            show_previous: index > 0,
            confirm_label: if is_last { "Submit" } else { "Next" },
        }
    }
}
