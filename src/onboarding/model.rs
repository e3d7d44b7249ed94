//! Onboarding record models: typed sections, the in-progress record and
//! the complete record handed to submission.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::schema::StepKind;

/// Roles offered on the professional info step.
pub const ROLE_OPTIONS: [&str; 4] = ["Developer", "Designer", "Manager", "Other"];

/// Interests offered on the preferences step.
pub const INTEREST_OPTIONS: [&str; 4] = [
    "Web Development",
    "Mobile Development",
    "UI/UX Design",
    "Data Science",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Developer,
    Designer,
    Manager,
    Other,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Developer => "Developer",
            Self::Designer => "Designer",
            Self::Manager => "Manager",
            Self::Other => "Other",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalInfo {
    pub role: Role,
    /// Years of experience.
    pub experience: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub interests: Vec<String>,
    pub newsletter: bool,
}

/// A validated slice of the record, tagged by the step that owns it.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    PersonalInfo(PersonalInfo),
    ProfessionalInfo(ProfessionalInfo),
    Preferences(Preferences),
}

impl Section {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::PersonalInfo(_) => StepKind::PersonalInfo,
            Self::ProfessionalInfo(_) => StepKind::ProfessionalInfo,
            Self::Preferences(_) => StepKind::Preferences,
        }
    }

    /// JSON form stored in the partial record.
    pub fn to_value(&self) -> Value {
        match self {
            Self::PersonalInfo(info) => json!({
                "name": info.name,
                "email": info.email,
            }),
            Self::ProfessionalInfo(info) => json!({
                "role": info.role,
                "experience": info.experience,
            }),
            Self::Preferences(prefs) => json!({
                "interests": prefs.interests,
                "newsletter": prefs.newsletter,
            }),
        }
    }
}

/// In-progress record: one optional, possibly invalid, section per step.
///
/// Persisted as `{"personalInfo": {...}, "professionalInfo": {...}, "preferences": {...}}`
/// with absent sections omitted. Unknown top-level keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartialRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Value>,
}

impl PartialRecord {
    pub fn section(&self, kind: StepKind) -> Option<&Value> {
        match kind {
            StepKind::PersonalInfo => self.personal_info.as_ref(),
            StepKind::ProfessionalInfo => self.professional_info.as_ref(),
            StepKind::Preferences => self.preferences.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: StepKind) -> &mut Option<Value> {
        match kind {
            StepKind::PersonalInfo => &mut self.personal_info,
            StepKind::ProfessionalInfo => &mut self.professional_info,
            StepKind::Preferences => &mut self.preferences,
        }
    }

    /// Replace a section wholesale. No deep merge with the previous value.
    pub fn set_section(&mut self, kind: StepKind, value: Value) {
        *self.slot_mut(kind) = Some(value);
    }

    pub fn merge_section(&mut self, section: &Section) {
        self.set_section(section.kind(), section.to_value());
    }

    /// Section-level overlay: every section present in `other` wins.
    pub fn overlay(&mut self, other: PartialRecord) {
        for kind in StepKind::ALL {
            if let Some(value) = other.section(kind) {
                self.set_section(kind, value.clone());
            }
        }
    }

    pub fn present_kinds(&self) -> impl Iterator<Item = StepKind> + '_ {
        StepKind::ALL
            .into_iter()
            .filter(|kind| self.section(*kind).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.present_kinds().next().is_none()
    }
}

/// Every section present and individually valid. Only produced by
/// `validate_complete`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRecord {
    pub personal_info: PersonalInfo,
    pub professional_info: ProfessionalInfo,
    pub preferences: Preferences,
}

impl CompleteRecord {
    pub fn to_partial(&self) -> PartialRecord {
        let mut record = PartialRecord::default();
        for section in [
            Section::PersonalInfo(self.personal_info.clone()),
            Section::ProfessionalInfo(self.professional_info.clone()),
            Section::Preferences(self.preferences.clone()),
        ] {
            record.merge_section(&section);
        }
        record
    }
}

/// Pre-filled values from the authenticated profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedData {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl SeedData {
    /// Starting record for a fresh session. Only known fields are set.
    pub fn into_partial(self) -> PartialRecord {
        let mut personal = serde_json::Map::new();
        if let Some(name) = self.name {
            personal.insert("name".to_string(), Value::String(name));
        }
        if let Some(email) = self.email {
            personal.insert("email".to_string(), Value::String(email));
        }

        let mut record = PartialRecord::default();
        if !personal.is_empty() {
            record.set_section(StepKind::PersonalInfo, Value::Object(personal));
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_record_uses_camel_case_and_omits_absent() {
        let mut record = PartialRecord::default();
        record.set_section(
            StepKind::PersonalInfo,
            json!({"name": "Al", "email": "a@b.com"}),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"personalInfo": {"name": "Al", "email": "a@b.com"}}));
    }

    #[test]
    fn partial_record_rejects_unknown_sections() {
        let parsed = serde_json::from_str::<PartialRecord>(r#"{"billing": {}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn set_section_replaces_instead_of_merging() {
        let mut record = PartialRecord::default();
        record.set_section(
            StepKind::PersonalInfo,
            json!({"name": "Alice", "email": "alice@example.com"}),
        );
        record.set_section(StepKind::PersonalInfo, json!({"name": "Bob"}));
        assert_eq!(record.personal_info, Some(json!({"name": "Bob"})));
    }

    #[test]
    fn overlay_prefers_other_per_section() {
        let mut base = SeedData {
            name: Some("Seed".into()),
            email: Some("seed@example.com".into()),
        }
        .into_partial();
        let mut restored = PartialRecord::default();
        restored.set_section(StepKind::ProfessionalInfo, json!({"role": "Designer"}));
        base.overlay(restored);

        assert_eq!(base.personal_info.as_ref().unwrap()["name"], "Seed");
        assert_eq!(base.professional_info, Some(json!({"role": "Designer"})));
        let kinds: Vec<StepKind> = base.present_kinds().collect();
        assert_eq!(kinds, [StepKind::PersonalInfo, StepKind::ProfessionalInfo]);
    }

    #[test]
    fn empty_seed_yields_empty_record() {
        assert!(SeedData::default().into_partial().is_empty());
    }

    #[test]
    fn complete_record_serializes_like_partial() {
        let complete = CompleteRecord {
            personal_info: PersonalInfo {
                name: "Al".into(),
                email: "a@b.com".into(),
            },
            professional_info: ProfessionalInfo {
                role: Role::Manager,
                experience: 4.0,
            },
            preferences: Preferences {
                interests: vec!["Data Science".into()],
                newsletter: false,
            },
        };
        assert_eq!(
            serde_json::to_value(&complete).unwrap(),
            serde_json::to_value(complete.to_partial()).unwrap()
        );
    }
}
