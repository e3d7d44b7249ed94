//! Step navigator: the wizard state machine.
//!
//! Holds the current step index and the accumulated partial record.
//! Commits run per-step validation, merge the section, persist the draft
//! and advance; the final commit re-validates the whole record and yields
//! a `CompleteRecord` for submission. Retreat never validates or persists.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::WizardError;

use super::model::{CompleteRecord, PartialRecord};
use super::schema::{StepDefinition, StepRegistry};
use super::storage::DraftStore;
use super::telemetry::{Direction, TelemetryEvent, TelemetrySink, report};
use super::validate::{FieldErrors, validate_complete, validate_step};

/// Shown when the final whole-record check fails.
pub const COMPLETION_BLOCKED_MESSAGE: &str =
    "Some of your answers could not be verified. Please review the previous steps and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub current_step_index: usize,
    /// Direction of the last transition; `None` until the first move.
    pub last_direction: Option<Direction>,
}

/// Result of committing the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Input failed validation; nothing changed.
    Rejected(FieldErrors),
    /// Section committed, moved to `index`.
    Advanced { index: usize },
    /// Final section committed and the whole record is valid.
    Completed(CompleteRecord),
    /// Final section committed but the whole record failed re-validation.
    CompletionBlocked { message: String, errors: FieldErrors },
}

pub struct StepNavigator {
    registry: Arc<StepRegistry>,
    drafts: DraftStore,
    telemetry: Arc<dyn TelemetrySink>,
    record: PartialRecord,
    nav: NavigationState,
    /// Highest step whose section has been committed (or restored).
    highest_committed: Option<usize>,
    storage_warning: Option<String>,
}

impl StepNavigator {
    /// Start a session at step 0.
    ///
    /// `seed` is applied first; a saved draft, if any, overrides it section
    /// by section. Restored sections count as committed.
    pub fn new(
        registry: Arc<StepRegistry>,
        drafts: DraftStore,
        telemetry: Arc<dyn TelemetrySink>,
        seed: PartialRecord,
    ) -> Self {
        let mut record = seed;
        if let Some(saved) = drafts.load() {
            record.overlay(saved);
        }

        let highest_committed = record
            .present_kinds()
            .filter_map(|kind| registry.index_of(kind))
            .max();

        Self {
            registry,
            drafts,
            telemetry,
            record,
            nav: NavigationState {
                current_step_index: 0,
                last_direction: None,
            },
            highest_committed,
            storage_warning: None,
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn navigation(&self) -> NavigationState {
        self.nav
    }

    pub fn current_index(&self) -> usize {
        self.nav.current_step_index
    }

    pub fn current_step(&self) -> Result<&StepDefinition, WizardError> {
        self.registry.step(self.nav.current_step_index)
    }

    pub fn is_last_step(&self) -> bool {
        self.nav.current_step_index == self.registry.last_index()
    }

    /// Fraction of the wizard reached, counting the current step.
    pub fn progress(&self) -> f64 {
        (self.nav.current_step_index + 1) as f64 / self.registry.len() as f64
    }

    pub fn record(&self) -> &PartialRecord {
        &self.record
    }

    pub fn highest_committed(&self) -> Option<usize> {
        self.highest_committed
    }

    /// Section data to pre-fill the current step with.
    pub fn current_section(&self) -> Option<&Value> {
        let step = self.current_step().ok()?;
        self.record.section(step.kind)
    }

    /// Warning from the last draft write, if it failed. Cleared on read.
    pub fn take_storage_warning(&mut self) -> Option<String> {
        self.storage_warning.take()
    }

    /// Validate `input` for the current step and move forward on success.
    pub fn commit(&mut self, input: &Value) -> Result<CommitOutcome, WizardError> {
        let index = self.nav.current_step_index;
        let step = self.registry.step(index)?;

        if let Err(errors) = validate_step(step, input) {
            debug!(step = index, fields = errors.len(), "Step input rejected");
            return Ok(CommitOutcome::Rejected(errors));
        }

        // store what was entered, not the typed re-encoding (5 stays 5, not 5.0)
        self.record.set_section(step.kind, step.project(input));
        self.highest_committed = Some(self.highest_committed.map_or(index, |h| h.max(index)));
        self.persist();
        report(
            self.telemetry.as_ref(),
            TelemetryEvent::StepCompleted { step: index },
        );

        if index < self.registry.last_index() {
            let next = index + 1;
            self.nav = NavigationState {
                current_step_index: next,
                last_direction: Some(Direction::Forward),
            };
            report(
                self.telemetry.as_ref(),
                TelemetryEvent::StepNavigated {
                    from: index,
                    to: next,
                    direction: Direction::Forward,
                },
            );
            return Ok(CommitOutcome::Advanced { index: next });
        }

        match validate_complete(&self.registry, &self.record) {
            Ok(complete) => {
                report(self.telemetry.as_ref(), TelemetryEvent::FormCompleted);
                Ok(CommitOutcome::Completed(complete))
            }
            Err(errors) => {
                warn!(
                    fields = ?errors.paths().collect::<Vec<_>>(),
                    "Complete record failed validation after final step"
                );
                Ok(CommitOutcome::CompletionBlocked {
                    message: COMPLETION_BLOCKED_MESSAGE.to_string(),
                    errors,
                })
            }
        }
    }

    /// Go back one step, floored at 0. Returns the new index.
    pub fn retreat(&mut self) -> usize {
        let from = self.nav.current_step_index;
        if from == 0 {
            return 0;
        }
        let to = from - 1;
        self.nav = NavigationState {
            current_step_index: to,
            last_direction: Some(Direction::Backward),
        };
        report(
            self.telemetry.as_ref(),
            TelemetryEvent::StepNavigated {
                from,
                to,
                direction: Direction::Backward,
            },
        );
        to
    }

    fn persist(&mut self) {
        match self.drafts.save(&self.record) {
            Ok(()) => self.storage_warning = None,
            Err(e) => {
                warn!(error = %e, "Failed to save onboarding draft; continuing in memory");
                self.storage_warning =
                    Some("Your progress could not be saved on this device.".to_string());
            }
        }
    }
}
