//! One user's pass through the wizard: navigator, submission coordinator
//! and the up-front "already onboarded" check.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{Error, SubmissionError, WizardError};

use super::navigator::{CommitOutcome, StepNavigator};
use super::platform::{PlatformApi, onboarding_status};
use super::render::StepView;
use super::submission::{CompletionView, SubmissionCoordinator, SubmissionState, SubmissionTicket};
use super::validate::FieldErrors;

/// What a commit did, as reported to the surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommitReport {
    Rejected {
        errors: FieldErrors,
    },
    Advanced {
        step_index: usize,
    },
    /// The record was accepted by the platform.
    Submitted,
    CompletionBlocked {
        message: String,
        errors: FieldErrors,
    },
}

/// First half of a commit. `Submit` carries a remote call still to be made.
pub enum CommitStart {
    Done(CommitReport),
    Submit(SubmissionTicket),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub onboarding_complete: bool,
    pub message: Option<String>,
    pub current_step_index: usize,
    pub step_count: usize,
    pub progress: f64,
    pub submission: SubmissionState,
    pub view: CompletionView,
}

pub struct OnboardingSession {
    user_name: Option<String>,
    navigator: StepNavigator,
    coordinator: SubmissionCoordinator,
    /// The platform reported onboarding as already done; the wizard is skipped.
    already_complete: bool,
}

impl OnboardingSession {
    pub fn new(
        user_name: Option<String>,
        navigator: StepNavigator,
        coordinator: SubmissionCoordinator,
        already_complete: bool,
    ) -> Self {
        Self {
            user_name,
            navigator,
            coordinator,
            already_complete,
        }
    }

    /// Build a session, consulting the platform once for completion status.
    pub async fn start(
        api: &dyn PlatformApi,
        user_id: &str,
        user_name: Option<String>,
        navigator: StepNavigator,
        coordinator: SubmissionCoordinator,
    ) -> Self {
        let already_complete = onboarding_status(api, user_id).await;
        if already_complete {
            info!(user_id, "Onboarding already complete; wizard bypassed");
        }
        Self::new(user_name, navigator, coordinator, already_complete)
    }

    pub fn is_bypassed(&self) -> bool {
        self.already_complete
    }

    pub fn navigator(&self) -> &StepNavigator {
        &self.navigator
    }

    pub fn coordinator(&self) -> &SubmissionCoordinator {
        &self.coordinator
    }

    /// Whether onboarding is done, either from a prior session or this one.
    pub fn is_complete(&self) -> bool {
        self.already_complete || *self.coordinator.state() == SubmissionState::Succeeded
    }

    pub fn status(&self) -> SessionStatus {
        let message = if self.already_complete {
            Some(format!(
                "Welcome back, {}! Your onboarding is complete.",
                self.user_name.as_deref().unwrap_or("there")
            ))
        } else {
            match self.coordinator.state() {
                SubmissionState::Failed(message) => Some(message.clone()),
                SubmissionState::Succeeded => Some("Your onboarding is complete.".to_string()),
                SubmissionState::Idle | SubmissionState::InFlight => None,
            }
        };

        SessionStatus {
            onboarding_complete: self.is_complete(),
            message,
            current_step_index: self.navigator.current_index(),
            step_count: self.navigator.registry().len(),
            progress: self.navigator.progress(),
            submission: self.coordinator.state().clone(),
            view: self.coordinator.view(),
        }
    }

    /// Descriptor for the step the user is on.
    pub fn step_view(&self) -> Result<StepView, Error> {
        if self.is_complete() {
            return Err(WizardError::AlreadyComplete.into());
        }
        let step = self.navigator.current_step()?;
        Ok(StepView::new(
            step,
            self.navigator.registry().len(),
            self.navigator.current_section(),
        ))
    }

    pub fn take_storage_warning(&mut self) -> Option<String> {
        self.navigator.take_storage_warning()
    }

    /// Commit the current step and, on the final step, submit the record.
    pub async fn commit_step(&mut self, input: &Value) -> Result<CommitReport, Error> {
        match self.begin_commit(input)? {
            CommitStart::Done(report) => Ok(report),
            CommitStart::Submit(ticket) => {
                let result = ticket.run().await;
                self.finish_submission(ticket, result)
            }
        }
    }

    /// Synchronous part of a commit. A returned ticket must be run and then
    /// passed to `finish_submission`.
    pub fn begin_commit(&mut self, input: &Value) -> Result<CommitStart, Error> {
        self.ensure_editable()?;

        let outcome = self.navigator.commit(input)?;
        if !matches!(outcome, CommitOutcome::Rejected(_)) {
            // the draft moved on; a failed attempt's record is stale now
            self.coordinator.discard_pending();
        }

        let start = match outcome {
            CommitOutcome::Rejected(errors) => CommitStart::Done(CommitReport::Rejected { errors }),
            CommitOutcome::Advanced { index } => {
                CommitStart::Done(CommitReport::Advanced { step_index: index })
            }
            CommitOutcome::CompletionBlocked { message, errors } => {
                CommitStart::Done(CommitReport::CompletionBlocked { message, errors })
            }
            CommitOutcome::Completed(record) => CommitStart::Submit(self.coordinator.begin(record)?),
        };
        Ok(start)
    }

    pub fn finish_submission(
        &mut self,
        ticket: SubmissionTicket,
        result: Result<(), SubmissionError>,
    ) -> Result<CommitReport, Error> {
        self.coordinator.finish(ticket, result)?;
        Ok(CommitReport::Submitted)
    }

    /// Go back one step. Returns the new index.
    pub fn retreat(&mut self) -> Result<usize, Error> {
        self.ensure_editable()?;
        Ok(self.navigator.retreat())
    }

    /// Re-send the record from the last failed submission.
    pub async fn retry(&mut self) -> Result<CommitReport, Error> {
        let ticket = self.begin_retry()?;
        let result = ticket.run().await;
        self.finish_submission(ticket, result)
    }

    pub fn begin_retry(&mut self) -> Result<SubmissionTicket, Error> {
        if self.already_complete {
            return Err(WizardError::AlreadyComplete.into());
        }
        Ok(self.coordinator.begin_retry()?)
    }

    /// The form is frozen once complete and while a submission runs.
    fn ensure_editable(&self) -> Result<(), Error> {
        if self.already_complete {
            return Err(WizardError::AlreadyComplete.into());
        }
        self.coordinator.state().can_start()?;
        Ok(())
    }
}
