//! Submission coordinator. Hands the complete record to the caller's
//! submitter and reconciles in-flight, success and failure states.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::WizardConfig;
use crate::error::SubmissionError;

use super::model::CompleteRecord;
use super::storage::DraftStore;

/// Performs the remote work for a completed record.
#[async_trait]
pub trait RecordSubmitter: Send + Sync {
    async fn submit(&self, record: &CompleteRecord) -> Result<(), SubmissionError>;
}

/// Lifecycle of submission attempts within one session.
///
/// Idle → InFlight → Succeeded | Failed; Failed → InFlight on retry.
/// Succeeded is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    InFlight,
    Succeeded,
    Failed(String),
}

impl SubmissionState {
    /// Whether a new attempt may start from this state.
    pub fn can_start(&self) -> Result<(), SubmissionError> {
        match self {
            Self::Idle | Self::Failed(_) => Ok(()),
            Self::InFlight => Err(SubmissionError::AlreadyInFlight),
            Self::Succeeded => Err(SubmissionError::AlreadySubmitted),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(_) => write!(f, "failed"),
        }
    }
}

/// What the user is looking at while a submission runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionView {
    /// The wizard form.
    Form,
    /// A spinner; used when optimistic completion is off.
    Saving,
    /// The onboarding-complete screen.
    Completed,
}

/// A view change applied before the remote result is known, with the
/// compensating action that undoes it.
#[derive(Debug, Clone, Copy)]
struct ViewTransition {
    previous: CompletionView,
}

impl ViewTransition {
    fn apply(view: &mut CompletionView, target: CompletionView) -> Self {
        let previous = *view;
        *view = target;
        Self { previous }
    }

    fn rollback(self, view: &mut CompletionView) {
        *view = self.previous;
    }
}

/// One submission attempt, started by `SubmissionCoordinator::begin`.
///
/// `run` performs the remote work without borrowing the coordinator, so a
/// caller can release its lock while the request is in flight. The outcome
/// goes back through `SubmissionCoordinator::finish`.
pub struct SubmissionTicket {
    submitter: Arc<dyn RecordSubmitter>,
    record: CompleteRecord,
    timeout: Option<Duration>,
    transition: ViewTransition,
    attempt: u32,
}

impl SubmissionTicket {
    pub fn record(&self) -> &CompleteRecord {
        &self.record
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub async fn run(&self) -> Result<(), SubmissionError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.submitter.submit(&self.record))
                .await
                .unwrap_or(Err(SubmissionError::Timeout(limit))),
            None => self.submitter.submit(&self.record).await,
        }
    }
}

pub struct SubmissionCoordinator {
    submitter: Arc<dyn RecordSubmitter>,
    drafts: DraftStore,
    config: WizardConfig,
    state: SubmissionState,
    view: CompletionView,
    /// Record of the last failed attempt, kept for retry.
    pending: Option<CompleteRecord>,
    attempts: u32,
}

impl SubmissionCoordinator {
    pub fn new(
        submitter: Arc<dyn RecordSubmitter>,
        drafts: DraftStore,
        config: WizardConfig,
    ) -> Self {
        Self {
            submitter,
            drafts,
            config,
            state: SubmissionState::Idle,
            view: CompletionView::Form,
            pending: None,
            attempts: 0,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn view(&self) -> CompletionView {
        self.view
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn pending(&self) -> Option<&CompleteRecord> {
        self.pending.as_ref()
    }

    /// Drop the record kept from a failed attempt, so `retry` cannot resend
    /// it. A failed state returns to Idle.
    pub fn discard_pending(&mut self) {
        if self.pending.take().is_some() {
            debug!(attempt = self.attempts, "Discarding record from failed submission");
        }
        if matches!(self.state, SubmissionState::Failed(_)) {
            self.state = SubmissionState::Idle;
        }
    }

    /// Submit a complete record and wait for the outcome.
    ///
    /// On success the saved draft is cleared. On failure the view is rolled
    /// back, the draft is left untouched and the record is kept for `retry`.
    pub async fn submit(&mut self, record: CompleteRecord) -> Result<(), SubmissionError> {
        let ticket = self.begin(record)?;
        let result = ticket.run().await;
        self.finish(ticket, result)
    }

    /// Re-submit the record from the last failed attempt.
    pub async fn retry(&mut self) -> Result<(), SubmissionError> {
        let ticket = self.begin_retry()?;
        let result = ticket.run().await;
        self.finish(ticket, result)
    }

    /// Move to InFlight and apply the pending view.
    pub fn begin(&mut self, record: CompleteRecord) -> Result<SubmissionTicket, SubmissionError> {
        self.state.can_start()?;

        self.state = SubmissionState::InFlight;
        self.attempts += 1;
        let target = if self.config.optimistic {
            CompletionView::Completed
        } else {
            CompletionView::Saving
        };
        let transition = ViewTransition::apply(&mut self.view, target);
        info!(
            attempt = self.attempts,
            optimistic = self.config.optimistic,
            "Submitting onboarding record"
        );

        Ok(SubmissionTicket {
            submitter: self.submitter.clone(),
            record,
            timeout: self.config.submit_timeout,
            transition,
            attempt: self.attempts,
        })
    }

    pub fn begin_retry(&mut self) -> Result<SubmissionTicket, SubmissionError> {
        self.state.can_start()?;
        let record = self.pending.clone().ok_or(SubmissionError::NothingToRetry)?;
        self.begin(record)
    }

    /// Reconcile the outcome of `ticket.run()`.
    pub fn finish(
        &mut self,
        ticket: SubmissionTicket,
        result: Result<(), SubmissionError>,
    ) -> Result<(), SubmissionError> {
        match result {
            Ok(()) => {
                self.state = SubmissionState::Succeeded;
                self.view = CompletionView::Completed;
                self.pending = None;
                if let Err(e) = self.drafts.clear() {
                    warn!(error = %e, "Failed to clear onboarding draft after submission");
                }
                info!(attempt = ticket.attempt, "Onboarding submission succeeded");
                Ok(())
            }
            Err(e) => {
                ticket.transition.rollback(&mut self.view);
                self.state = SubmissionState::Failed(e.user_message());
                self.pending = Some(ticket.record);
                warn!(attempt = ticket.attempt, error = %e, "Onboarding submission failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::PlatformError;
    use crate::onboarding::model::{PersonalInfo, Preferences, ProfessionalInfo, Role};
    use crate::onboarding::storage::MemoryKeyValueStore;

    /// Fails the first `failures` calls, then succeeds.
    struct FlakySubmitter {
        failures: Mutex<u32>,
        calls: Mutex<Vec<CompleteRecord>>,
    }

    impl FlakySubmitter {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RecordSubmitter for FlakySubmitter {
        async fn submit(&self, record: &CompleteRecord) -> Result<(), SubmissionError> {
            self.calls.lock().unwrap().push(record.clone());
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(SubmissionError::SaveFailed(PlatformError::Rejected {
                    endpoint: "/app/users/u1".into(),
                    status: 500,
                    message: "boom".into(),
                }));
            }
            Ok(())
        }
    }

    struct SlowSubmitter;

    #[async_trait]
    impl RecordSubmitter for SlowSubmitter {
        async fn submit(&self, _record: &CompleteRecord) -> Result<(), SubmissionError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn record() -> CompleteRecord {
        CompleteRecord {
            personal_info: PersonalInfo {
                name: "Al".into(),
                email: "a@b.com".into(),
            },
            professional_info: ProfessionalInfo {
                role: Role::Developer,
                experience: 2.0,
            },
            preferences: Preferences {
                interests: vec!["Web Development".into()],
                newsletter: true,
            },
        }
    }

    fn drafts_with_record() -> DraftStore {
        let drafts = DraftStore::new(Arc::new(MemoryKeyValueStore::new()));
        drafts.save(&record().to_partial()).unwrap();
        drafts
    }

    #[tokio::test]
    async fn success_clears_draft() {
        let drafts = drafts_with_record();
        let submitter = FlakySubmitter::new(0);
        let mut coordinator =
            SubmissionCoordinator::new(submitter.clone(), drafts.clone(), WizardConfig::default());

        coordinator.submit(record()).await.unwrap();
        assert_eq!(coordinator.state(), &SubmissionState::Succeeded);
        assert_eq!(coordinator.view(), CompletionView::Completed);
        assert!(drafts.load().is_none());
        assert_eq!(submitter.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failure_rolls_back_and_keeps_draft() {
        let drafts = drafts_with_record();
        let before = drafts.load();
        let mut coordinator = SubmissionCoordinator::new(
            FlakySubmitter::new(1),
            drafts.clone(),
            WizardConfig::default(),
        );

        let err = coordinator.submit(record()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::SaveFailed(_)));
        let SubmissionState::Failed(message) = coordinator.state() else {
            panic!("expected failed state");
        };
        assert!(!message.is_empty());
        assert_eq!(coordinator.view(), CompletionView::Form);
        assert_eq!(drafts.load(), before);
        assert_eq!(coordinator.pending(), Some(&record()));
    }

    #[tokio::test]
    async fn retry_after_failure_succeeds() {
        let drafts = drafts_with_record();
        let submitter = FlakySubmitter::new(1);
        let mut coordinator =
            SubmissionCoordinator::new(submitter.clone(), drafts.clone(), WizardConfig::default());

        assert!(coordinator.submit(record()).await.is_err());
        coordinator.retry().await.unwrap();
        assert_eq!(coordinator.state(), &SubmissionState::Succeeded);
        assert_eq!(coordinator.attempts(), 2);

        let calls = submitter.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
    }

    #[tokio::test]
    async fn succeeded_is_terminal() {
        let mut coordinator = SubmissionCoordinator::new(
            FlakySubmitter::new(0),
            drafts_with_record(),
            WizardConfig::default(),
        );
        coordinator.submit(record()).await.unwrap();

        assert!(matches!(
            coordinator.submit(record()).await,
            Err(SubmissionError::AlreadySubmitted)
        ));
        assert!(matches!(
            coordinator.retry().await,
            Err(SubmissionError::AlreadySubmitted)
        ));
        assert_eq!(coordinator.attempts(), 1);
    }

    #[tokio::test]
    async fn retry_without_failure_has_nothing_to_send() {
        let mut coordinator = SubmissionCoordinator::new(
            FlakySubmitter::new(0),
            drafts_with_record(),
            WizardConfig::default(),
        );
        assert!(matches!(
            coordinator.retry().await,
            Err(SubmissionError::NothingToRetry)
        ));
        assert_eq!(coordinator.state(), &SubmissionState::Idle);
    }

    #[tokio::test]
    async fn timeout_is_a_failure() {
        let drafts = drafts_with_record();
        let config = WizardConfig {
            submit_timeout: Some(Duration::from_millis(50)),
            optimistic: false,
        };
        let mut coordinator =
            SubmissionCoordinator::new(Arc::new(SlowSubmitter), drafts.clone(), config);

        let err = coordinator.submit(record()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Timeout(_)));
        assert_eq!(coordinator.view(), CompletionView::Form);
        assert!(drafts.load().is_some());
    }

    #[tokio::test]
    async fn discarded_record_cannot_be_retried() {
        let mut coordinator = SubmissionCoordinator::new(
            FlakySubmitter::new(1),
            drafts_with_record(),
            WizardConfig::default(),
        );
        assert!(coordinator.submit(record()).await.is_err());
        assert!(coordinator.pending().is_some());

        coordinator.discard_pending();
        assert!(coordinator.pending().is_none());
        assert_eq!(coordinator.state(), &SubmissionState::Idle);
        assert!(matches!(
            coordinator.retry().await,
            Err(SubmissionError::NothingToRetry)
        ));
    }

    #[tokio::test]
    async fn in_flight_blocks_a_second_attempt() {
        let mut coordinator = SubmissionCoordinator::new(
            FlakySubmitter::new(0),
            drafts_with_record(),
            WizardConfig::default(),
        );
        let ticket = coordinator.begin(record()).unwrap();
        assert!(coordinator.state().is_in_flight());
        assert_eq!(coordinator.view(), CompletionView::Completed);
        assert!(matches!(
            coordinator.begin(record()),
            Err(SubmissionError::AlreadyInFlight)
        ));

        let result = ticket.run().await;
        coordinator.finish(ticket, result).unwrap();
        assert_eq!(coordinator.state(), &SubmissionState::Succeeded);
        assert_eq!(coordinator.attempts(), 1);
    }

    #[test]
    fn state_gate() {
        assert!(SubmissionState::Idle.can_start().is_ok());
        assert!(SubmissionState::Failed("x".into()).can_start().is_ok());
        assert!(SubmissionState::InFlight.can_start().is_err());
        assert!(SubmissionState::Succeeded.can_start().is_err());
    }

    #[test]
    fn state_serialization() {
        assert_eq!(
            serde_json::to_value(SubmissionState::Failed("try again".into())).unwrap(),
            serde_json::json!({"status": "failed", "message": "try again"})
        );
        assert_eq!(
            serde_json::to_value(SubmissionState::Idle).unwrap(),
            serde_json::json!({"status": "idle"})
        );
    }
}
