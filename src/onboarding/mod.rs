//! Onboarding wizard core.
//!
//! A single logical record is split into ordered steps, each validated on
//! its own before the navigator advances. Partial progress is saved to a
//! key-value store after every committed step and restored on the next
//! session. When the last step commits, the whole record is re-checked and
//! handed to the submission coordinator, which reports it to the platform.

pub mod model;
pub mod navigator;
pub mod platform;
pub mod render;
pub mod routes;
pub mod schema;
pub mod session;
pub mod storage;
pub mod submission;
pub mod telemetry;
pub mod validate;

pub use model::{CompleteRecord, PartialRecord, SeedData};
pub use navigator::{CommitOutcome, NavigationState, StepNavigator};
pub use platform::{HttpPlatformClient, PlatformApi, PlatformSubmitter, onboarding_status};
pub use render::{StepView, Widget};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use schema::{StepDefinition, StepKind, StepRegistry};
pub use session::{CommitReport, OnboardingSession, SessionStatus};
pub use storage::{DraftStore, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use submission::{CompletionView, RecordSubmitter, SubmissionCoordinator, SubmissionState};
pub use telemetry::{TelemetrySink, TracingTelemetry};
pub use validate::FieldErrors;
