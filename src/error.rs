//! Error types for the onboarding flow.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Local key-value storage errors.
///
/// Never fatal to a wizard session; the navigator downgrades them to warnings.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to read key {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Failed to write key {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to remove key {key}: {reason}")]
    Remove { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the remote platform API.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Platform rejected {endpoint} with status {status}: {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Errors surfaced by the submission coordinator.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Saving the onboarding record failed: {0}")]
    SaveFailed(#[source] PlatformError),

    #[error("Marking onboarding complete failed: {0}")]
    MarkCompleteFailed(#[source] PlatformError),

    #[error("Submission timed out after {0:?}")]
    Timeout(Duration),

    #[error("A submission is already in flight")]
    AlreadyInFlight,

    #[error("Onboarding was already submitted")]
    AlreadySubmitted,

    #[error("Nothing to retry: no completed record is pending")]
    NothingToRetry,
}

impl SubmissionError {
    /// Message shown to the user when a submission attempt fails.
    pub fn user_message(&self) -> String {
        match self {
            Self::SaveFailed(_) | Self::MarkCompleteFailed(_) => {
                "Failed to save onboarding data. Please try again.".to_string()
            }
            Self::Timeout(_) => {
                "Saving onboarding data took too long. Please try again.".to_string()
            }
            Self::AlreadyInFlight => "Your answers are already being saved.".to_string(),
            Self::AlreadySubmitted => "Your onboarding is already complete.".to_string(),
            Self::NothingToRetry => "There is nothing to submit yet.".to_string(),
        }
    }
}

/// Telemetry sink failures. Always swallowed by the caller.
#[derive(Debug, thiserror::Error)]
#[error("Telemetry sink {sink} failed: {reason}")]
pub struct TelemetryError {
    pub sink: String,
    pub reason: String,
}

/// Configuration or programming faults inside the wizard core.
///
/// These indicate a defect in the surrounding application, not user error.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Step index {index} out of range (wizard has {count} steps)")]
    StepOutOfRange { index: usize, count: usize },

    #[error("Step registry is empty")]
    EmptyRegistry,

    #[error("Step registry is malformed: {0}")]
    MalformedRegistry(String),

    #[error("Onboarding is already complete for this user")]
    AlreadyComplete,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
