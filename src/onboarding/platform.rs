//! Remote platform boundary: user metadata reads and writes.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::config::PlatformConfig;
use crate::error::{PlatformError, SubmissionError};

use super::model::CompleteRecord;
use super::submission::RecordSubmitter;

/// Metadata key marking a user as onboarded.
pub const ONBOARDING_COMPLETED_KEY: &str = "onboardingCompleted";

/// User-record operations offered by the platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Store the onboarding answers in the user's metadata.
    async fn save_user_record(
        &self,
        user_id: &str,
        record: &CompleteRecord,
    ) -> Result<(), PlatformError>;

    /// Flag the user as onboarded. `record` is sent again alongside the flag
    /// so a platform that replaces metadata wholesale keeps the answers.
    async fn mark_onboarding_complete(
        &self,
        user_id: &str,
        record: &CompleteRecord,
    ) -> Result<(), PlatformError>;

    async fn get_onboarding_status(&self, user_id: &str) -> Result<bool, PlatformError>;
}

/// Whether the wizard can be skipped. Query failures count as "not complete".
pub async fn onboarding_status(api: &dyn PlatformApi, user_id: &str) -> bool {
    match api.get_onboarding_status(user_id).await {
        Ok(completed) => completed,
        Err(e) => {
            warn!(user_id, error = %e, "Error checking onboarding status");
            false
        }
    }
}

/// reqwest-backed client for the platform's app API.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    config: PlatformConfig,
}

impl HttpPlatformClient {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn user_endpoint(&self, user_id: &str) -> String {
        format!("/app/users/{user_id}")
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.api_base, endpoint)
    }

    async fn post_metadata(&self, user_id: &str, metadata: Value) -> Result<(), PlatformError> {
        let endpoint = self.user_endpoint(user_id);
        let response = self
            .http
            .post(self.url(&endpoint))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&json!({ "metadata": metadata }))
            .send()
            .await
            .map_err(|e| PlatformError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(rejection(&endpoint, response).await);
        }
        debug!(%endpoint, "Platform metadata updated");
        Ok(())
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    async fn save_user_record(
        &self,
        user_id: &str,
        record: &CompleteRecord,
    ) -> Result<(), PlatformError> {
        let metadata = record_metadata(record).map_err(|e| PlatformError::RequestFailed {
            endpoint: self.user_endpoint(user_id),
            reason: format!("could not encode record: {e}"),
        })?;
        self.post_metadata(user_id, Value::Object(metadata)).await
    }

    async fn mark_onboarding_complete(
        &self,
        user_id: &str,
        record: &CompleteRecord,
    ) -> Result<(), PlatformError> {
        let completed_at = chrono::Utc::now().to_rfc3339();
        let metadata = completion_metadata(record, &completed_at).map_err(|e| {
            PlatformError::RequestFailed {
                endpoint: self.user_endpoint(user_id),
                reason: format!("could not encode record: {e}"),
            }
        })?;
        self.post_metadata(user_id, metadata).await
    }

    async fn get_onboarding_status(&self, user_id: &str) -> Result<bool, PlatformError> {
        let endpoint = self.user_endpoint(user_id);
        let response = self
            .http
            .get(self.url(&endpoint))
            .bearer_auth(self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| PlatformError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(rejection(&endpoint, response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        Ok(completed_flag(&body))
    }
}

fn record_metadata(record: &CompleteRecord) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(<serde_json::Error as serde::ser::Error>::custom(
            "record did not encode as an object",
        )),
    }
}

/// The record's sections plus the completion flag and timestamp.
fn completion_metadata(
    record: &CompleteRecord,
    completed_at: &str,
) -> Result<Value, serde_json::Error> {
    let mut metadata = record_metadata(record)?;
    metadata.insert(ONBOARDING_COMPLETED_KEY.to_string(), Value::Bool(true));
    metadata.insert(
        "onboardingCompletedAt".to_string(),
        Value::String(completed_at.to_string()),
    );
    Ok(Value::Object(metadata))
}

/// `metadata.onboardingCompleted == true`; anything else is false.
fn completed_flag(user: &Value) -> bool {
    user.get("metadata")
        .and_then(|m| m.get(ONBOARDING_COMPLETED_KEY))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

async fn rejection(endpoint: &str, response: reqwest::Response) -> PlatformError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    PlatformError::Rejected {
        endpoint: endpoint.to_string(),
        status,
        message: error_message(&body),
    }
}

/// Pull a readable message out of an error body (`{"error": {"message": ..}}`,
/// `{"error": ".."}` or `{"message": ..}`), falling back to the raw text.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error"))
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
    });
    match message {
        Some(m) => m.to_string(),
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().chars().take(200).collect(),
    }
}

/// Submits a record by saving it, then marking onboarding complete.
pub struct PlatformSubmitter {
    api: Arc<dyn PlatformApi>,
    user_id: String,
}

impl PlatformSubmitter {
    pub fn new(api: Arc<dyn PlatformApi>, user_id: impl Into<String>) -> Self {
        Self {
            api,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl RecordSubmitter for PlatformSubmitter {
    async fn submit(&self, record: &CompleteRecord) -> Result<(), SubmissionError> {
        self.api
            .save_user_record(&self.user_id, record)
            .await
            .map_err(SubmissionError::SaveFailed)?;
        self.api
            .mark_onboarding_complete(&self.user_id, record)
            .await
            .map_err(SubmissionError::MarkCompleteFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::onboarding::model::{PersonalInfo, Preferences, ProfessionalInfo, Role};

    #[derive(Default)]
    struct ScriptedApi {
        calls: Mutex<Vec<String>>,
        fail_save: bool,
        fail_mark: bool,
        status: Option<bool>,
    }

    #[async_trait]
    impl PlatformApi for ScriptedApi {
        async fn save_user_record(
            &self,
            user_id: &str,
            _record: &CompleteRecord,
        ) -> Result<(), PlatformError> {
            self.calls.lock().unwrap().push(format!("save:{user_id}"));
            if self.fail_save {
                return Err(PlatformError::RequestFailed {
                    endpoint: "save".into(),
                    reason: "offline".into(),
                });
            }
            Ok(())
        }

        async fn mark_onboarding_complete(
            &self,
            user_id: &str,
            _record: &CompleteRecord,
        ) -> Result<(), PlatformError> {
            self.calls.lock().unwrap().push(format!("mark:{user_id}"));
            if self.fail_mark {
                return Err(PlatformError::RequestFailed {
                    endpoint: "mark".into(),
                    reason: "offline".into(),
                });
            }
            Ok(())
        }

        async fn get_onboarding_status(&self, _user_id: &str) -> Result<bool, PlatformError> {
            self.status.ok_or(PlatformError::InvalidResponse {
                endpoint: "status".into(),
                reason: "no user".into(),
            })
        }
    }

    fn record() -> CompleteRecord {
        CompleteRecord {
            personal_info: PersonalInfo {
                name: "Al".into(),
                email: "a@b.com".into(),
            },
            professional_info: ProfessionalInfo {
                role: Role::Other,
                experience: 0.0,
            },
            preferences: Preferences {
                interests: vec!["Data Science".into()],
                newsletter: false,
            },
        }
    }

    #[tokio::test]
    async fn submitter_saves_then_marks() {
        let api = Arc::new(ScriptedApi::default());
        let submitter = PlatformSubmitter::new(api.clone(), "user_1");
        submitter.submit(&record()).await.unwrap();
        assert_eq!(*api.calls.lock().unwrap(), ["save:user_1", "mark:user_1"]);
    }

    #[tokio::test]
    async fn failed_save_skips_mark() {
        let api = Arc::new(ScriptedApi {
            fail_save: true,
            ..Default::default()
        });
        let err = PlatformSubmitter::new(api.clone(), "u")
            .submit(&record())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::SaveFailed(_)));
        assert_eq!(*api.calls.lock().unwrap(), ["save:u"]);
    }

    #[tokio::test]
    async fn failed_mark_fails_submission() {
        let api = Arc::new(ScriptedApi {
            fail_mark: true,
            ..Default::default()
        });
        let err = PlatformSubmitter::new(api, "u")
            .submit(&record())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::MarkCompleteFailed(_)));
    }

    #[tokio::test]
    async fn status_errors_mean_not_complete() {
        let broken = ScriptedApi::default();
        assert!(!onboarding_status(&broken, "u").await);

        let done = ScriptedApi {
            status: Some(true),
            ..Default::default()
        };
        assert!(onboarding_status(&done, "u").await);
    }

    #[test]
    fn completion_metadata_keeps_the_answers() {
        let metadata = completion_metadata(&record(), "2026-01-01T00:00:00+00:00").unwrap();
        assert_eq!(metadata["onboardingCompleted"], true);
        assert_eq!(metadata["onboardingCompletedAt"], "2026-01-01T00:00:00+00:00");
        assert_eq!(metadata["personalInfo"]["email"], "a@b.com");
        assert_eq!(metadata["professionalInfo"]["role"], "Other");
        assert_eq!(metadata["preferences"]["interests"][0], "Data Science");
        assert!(completed_flag(&json!({ "metadata": metadata })));
    }

    #[test]
    fn completed_flag_requires_literal_true() {
        assert!(completed_flag(&json!({"metadata": {"onboardingCompleted": true}})));
        assert!(!completed_flag(&json!({"metadata": {"onboardingCompleted": "true"}})));
        assert!(!completed_flag(&json!({"metadata": {}})));
        assert!(!completed_flag(&json!({})));
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(error_message(r#"{"error": {"message": "nope"}}"#), "nope");
        assert_eq!(error_message(r#"{"error": "denied"}"#), "denied");
        assert_eq!(error_message(r#"{"message": "bad"}"#), "bad");
        assert_eq!(error_message("plain text"), "plain text");
        assert_eq!(error_message(""), "empty response body");
    }
}
