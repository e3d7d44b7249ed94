//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default platform API base URL.
pub const DEFAULT_PLATFORM_API_BASE: &str = "https://api.whop.com/api/v5";

/// Connection settings for the remote platform.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub api_base: String,
    pub api_key: SecretString,
}

/// Wizard behaviour knobs.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Remote submission is treated as failed after this long. `None` waits forever.
    pub submit_timeout: Option<Duration>,
    /// Show the completed view before the platform confirms the submission.
    pub optimistic: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Some(Duration::from_secs(15)),
            optimistic: true,
        }
    }
}

/// Process configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Directory backing the local key-value store.
    pub data_dir: PathBuf,
    /// Platform user this process onboards (single-user process).
    pub user_id: String,
    /// Profile values used to pre-fill the first step.
    pub seed_name: Option<String>,
    pub seed_email: Option<String>,
    pub platform: PlatformConfig,
    pub wizard: WizardConfig,
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// `PLATFORM_API_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("PLATFORM_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("PLATFORM_API_KEY".to_string()))?;

        let api_base = std::env::var("PLATFORM_API_BASE")
            .unwrap_or_else(|_| DEFAULT_PLATFORM_API_BASE.to_string());
        if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "PLATFORM_API_BASE".to_string(),
                message: format!("expected an http(s) URL, got `{api_base}`"),
            });
        }

        let port: u16 = std::env::var("ONBOARDING_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("ONBOARDING_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let user_id =
            std::env::var("ONBOARDING_USER_ID").unwrap_or_else(|_| "default".to_string());

        let submit_timeout_secs: u64 = std::env::var("ONBOARDING_SUBMIT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15);

        let optimistic = std::env::var("ONBOARDING_OPTIMISTIC")
            .ok()
            .and_then(|s| parse_bool(&s))
            .unwrap_or(true);

        Ok(Self {
            port,
            data_dir,
            user_id,
            seed_name: non_empty_env("ONBOARDING_USER_NAME"),
            seed_email: non_empty_env("ONBOARDING_USER_EMAIL"),
            platform: PlatformConfig {
                api_base: api_base.trim_end_matches('/').to_string(),
                api_key: SecretString::from(api_key),
            },
            wizard: WizardConfig {
                // 0 disables the timeout
                submit_timeout: (submit_timeout_secs > 0)
                    .then(|| Duration::from_secs(submit_timeout_secs)),
                optimistic,
            },
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn default_wizard_config() {
        let config = WizardConfig::default();
        assert!(config.optimistic);
        assert_eq!(config.submit_timeout, Some(Duration::from_secs(15)));
    }
}
