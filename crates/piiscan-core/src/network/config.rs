use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;

/// Static AWS credentials supplied through configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Entity detector service configuration.
///
/// Passed to the detector at construction time. When `credentials` is
/// unset the AWS default provider chain (environment, shared profile) is
/// used instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub region: String,
    /// Override for the service endpoint (e.g. a VPC endpoint or local stub)
    pub endpoint_url: Option<String>,
    pub credentials: Option<StaticCredentials>,
    pub connect_timeout_seconds: u32,
    pub request_timeout_seconds: u32,
    pub retry: RetryPolicy,
    /// Maximum detector calls in flight across all workers
    pub max_in_flight: usize,
    pub requests_per_second: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            credentials: None,
            connect_timeout_seconds: 10,
            request_timeout_seconds: 60,
            retry: RetryPolicy::default(),
            max_in_flight: 4,
            requests_per_second: None,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        if self.region.trim().is_empty() {
            return Err(DetectorConfigError::EmptyRegion);
        }
        if let Some(creds) = &self.credentials {
            if creds.access_key_id.trim().is_empty() || creds.secret_access_key.trim().is_empty() {
                return Err(DetectorConfigError::IncompleteCredentials);
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(DetectorConfigError::ZeroLimit("retry.max_attempts"));
        }
        if self.max_in_flight == 0 {
            return Err(DetectorConfigError::ZeroLimit("max_in_flight"));
        }
        if self.requests_per_second == Some(0) {
            return Err(DetectorConfigError::ZeroLimit("requests_per_second"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(DetectorConfigError::ZeroLimit("request_timeout_seconds"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectorConfigError {
    #[error("Detector region must not be empty")]
    EmptyRegion,
    #[error("Detector credentials need both access_key_id and secret_access_key")]
    IncompleteCredentials,
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(key: &str, secret: &str) -> StaticCredentials {
        StaticCredentials {
            access_key_id: key.into(),
            secret_access_key: secret.into(),
            session_token: Some("token".into()),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = DetectorConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.region, "us-east-1");
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_rejects_empty_region() {
        let config = DetectorConfig {
            region: "  ".into(),
            ..Default::default()
        };

        assert!(matches!(config.validate(), Err(DetectorConfigError::EmptyRegion)));
    }

    #[test]
    fn test_rejects_partial_credentials() {
        let config = DetectorConfig {
            credentials: Some(credentials("AKIDEXAMPLE", "")),
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::IncompleteCredentials)
        ));
    }

    #[test]
    fn test_rejects_zero_limits() {
        let config = DetectorConfig {
            max_in_flight: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::ZeroLimit("max_in_flight"))
        ));

        let config = DetectorConfig {
            requests_per_second: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::ZeroLimit("requests_per_second"))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", credentials("AKIDEXAMPLE", "wJalrXUtnFEMI"));

        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("wJalrXUtnFEMI"));
        assert!(!rendered.contains("\"token\""));
    }

    #[test]
    fn test_config_serialization() {
        let config = DetectorConfig {
            region: "eu-west-1".into(),
            credentials: Some(credentials("AKID", "secret")),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DetectorConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.region, "eu-west-1");
        assert_eq!(parsed.retry, config.retry);
        assert_eq!(parsed.credentials.unwrap().access_key_id, "AKID");
    }
}
