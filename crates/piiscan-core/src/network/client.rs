use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_comprehend::config::{Credentials, Region};
use aws_sdk_comprehend::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_comprehend::operation::detect_pii_entities::DetectPiiEntitiesError;
use aws_sdk_comprehend::types::{LanguageCode, PiiEntity};
use aws_sdk_comprehend::Client;
use tracing::debug;

use super::config::{DetectorConfig, DetectorConfigError};
use crate::entity::DetectedEntity;
use crate::ingest::{DetectionError, DetectionResult, EntityDetector};

const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

const UNAVAILABLE_CODES: &[&str] = &[
    "InternalServerException",
    "InternalFailure",
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "RequestTimeout",
];

const CREDENTIAL_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "InvalidClientTokenId",
    "ExpiredTokenException",
    "AccessDeniedException",
    "MissingAuthenticationToken",
];

/// AWS Comprehend `DetectPiiEntities` client.
///
/// SDK-level retries are disabled. Wrap it with
/// [`guarded`](super::guarded) to get logged retries and throttling.
pub struct ComprehendDetector {
    client: Client,
}

impl ComprehendDetector {
    pub async fn new(config: &DetectorConfig) -> Result<Self, DetectorConfigError> {
        config.validate()?;

        let timeouts = TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .operation_timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeouts);

        if let Some(ref endpoint) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        if let Some(ref creds) = config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                &creds.access_key_id,
                &creds.secret_access_key,
                creds.session_token.clone(),
                None,
                "piiscan-config",
            ));
        }

        let sdk_config = loader.load().await;

        Ok(Self::from_client(Client::new(&sdk_config)))
    }

    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl EntityDetector for ComprehendDetector {
    fn name(&self) -> &'static str {
        "comprehend"
    }

    async fn detect(&self, text: &str, language: &str) -> DetectionResult<Vec<DetectedEntity>> {
        let output = self
            .client
            .detect_pii_entities()
            .text(text)
            .language_code(LanguageCode::from(language))
            .send()
            .await
            .map_err(classify)?;

        let entities: Vec<DetectedEntity> = output.entities().iter().filter_map(to_detected).collect();
        debug!(count = entities.len(), "comprehend returned entities");

        Ok(entities)
    }
}

fn to_detected(entity: &PiiEntity) -> Option<DetectedEntity> {
    let entity_type = entity.r#type()?.as_str();
    let begin = usize::try_from(entity.begin_offset()?).ok()?;
    let end = usize::try_from(entity.end_offset()?).ok()?;
    let score = entity.score().map_or(0.0, round_score);

    Some(DetectedEntity::new(entity_type, score, begin, end))
}

/// Comprehend scores are `f32`; keep the report free of widening noise.
fn round_score(score: f32) -> f64 {
    (f64::from(score) * 1e6).round() / 1e6
}

fn classify<R: std::fmt::Debug>(err: SdkError<DetectPiiEntitiesError, R>) -> DetectionError {
    let message = DisplayErrorContext(&err).to_string();

    match &err {
        SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
            DetectionError::Unavailable(message)
        }
        SdkError::DispatchFailure(failure) if failure.is_io() || failure.is_timeout() => {
            DetectionError::Unavailable(message)
        }
        SdkError::ServiceError(context) => {
            let service_err = context.err();
            if service_err.is_internal_server_exception() {
                DetectionError::Unavailable(message)
            } else if service_err.is_invalid_request_exception()
                || service_err.is_text_size_limit_exceeded_exception()
                || service_err.is_unsupported_language_exception()
            {
                DetectionError::Rejected(message)
            } else {
                classify_code(service_err.code(), message)
            }
        }
        _ => DetectionError::Rejected(message),
    }
}

fn classify_code(code: Option<&str>, message: String) -> DetectionError {
    match code {
        Some(code) if THROTTLING_CODES.contains(&code) => DetectionError::RateLimited(message),
        Some(code) if UNAVAILABLE_CODES.contains(&code) => DetectionError::Unavailable(message),
        Some(code) if CREDENTIAL_CODES.contains(&code) => DetectionError::Credentials(message),
        _ => DetectionError::Rejected(message),
    }
}
