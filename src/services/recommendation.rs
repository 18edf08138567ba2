use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;
use validator::Validate;

use crate::core::criteria::SearchCriteria;
use crate::core::outcome::{Recommendation, RecommendationOutcome};
use crate::models::{Coordinate, ErrorResponse, RecommendRequest, RecommendResponse, Store};

/// Shown when the service gives no usable detail
pub const DEFAULT_FAILURE_MESSAGE: &str = "An error occurred while fetching recommendations.";

/// Errors that can occur when calling the recommendation service
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Service returned {status}: {detail:?}")]
    Service {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Message for the end user: the server's detail when present, else `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Service {
                detail: Some(detail),
                ..
            } => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Anything that turns criteria into an outcome
///
/// Implementations must never return `Idle` or `Loading`, and must map every
/// failure to `Failure` instead of panicking.
#[async_trait]
pub trait RecommendationService: Send + Sync {
    async fn submit(&self, criteria: &SearchCriteria) -> RecommendationOutcome;
}

/// HTTP client for `POST /recommend`
///
/// Issues exactly one request per call and performs no retries.
pub struct RecommendationClient {
    base_url: String,
    auth_token: Option<String>,
    failure_message: String,
    client: Client,
}

impl RecommendationClient {
    /// Create a new client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("taste-navigator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            auth_token: None,
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
            client,
        })
    }

    /// Attach a previously obtained credential as a bearer token
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send the criteria and return the typed recommendation
    pub async fn fetch(&self, criteria: &SearchCriteria) -> Result<Recommendation, ClientError> {
        let request = RecommendRequest::from(criteria);
        request
            .validate()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        let url = format!("{}/recommend", self.base_url.trim_end_matches('/'));

        tracing::debug!(
            "POST {} (radius {} km, {} tags, {} filters on)",
            url,
            request.radius_km,
            request.categories.len(),
            request.filters.values().filter(|v| **v == 1).count()
        );

        let mut builder = self.client.post(&url).json(&request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message());
            tracing::error!("Recommendation service returned {}: {}", status, body);
            return Err(ClientError::Service { status, detail });
        }

        let body: RecommendResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        into_recommendation(body)
    }
}

#[async_trait]
impl RecommendationService for RecommendationClient {
    async fn submit(&self, criteria: &SearchCriteria) -> RecommendationOutcome {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("recommend", %request_id);

        match self.fetch(criteria).instrument(span).await {
            Ok(recommendation) => {
                tracing::info!(
                    %request_id,
                    "Received {} stores (scanned {}, analyzed {})",
                    recommendation.stores.len(),
                    recommendation.scanned_count,
                    recommendation.analyzed_count
                );
                RecommendationOutcome::Success(recommendation)
            }
            Err(e) => {
                tracing::warn!(%request_id, "Recommendation failed: {}", e);
                RecommendationOutcome::Failure {
                    message: e.user_message(&self.failure_message),
                }
            }
        }
    }
}

fn into_recommendation(body: RecommendResponse) -> Result<Recommendation, ClientError> {
    let stores = body
        .stores
        .into_iter()
        .map(|record| {
            let location = Coordinate::new(record.lat, record.lng).map_err(|e| {
                ClientError::InvalidResponse(format!("store '{}': {}", record.name, e))
            })?;
            Ok(Store {
                name: record.name,
                location,
            })
        })
        .collect::<Result<Vec<_>, ClientError>>()?;

    Ok(Recommendation {
        result_text: body.result,
        stores,
        scanned_count: body.scanned_count,
        analyzed_count: body.analyzed_count,
        received_at: Utc::now(),
    })
}
