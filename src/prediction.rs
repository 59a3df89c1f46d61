use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::normalize_identifier;
use crate::products::CandidateProduct;

pub const DEFAULT_PREDICT_URL: &str = "http://localhost:8000/predict_reaction";

/// Body of `POST /predict_reaction`. Both fields are already digit-stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub element_a: String,
    pub element_b: String,
}

impl PredictionRequest {
    pub fn from_identifiers(first: &str, second: &str) -> Self {
        PredictionRequest {
            element_a: normalize_identifier(first),
            element_b: normalize_identifier(second),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub stable_products: Option<Vec<CandidateProduct>>,
    #[serde(default)]
    pub reactants: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("prediction request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("prediction service returned {0}")]
    Status(StatusCode),
    #[error("malformed prediction response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, PredictionError>;
}

pub struct HttpPredictionService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPredictionService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PredictionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PredictionError::Client)?;
        Ok(HttpPredictionService {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, PredictionError> {
        debug!(
            endpoint = %self.endpoint,
            element_a = %request.element_a,
            element_b = %request.element_b,
            "requesting prediction"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(PredictionError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, endpoint = %self.endpoint, "prediction service rejected request");
            return Err(PredictionError::Status(status));
        }

        response
            .json::<PredictionResponse>()
            .await
            .map_err(PredictionError::Decode)
    }
}
