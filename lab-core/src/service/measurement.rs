use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CalculationRequest, CalculationResult, MethodId, MethodRecord, ResearchPage,
    ResearchPageQuery,
};

/// Shown to the operator when the service gave no usable detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "Не удалось выполнить расчёт";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status. `detail` carries the
    /// server-provided error payload when there was one.
    #[error("Service rejected the request with status {status}")]
    Rejected { status: u16, detail: Option<String> },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Message suitable for an operator notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            Self::Timeout(limit) => format!(
                "Сервис расчёта не ответил за {} с",
                limit.as_secs()
            ),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Remote catalog and research-method evaluation service.
#[async_trait]
pub trait MeasurementService: Send + Sync {
    // Catalog
    async fn research_page(
        &self,
        query: &ResearchPageQuery,
    ) -> Result<ResearchPage, ServiceError>;

    async fn available_methods(
        &self,
        sample_id: i64,
        research_page_id: i64,
    ) -> Result<Vec<MethodRecord>, ServiceError>;

    // Evaluation
    async fn method(&self, id: MethodId) -> Result<MethodRecord, ServiceError>;

    async fn calculate(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculationResult, ServiceError>;
}
