use std::time::Duration;

use async_trait::async_trait;
use lab_core::{
    CalculationRequest, CalculationResult, MeasurementService, MethodId, MethodRecord,
    ResearchPage, ResearchPageQuery, ServiceError,
};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error_body::error_detail;

/// [`MeasurementService`] over the laboratory REST API.
///
/// Endpoint paths are resolved against `base_url`, so a base of
/// `http://host/api` and `http://host/api/` behave the same.
pub struct HttpMeasurementService {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpMeasurementService {
    pub fn new(
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Self::with_client(client, base_url, timeout)
    }

    /// Uses a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(
        client: Client,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(
        &self,
        path: &str,
    ) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|e| ServiceError::Configuration(format!("invalid endpoint '{path}': {e}")))
    }

    fn transport_error(
        &self,
        err: reqwest::Error,
    ) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }

    /// Sends `request` and decodes a JSON body, turning non-success statuses
    /// into [`ServiceError::Rejected`] with the server's detail attached.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "service responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body);
            warn!(status = status.as_u16(), detail = ?detail, "service rejected request");
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| match self.transport_error(e) {
                ServiceError::Transport(msg) => ServiceError::Decode(msg),
                other => other,
            })
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, ServiceError> {
    let mut normalized = base_url.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized)
        .map_err(|e| ServiceError::Configuration(format!("invalid base url '{base_url}': {e}")))
}

#[async_trait]
impl MeasurementService for HttpMeasurementService {
    async fn research_page(
        &self,
        query: &ResearchPageQuery,
    ) -> Result<ResearchPage, ServiceError> {
        let url = self.endpoint("research-pages")?;
        let request = self.client.get(url).query(&[
            ("laboratory", query.laboratory_id.to_string()),
            ("department", query.department_id.to_string()),
            ("type", query.page_type.clone()),
        ]);
        self.send_json(request).await
    }

    async fn available_methods(
        &self,
        sample_id: i64,
        research_page_id: i64,
    ) -> Result<Vec<MethodRecord>, ServiceError> {
        let url = self.endpoint("available-methods")?;
        let request = self.client.get(url).query(&[
            ("sample", sample_id),
            ("researchPage", research_page_id),
        ]);
        self.send_json(request).await
    }

    async fn method(&self, id: MethodId) -> Result<MethodRecord, ServiceError> {
        let url = self.endpoint(&format!("methods/{id}"))?;
        self.send_json(self.client.get(url)).await
    }

    async fn calculate(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculationResult, ServiceError> {
        let url = self.endpoint("calculate")?;
        self.send_json(self.client.post(url).json(request)).await
    }
}
