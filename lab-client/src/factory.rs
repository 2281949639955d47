use async_trait::async_trait;

use lab_core::service::{MeasurementService, ServiceConfig, ServiceError, ServiceFactory};

use crate::client::HttpMeasurementService;

/// [`ServiceFactory`] for the laboratory REST API.
///
/// Register this with a [`lab_core::service::ServiceRegistry`] to make the
/// `"http"` backend available:
///
/// ```rust,no_run
/// use lab_core::service::ServiceRegistry;
/// use lab_client::HttpServiceFactory;
///
/// let mut registry = ServiceRegistry::new();
/// registry.register(Box::new(HttpServiceFactory));
/// ```
pub struct HttpServiceFactory;

#[async_trait]
impl ServiceFactory for HttpServiceFactory {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    /// Builds a client for `config.base_url` whose requests are bounded by
    /// `config.timeout`. No request is made here.
    async fn create(
        &self,
        config: &ServiceConfig,
    ) -> Result<Box<dyn MeasurementService>, ServiceError> {
        let service = HttpMeasurementService::new(&config.base_url, config.timeout)?;
        Ok(Box::new(service))
    }
}
