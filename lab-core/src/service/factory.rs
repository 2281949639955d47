use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::measurement::{MeasurementService, ServiceError};

/// Backend-agnostic service connection configuration.
///
/// `backend` must match the [`ServiceFactory::backend_name`] of a
/// registered factory.  `base_url` is passed through to that factory
/// unchanged.
///
/// | backend | base_url example               |
/// |---------|--------------------------------|
/// | `http`  | `http://lims.local:8080/api/`  |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Lowercase identifier matching a registered factory (e.g. `"http"`).
    pub backend: String,
    /// Root every endpoint path is resolved against.
    pub base_url: String,
    /// Upper bound for a single remote call.
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            backend: "http".to_string(),
            base_url: "http://localhost:8080/api/".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// One implementation per transport.  Each backend crate exports a unit
/// struct implementing this trait, registered with a [`ServiceRegistry`]
/// at startup.
#[async_trait]
pub trait ServiceFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    async fn create(
        &self,
        config: &ServiceConfig,
    ) -> Result<Box<dyn MeasurementService>, ServiceError>;
}

/// Registry of [`ServiceFactory`] instances, keyed by backend name.
pub struct ServiceRegistry {
    factories: HashMap<&'static str, Box<dyn ServiceFactory>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory, replacing any factory with the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn ServiceFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Names of every registered backend, sorted alphabetically.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch to the factory that matches `config.backend`.
    ///
    /// # Errors
    /// * [`ServiceError::Configuration`] if no factory is registered for the
    ///   requested backend name.
    /// * Any error the chosen factory itself returns.
    pub async fn create(
        &self,
        config: &ServiceConfig,
    ) -> Result<Box<dyn MeasurementService>, ServiceError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                ServiceError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
