pub mod factory;
pub mod measurement;

pub use factory::{ServiceConfig, ServiceFactory, ServiceRegistry};
pub use measurement::{GENERIC_FAILURE_MESSAGE, MeasurementService, ServiceError};
