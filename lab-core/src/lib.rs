pub mod calculations;
pub mod catalog;
pub mod models;
pub mod service;
pub mod session;

pub use catalog::{CatalogError, MethodCatalog, load_methods};
pub use models::*;
pub use service::{MeasurementService, ServiceConfig, ServiceError};
pub use session::{CalculationError, CalculationSession, CalculationTicket};
