//! HTTP backend for the measurement calculation workspace.
//!
//! Implements [`lab_core::MeasurementService`] against the laboratory REST
//! API:
//!
//! | call                  | request                                          |
//! |-----------------------|--------------------------------------------------|
//! | `research_page`       | `GET research-pages?laboratory&department&type`  |
//! | `available_methods`   | `GET available-methods?sample&researchPage`      |
//! | `method`              | `GET methods/{id}`                               |
//! | `calculate`           | `POST calculate` with `{ inputData, researchMethod }` |
//!
//! Non-success responses become [`lab_core::ServiceError::Rejected`] carrying
//! the server's error text when the body has one.

mod client;
mod error_body;
mod factory;

pub use client::HttpMeasurementService;
pub use error_body::error_detail;
pub use factory::HttpServiceFactory;
