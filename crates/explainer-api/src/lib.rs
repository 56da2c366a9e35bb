//! Explainer API Library
//!
//! This crate provides the HTTP API handlers, middleware, and application setup.

mod api_doc;
pub mod constants;
mod handlers;
mod middleware;
pub mod setup;
mod telemetry;
mod utils;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use handlers::repositories::{CreateRepositoryRequest, DeleteRepositoryResponse};
pub use middleware::request_id::{RequestId, REQUEST_ID_HEADER};
