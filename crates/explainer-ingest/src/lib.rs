//! Explainer Ingestion Library
//!
//! Turns a remote git repository or an uploaded archive into a published
//! snapshot: acquire into a private staging directory, catalog the staged tree,
//! then hand it to the snapshot store. The `IngestionService` drives that flow,
//! keeps the repository registry current and enforces one ingestion per
//! repository at a time.

pub mod acquirer;
pub mod cataloger;
pub mod classify;
pub mod error;
pub mod quota;
pub mod registry;
pub mod service;

pub use acquirer::{DefaultAcquirer, SourceAcquirer, SourceInput};
pub use cataloger::{catalog_tree, Catalog};
pub use error::{IngestError, IngestResult};
pub use quota::Quota;
pub use registry::RepositoryRegistry;
pub use service::{IngestRequest, IngestionService, PreparedIngestion};
