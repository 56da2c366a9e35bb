//! API constants

/// API base path prefix
pub const API_PREFIX: &str = "/api";

/// Path of the served OpenAPI document.
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Multipart fields accepted next to `file` on archive uploads.
pub const UPLOAD_TEXT_FIELDS: &[&str] = &["id", "name", "description"];

/// Upper bound on the text of an optional multipart field.
pub const MAX_UPLOAD_TEXT_FIELD_BYTES: usize = 4 * 1024;
