//! OctoPrint-compatible HTTP relay for Bambu Lab printers.
//!
//! Slicers and print managers that speak the OctoPrint file-upload API
//! post a packaged print job here; the relay splits multi-plate
//! packages, pushes the result to the printer over implicit-TLS FTP,
//! and starts the print over MQTT when asked to.

mod api;
pub mod registry;
pub mod upload;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

pub use api::ApiError;
pub use registry::{Printer, Registry};
pub use upload::{UploadError, handle_upload};

/// API version reported to clients.
pub const API_VERSION: &str = "1.1.0";

/// Server identification reported to clients. Slicers gate feature
/// detection on this string, so it mimics an OctoPrint release.
pub const SERVER_TEXT: &str = "OctoPrint 1.1.0 (PandaPrint 1.0)";

/// Sliced multi-plate packages run to hundreds of megabytes.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Builds the HTTP router.
pub fn app(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/{printer}/api/version", get(api::version))
        .route("/{printer}/api/files/{location}", post(api::upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(registry)
}
