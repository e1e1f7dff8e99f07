//! HTTP handlers for the OctoPrint-compatible surface.

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::registry::Registry;
use crate::upload::UploadError;
use crate::{API_VERSION, SERVER_TEXT};

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown printer: {0}")]
    UnknownPrinter(String),

    #[error("multipart field \"file\" is required")]
    MissingFile,

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Control(#[from] pandaprint_control::ControlError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownPrinter(_) => StatusCode::NOT_FOUND,
            ApiError::MissingFile | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload(e) => e.status(),
            ApiError::Control(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::warn!("request rejected: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

/// `GET /{printer}/api/version`
///
/// Besides reporting the OctoPrint-compatible version, this eagerly
/// opens the printer's control channel, so a slicer's connectivity
/// check exercises the MQTT path before a job is submitted: an
/// unreachable broker turns the check into a server error instead of
/// a false OK.
pub(crate) async fn version(
    State(registry): State<Arc<Registry>>,
    Path(printer): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let printer = registry
        .get(&printer)
        .ok_or(ApiError::UnknownPrinter(printer))?;
    printer.publisher().await?;

    Ok(Json(serde_json::json!({
        "api": API_VERSION,
        "server": API_VERSION,
        "text": SERVER_TEXT,
    })))
}

/// `POST /{printer}/api/files/{location}`
///
/// Multipart form upload per the OctoPrint files API. The `location`
/// segment is accepted for compatibility and ignored; files always
/// land on the printer's SD card.
pub(crate) async fn upload(
    State(registry): State<Arc<Registry>>,
    Path((printer, _location)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    let printer = registry
        .get(&printer)
        .ok_or(ApiError::UnknownPrinter(printer))?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut should_print = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.3mf").to_string();
                let content = field.bytes().await?;
                file = Some((filename, content.to_vec()));
            }
            Some("print") => {
                should_print = field.text().await?.trim().eq_ignore_ascii_case("true");
            }
            _ => {}
        }
    }

    let (filename, content) = file.ok_or(ApiError::MissingFile)?;
    crate::upload::handle_upload(&printer, &filename, content, should_print).await?;
    Ok(StatusCode::CREATED)
}
