//! The upload pipeline: split, transfer, optionally print.

use std::time::Duration;

use axum::http::StatusCode;
use tokio::task;

use pandaprint_archive::{ArchiveError, split};
use pandaprint_control::{
    ControlError, DEVICE_USERNAME, PrintCommand, PrintRequest, request_topic,
};
use pandaprint_ftps::{FtpsSession, TransferError};

use crate::registry::Printer;

/// Directory on the printer's SD card where jobs are stored.
const MODEL_DIR: &str = "/model";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced by the upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("package contains no plates to print")]
    NoPlates,

    #[error("worker task failed: {0}")]
    Join(#[from] task::JoinError),
}

impl UploadError {
    /// Client errors are the caller's fault (bad package); everything
    /// else is a relay-side failure.
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            UploadError::Archive(_) | UploadError::NoPlates => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Relays one uploaded package to a printer.
///
/// The package is split into per-plate archives, each archive is stored
/// on the printer over one FTPS session (one login per upload, closed
/// on every exit path), and when `should_print` is set a print command
/// referencing the first transferred file is published on the control
/// channel. Returns the first transferred filename.
///
/// Success means the outbound sends were issued; the printer does not
/// acknowledge either the files or the command. A failure partway
/// through the plate sequence fails the whole upload, and files
/// already stored are left for the printer to overwrite on a retry.
pub async fn handle_upload(
    printer: &Printer,
    filename: &str,
    content: Vec<u8>,
    should_print: bool,
) -> Result<Option<String>, UploadError> {
    let config = printer.config().clone();

    let plates = {
        let filename = filename.to_string();
        task::spawn_blocking(move || split(&content, &filename)).await??
    };
    let first_filename = plates.first().map(|p| p.filename.clone());

    if !plates.is_empty() {
        let host = config.host.clone();
        let key = config.key.clone();
        let port = config.ftp_port;
        task::spawn_blocking(move || -> Result<(), TransferError> {
            let mut session = FtpsSession::connect(&host, port, CONNECT_TIMEOUT)?;
            session.login(DEVICE_USERNAME, &key)?;
            session.enable_private_data()?;
            for plate in &plates {
                tracing::info!(file = %plate.filename, "storing plate archive");
                session.store(&format!("{MODEL_DIR}/{}", plate.filename), &plate.content)?;
            }
            session.quit()
        })
        .await??;
    }

    if should_print {
        let filename = first_filename.clone().ok_or(UploadError::NoPlates)?;
        let command = PrintCommand::project_file(&filename, config.print_options());
        printer
            .publisher()
            .await?
            .publish(&request_topic(&config.serial), &PrintRequest { print: command })
            .await?;
        tracing::info!(printer = %config.name, file = %filename, "print command published");
    }

    Ok(first_filename)
}
