//! MQTT control channel for Bambu printers.
//!
//! Commands are JSON documents published to `device/<serial>/request`
//! on the printer's MQTT broker (port 8883, TLS, self-signed cert).
//! The message format is documented by the OpenBambuAPI project:
//! <https://github.com/Doridian/OpenBambuAPI/blob/main/mqtt.md>

mod command;
mod publisher;

pub use command::{PrintCommand, PrintOptions, PrintRequest};
pub use publisher::Publisher;

/// Username both the FTPS server and the MQTT broker expect; the
/// password is the printer's access code (pre-shared key).
pub const DEVICE_USERNAME: &str = "bblp";

/// Canonical machine-code path inside a single-plate package. The
/// splitter renames every plate to plate 1, so this path is always
/// valid for the file a print command references.
pub const PLATE_GCODE_PATH: &str = "Metadata/plate_1.gcode";

/// Request topic for a printer.
pub fn request_topic(serial: &str) -> String {
    format!("device/{serial}/request")
}

/// Errors produced by the control channel.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("MQTT connect failed: {0}")]
    Connect(#[source] rumqttc::ConnectionError),

    #[error("MQTT connect timed out")]
    ConnectTimeout,
}
