//! Print-command wire format.

use serde::{Deserialize, Serialize};

use crate::PLATE_GCODE_PATH;

/// Per-printer print-option overrides.
///
/// Unset options are omitted from the outbound command so the printer
/// falls back to its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timelapse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bed_levelling: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_cali: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration_cali: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_inspect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_ams: Option<bool>,
}

/// The `project_file` command that starts a print.
///
/// The sequence and task identifiers are protocol-required but carry
/// no meaning for a relayed job, so they stay at their placeholder
/// values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintCommand {
    pub sequence_id: String,
    pub command: String,
    pub param: String,
    pub project_id: String,
    pub profile_id: String,
    pub task_id: String,
    pub subtask_id: String,
    pub subtask_name: String,
    pub url: String,
    pub bed_type: String,
    #[serde(flatten)]
    pub options: PrintOptions,
}

impl PrintCommand {
    /// Builds a command that prints `filename` from the printer's SD
    /// card, with the given per-printer overrides merged in.
    pub fn project_file(filename: &str, options: PrintOptions) -> Self {
        Self {
            sequence_id: "0".into(),
            command: "project_file".into(),
            param: PLATE_GCODE_PATH.into(),
            project_id: "0".into(),
            profile_id: "0".into(),
            task_id: "0".into(),
            subtask_id: "0".into(),
            subtask_name: String::new(),
            url: format!("file:///sdcard/model/{filename}"),
            bed_type: "auto".into(),
            options,
        }
    }
}

/// Envelope the printer expects around a [`PrintCommand`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintRequest {
    pub print: PrintCommand,
}
