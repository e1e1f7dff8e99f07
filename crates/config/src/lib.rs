//! Static YAML configuration.
//!
//! ```yaml
//! listen-address: "::"
//! listen-port: 8080
//! printers:
//!   - name: voron
//!     host: 10.0.0.7
//!     serial: 01S00C123400000
//!     key: "12345678"
//!     timelapse: true
//! ```
//!
//! Printer entries reject unknown keys, so a typo in an option name
//! fails at startup instead of being silently dropped from the print
//! command.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use pandaprint_control::PrintOptions;

fn default_listen_address() -> String {
    "::".to_string()
}

fn default_listen_port() -> u16 {
    8080
}

fn default_ftp_port() -> u16 {
    990
}

fn default_mqtt_port() -> u16 {
    8883
}

/// Process configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "listen-address", default = "default_listen_address")]
    pub listen_address: String,
    #[serde(rename = "listen-port", default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default)]
    pub printers: Vec<PrinterConfig>,
}

/// One printer's identity and connection parameters.
///
/// `key` is the printer's access code; it doubles as the FTPS and the
/// MQTT password. The port overrides exist for printers behind port
/// forwards and for tests; real printers use the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrinterConfig {
    pub name: String,
    pub host: String,
    pub serial: String,
    pub key: String,
    #[serde(rename = "ftp-port", default = "default_ftp_port")]
    pub ftp_port: u16,
    #[serde(rename = "mqtt-port", default = "default_mqtt_port")]
    pub mqtt_port: u16,
    pub timelapse: Option<bool>,
    pub bed_levelling: Option<bool>,
    pub flow_cali: Option<bool>,
    pub vibration_cali: Option<bool>,
    pub layer_inspect: Option<bool>,
    pub use_ams: Option<bool>,
}

impl PrinterConfig {
    /// The option overrides to merge into outbound print commands.
    pub fn print_options(&self) -> PrintOptions {
        PrintOptions {
            timelapse: self.timelapse,
            bed_levelling: self.bed_levelling,
            flow_cali: self.flow_cali,
            vibration_cali: self.vibration_cali,
            layer_inspect: self.layer_inspect,
            use_ams: self.use_ams,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("duplicate printer name: {0}")]
    DuplicatePrinter(String),
}

impl Config {
    /// Loads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Parses and validates a configuration document.
    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(document)?;
        let mut seen = HashSet::new();
        for printer in &config.printers {
            if !seen.insert(printer.name.as_str()) {
                return Err(ConfigError::DuplicatePrinter(printer.name.clone()));
            }
        }
        Ok(config)
    }
}
