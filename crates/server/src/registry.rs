//! Printer registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;

use pandaprint_config::{Config, PrinterConfig};
use pandaprint_control::{ControlError, Publisher};

/// All configured printers, keyed by name.
pub struct Registry {
    printers: HashMap<String, Arc<Printer>>,
}

impl Registry {
    /// Builds the registry from a validated configuration.
    pub fn new(config: &Config) -> Self {
        let printers = config
            .printers
            .iter()
            .map(|p| (p.name.clone(), Arc::new(Printer::new(p.clone()))))
            .collect();
        Self { printers }
    }

    /// Looks up a printer by name.
    pub fn get(&self, name: &str) -> Option<Arc<Printer>> {
        self.printers.get(name).cloned()
    }

    /// Tears down every control channel that was opened.
    pub async fn shutdown(&self) {
        for printer in self.printers.values() {
            if let Some(publisher) = printer.publisher.get() {
                publisher.shutdown().await;
            }
        }
    }
}

/// One configured printer and its lazily-opened control channel.
///
/// The publisher is created on first use and lives for the rest of the
/// process; a printer that never prints never opens a control
/// connection. `OnceCell` guards the initialization, so two uploads
/// racing on first use still construct exactly one publisher, and a
/// failed connect leaves the cell empty so the next request retries.
pub struct Printer {
    config: PrinterConfig,
    publisher: OnceCell<Publisher>,
}

impl Printer {
    fn new(config: PrinterConfig) -> Self {
        Self {
            config,
            publisher: OnceCell::new(),
        }
    }

    /// Connection parameters and print-option overrides.
    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// The printer's control channel, opened on first use.
    pub async fn publisher(&self) -> Result<&Publisher, ControlError> {
        self.publisher
            .get_or_try_init(|| async {
                tracing::info!(printer = %self.config.name, "opening control channel");
                Publisher::connect(&self.config.host, self.config.mqtt_port, &self.config.key)
                    .await
            })
            .await
    }

    /// Whether the control channel has been opened.
    pub fn has_publisher(&self) -> bool {
        self.publisher.initialized()
    }
}
