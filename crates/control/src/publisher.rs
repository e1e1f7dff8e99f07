//! Per-printer MQTT publisher.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport};
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{ControlError, DEVICE_USERNAME};

const KEEP_ALIVE: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay before repolling after a connection error; rumqttc reconnects
/// on the next poll.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// A persistent control-channel connection to one printer.
///
/// The event loop runs on a background task so publishing never blocks
/// a request handler on broker I/O. Publishes are fire-and-forget: no
/// acknowledgment is awaited and delivery is not confirmed.
#[derive(Debug)]
pub struct Publisher {
    client: AsyncClient,
    poller: JoinHandle<()>,
}

impl Publisher {
    /// Opens a connection to the printer's broker.
    ///
    /// Waits for the broker's ConnAck before returning, so an
    /// unreachable or refusing printer surfaces here as an error the
    /// caller can report. Once connected, later connection drops are
    /// handled by the background task's reconnect loop.
    pub async fn connect(host: &str, port: u16, key: &str) -> Result<Self, ControlError> {
        let client_id = format!("pandaprint-{}", Uuid::new_v4().simple());
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_credentials(DEVICE_USERNAME, key);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_transport(Transport::Tls(TlsConfiguration::Rustls(
            pandaprint_tls::client_config(),
        )));

        let (client, mut eventloop) = AsyncClient::new(options, 16);
        tokio::time::timeout(CONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(event) => tracing::trace!(?event, "mqtt event"),
                    Err(e) => return Err(ControlError::Connect(e)),
                }
            }
        })
        .await
        .map_err(|_| ControlError::ConnectTimeout)??;

        let host = host.to_string();
        let poller = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => tracing::trace!(?event, "mqtt event"),
                    Err(e) => {
                        tracing::warn!(host, "mqtt connection error: {e}");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        Ok(Self { client, poller })
    }

    /// Serializes `payload` to JSON and publishes it on `topic` at
    /// QoS 0.
    pub async fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> Result<(), ControlError> {
        let body = serde_json::to_vec(payload)?;
        self.client
            .publish(topic, QoS::AtMostOnce, false, body)
            .await?;
        tracing::debug!(topic, "published control message");
        Ok(())
    }

    /// Disconnects and stops the background task.
    pub async fn shutdown(&self) {
        let _ = self.client.disconnect().await;
        self.poller.abort();
    }
}
