use crate::session::{prompt, Flow, Session};
use anyhow::{Context, Result};
use heimwatt_report::Render;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument, warn};

const DEFAULT_PORT: u16 = 1883;

/// Request channel capacity between the client handle and its event loop.
const REQUEST_CAPACITY: usize = 10;

/// How long to keep polling after `exit` for the DISCONNECT to go out.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that end a monitoring run.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid broker address: {0}")]
    InvalidBroker(String),
    #[error("Unsupported QoS level {0} (expected 0, 1 or 2)")]
    InvalidQos(u8),
    #[error("MQTT event loop error: {0}")]
    EventLoop(#[from] rumqttc::ConnectionError),
    #[error("Failed to subscribe: {0}")]
    Subscribe(#[from] rumqttc::ClientError),
}

/// Where and how to subscribe.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String,
    pub qos: QoS,
    pub keep_alive: Duration,
}

impl BrokerSettings {
    pub fn new(
        broker_url: &str,
        topic: String,
        client_id: String,
        qos: u8,
        keep_alive: Duration,
    ) -> Result<Self, ConnectionError> {
        let (host, port) = parse_broker_url(broker_url)?;
        Ok(Self {
            host: host.to_string(),
            port,
            client_id,
            topic,
            qos: qos_from_level(qos)?,
            keep_alive,
        })
    }
}

fn qos_from_level(level: u8) -> Result<QoS, ConnectionError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(ConnectionError::InvalidQos(other)),
    }
}

/// Parse broker URL in format mqtt://host:port or tcp://host:port or host:port
fn parse_broker_url(url: &str) -> Result<(&str, u16), ConnectionError> {
    let url = url.trim();
    let url = url.trim_start_matches("mqtt://");
    let url = url.trim_start_matches("tcp://");

    let parts: Vec<&str> = url.split(':').collect();
    match parts.as_slice() {
        [host] if !host.is_empty() => Ok((*host, DEFAULT_PORT)),
        [host, port] if !host.is_empty() => {
            let port = port.parse::<u16>().map_err(|_| {
                ConnectionError::InvalidBroker(format!("invalid port in broker URL: {port}"))
            })?;
            Ok((*host, port))
        }
        _ => Err(ConnectionError::InvalidBroker(format!(
            "invalid broker URL format: {url}"
        ))),
    }
}

/// Runs the interactive monitor until `exit`, end of stdin, or a connection error.
///
/// Broker events and operator input are multiplexed on this one task, so the
/// session is only ever touched from here. The subscription is (re)issued on
/// every `ConnAck`. The prompt and command replies go to `console`; rendered
/// summaries go wherever the session's renderer writes.
#[instrument(
    name = "mqtt_monitor",
    skip_all,
    fields(
        host = %settings.host,
        port = settings.port,
        topic = %settings.topic,
    )
)]
pub async fn run_monitor<R: Render>(
    settings: &BrokerSettings,
    session: &mut Session<R>,
    console: &mut impl Write,
) -> Result<()> {
    let mut mqtt_options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    mqtt_options.set_keep_alive(settings.keep_alive);
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);

    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    prompt(console)?;

    loop {
        tokio::select! {
            line = commands.next_line() => {
                let Some(line) = line.context("failed to read command from stdin")? else {
                    info!("stdin closed, stopping monitor");
                    break;
                };
                match session.on_input(&line, console)? {
                    Flow::Stop => break,
                    Flow::Continue => prompt(console)?,
                }
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!(session_present = ack.session_present, "Connected to broker");
                        client
                            .subscribe(&settings.topic, settings.qos)
                            .await
                            .map_err(ConnectionError::from)?;
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        debug!("subscription acknowledged");
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        session.on_payload(&publish.topic, &publish.payload);
                    }
                    Ok(_) => {}
                    Err(e) => return Err(ConnectionError::from(e).into()),
                }
            }
        }
    }

    disconnect(&client, &mut eventloop).await;
    info!(readings = session.log().len(), "monitor stopped");
    Ok(())
}

/// Queues a DISCONNECT and drives the event loop until it has been written.
///
/// Failures here are logged only; the monitor is shutting down either way.
async fn disconnect(client: &AsyncClient, eventloop: &mut EventLoop) {
    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "failed to request disconnect");
        return;
    }

    let flushed = tokio::time::timeout(DISCONNECT_TIMEOUT, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(e),
            }
        }
    })
    .await;

    match flushed {
        Ok(Ok(())) => debug!("disconnect sent"),
        Ok(Err(e)) => warn!(error = %e, "event loop failed while disconnecting"),
        Err(_) => warn!(
            timeout_ms = DISCONNECT_TIMEOUT.as_millis(),
            "timed out waiting for disconnect"
        ),
    }
}
