use boat_protocol::InboundMessage;
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, NetworkOptions, Packet, QoS,
    Transport as Wire,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

use crate::config::ConnectOptions;
use crate::error::LinkError;
use crate::transport::{Delivery, Transport, TransportEvent};

const REQUEST_CAP: usize = 64;

/// rumqttc-backed transport. The event loop runs on its own tokio task and
/// reconnects by being polled again after `reconnect_period`.
pub struct MqttTransport {
    events: mpsc::UnboundedSender<Delivery>,
    generation: u64,
    client: Option<AsyncClient>,
    task: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl MqttTransport {
    pub fn new(events: mpsc::UnboundedSender<Delivery>) -> Self {
        Self {
            events,
            generation: 0,
            client: None,
            task: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn client(&self) -> Result<&AsyncClient, LinkError> {
        self.client.as_ref().ok_or(LinkError::NotOpen)
    }
}

impl Transport for MqttTransport {
    fn open(&mut self, url: &str, options: &ConnectOptions) -> Result<(), LinkError> {
        self.close();

        let mqtt_options = mqtt_options(url, options)?;
        let (client, mut event_loop) = AsyncClient::new(mqtt_options, REQUEST_CAP);
        let mut network = NetworkOptions::new();
        network.set_connection_timeout(options.connect_timeout.as_secs());
        event_loop.set_network_options(network);

        let connected = Arc::new(AtomicBool::new(false));
        self.connected = Arc::clone(&connected);
        self.generation += 1;

        info!(
            %url,
            client_id = %options.client_id,
            generation = self.generation,
            "opening mqtt transport"
        );
        let task = tokio::spawn(drive(
            event_loop,
            self.events.clone(),
            self.generation,
            connected,
            options.reconnect_period,
        ));

        self.client = Some(client);
        self.task = Some(task);
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError> {
        self.client()?
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|e| LinkError::Rejected(e.to_string()))
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        self.client()?
            .try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| LinkError::Rejected(e.to_string()))
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        self.client()?
            .try_unsubscribe(topic)
            .map_err(|e| LinkError::Rejected(e.to_string()))
    }

    fn close(&mut self) {
        if let Some(client) = self.client.take() {
            let _ = client.try_disconnect();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.connected.store(false, Ordering::Relaxed);
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn drive(
    mut event_loop: EventLoop,
    events: mpsc::UnboundedSender<Delivery>,
    generation: u64,
    connected: Arc<AtomicBool>,
    reconnect_period: Duration,
) {
    let deliver = |event| events.send(Delivery { generation, event }).is_ok();
    loop {
        let event = match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::Relaxed);
                TransportEvent::Connected
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                TransportEvent::Message(InboundMessage {
                    topic: publish.topic.clone(),
                    payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                })
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::Relaxed);
                TransportEvent::Closed
            }
            Ok(_) => continue,
            Err(ConnectionError::RequestsDone) => {
                connected.store(false, Ordering::Relaxed);
                deliver(TransportEvent::Closed);
                return;
            }
            Err(err) => {
                let was_connected = connected.swap(false, Ordering::Relaxed);
                let event = if was_connected && is_link_loss(&err) {
                    debug!(error = %err, "mqtt link lost");
                    TransportEvent::Closed
                } else {
                    error!(error = %err, "mqtt transport error");
                    TransportEvent::Error(err.to_string())
                };
                if !deliver(event) {
                    return;
                }
                tokio::time::sleep(reconnect_period).await;
                continue;
            }
        };

        if !deliver(event) {
            return;
        }
    }
}

fn is_link_loss(err: &ConnectionError) -> bool {
    matches!(
        err,
        ConnectionError::Io(_) | ConnectionError::MqttState(_) | ConnectionError::NetworkTimeout
    )
}

/// Translates a broker URL into rumqttc options. `ws`/`wss` keep the full URL
/// as the broker address, which is what rumqttc's websocket transport expects.
pub fn mqtt_options(url: &str, options: &ConnectOptions) -> Result<MqttOptions, LinkError> {
    // rumqttc asserts on these instead of returning an error
    if options.client_id.is_empty() || options.client_id.starts_with(' ') {
        return Err(LinkError::Config(format!(
            "invalid client id {:?}",
            options.client_id
        )));
    }

    let parsed = Url::parse(url).map_err(|e| LinkError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let host = parsed
        .host_str()
        .ok_or_else(|| LinkError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })?
        .to_string();

    let mut mqtt = match parsed.scheme() {
        "mqtt" | "tcp" => {
            MqttOptions::new(&options.client_id, host, parsed.port().unwrap_or(1883))
        }
        "mqtts" | "ssl" => {
            let mut o = MqttOptions::new(&options.client_id, host, parsed.port().unwrap_or(8883));
            o.set_transport(Wire::tls_with_default_config());
            o
        }
        "ws" => {
            let port = parsed.port_or_known_default().unwrap_or(80);
            let mut o = MqttOptions::new(&options.client_id, url, port);
            o.set_transport(Wire::Ws);
            o
        }
        "wss" => {
            let port = parsed.port_or_known_default().unwrap_or(443);
            let mut o = MqttOptions::new(&options.client_id, url, port);
            o.set_transport(Wire::wss_with_default_config());
            o
        }
        other => return Err(LinkError::UnsupportedScheme(other.to_string())),
    };

    mqtt.set_keep_alive(options.keep_alive);
    mqtt.set_clean_session(options.clean_session);
    if let Some((user, pass)) = &options.credentials {
        mqtt.set_credentials(user, pass);
    }
    Ok(mqtt)
}
