use boat_protocol::{topic_for, ConnectionState, Identity, Role};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::connection::{ConnectionManager, LinkEvent};
use crate::dispatcher::{Dispatcher, Intent, Outbound};
use crate::error::DispatchError;
use crate::router::{TelemetryRouter, TelemetrySnapshot, TelemetryUpdate};
use crate::transport::{Delivery, Transport, TransportEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Published(Outbound),
    // armed or throttled, nothing left the dispatcher
    Held,
    Dropped(Outbound),
}

pub struct Session<T: Transport> {
    link: ConnectionManager<T>,
    router: TelemetryRouter,
    dispatcher: Dispatcher,
    config: LinkConfig,
    subscribed: Vec<String>,
    last_sent: Option<Outbound>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            link: ConnectionManager::new(transport),
            router: TelemetryRouter::new(),
            dispatcher: Dispatcher::from_config(&config),
            config,
            subscribed: Vec::new(),
            last_sent: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        self.router.snapshot()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.dispatcher.identity()
    }

    pub fn subscribed(&self) -> &[String] {
        &self.subscribed
    }

    pub fn last_sent(&self) -> Option<&Outbound> {
        self.last_sent.as_ref()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn link(&self) -> &ConnectionManager<T> {
        &self.link
    }

    pub fn observe(&mut self, observer: impl FnMut(&LinkEvent) + Send + 'static) {
        self.link.observe(observer);
    }

    pub fn connect(&mut self) -> bool {
        let options = self.config.connect_options();
        self.link.connect(&self.config.broker_url, options)
    }

    pub fn disconnect(&mut self) {
        self.link.disconnect();
        self.subscribed.clear();
    }

    pub fn login(&mut self, identity: Identity) {
        if self.dispatcher.identity() == Some(&identity) {
            return;
        }
        info!(boat = %identity, "boat identity set");
        self.dispatcher.set_identity(identity);

        if self.link.state().is_connected() {
            for topic in std::mem::take(&mut self.subscribed) {
                self.link.unsubscribe(&topic);
            }
            self.subscribe_all();
        }
    }

    pub fn topics(&self) -> Vec<String> {
        let Some(identity) = self.dispatcher.identity() else {
            return Vec::new();
        };
        let ns = &self.config.namespace;
        let mut topics = vec![topic_for(ns, identity, Role::Status)];
        topics.extend(
            self.config
                .sensors
                .iter()
                .map(|name| topic_for(ns, identity, Role::Sensor(name))),
        );
        topics
    }

    pub fn handle_delivery(&mut self, delivery: Delivery) -> Option<TelemetryUpdate> {
        let event = self.link.handle_delivery(delivery)?;
        self.apply(event)
    }

    pub fn handle_transport(&mut self, event: TransportEvent) -> Option<TelemetryUpdate> {
        let event = self.link.handle_event(event)?;
        self.apply(event)
    }

    fn apply(&mut self, event: LinkEvent) -> Option<TelemetryUpdate> {
        match event {
            LinkEvent::StatusChanged(ConnectionState::Connected) => {
                self.subscribe_all();
                None
            }
            LinkEvent::StatusChanged(_) => {
                self.subscribed.clear();
                None
            }
            LinkEvent::Message(msg) => self.router.route(&msg),
        }
    }

    pub fn send(&mut self, intent: Intent, now: Instant) -> Result<SendOutcome, DispatchError> {
        let Some(out) = self.dispatcher.dispatch(intent, now)? else {
            return Ok(SendOutcome::Held);
        };
        if self.link.publish(&out.topic, &out.payload) {
            self.last_sent = Some(out.clone());
            Ok(SendOutcome::Published(out))
        } else {
            Ok(SendOutcome::Dropped(out))
        }
    }

    fn subscribe_all(&mut self) {
        let topics = self.topics();
        if topics.is_empty() {
            debug!("connected without identity, nothing to subscribe");
            return;
        }
        self.subscribed = topics
            .into_iter()
            .filter(|topic| self.link.subscribe(topic))
            .collect();
        info!(count = self.subscribed.len(), "subscribed boat topics");
    }
}
