use boat_protocol::{ConnectionState, InboundMessage};
use tracing::{debug, error, info, warn};

use crate::config::ConnectOptions;
use crate::transport::{Delivery, Transport, TransportEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    StatusChanged(ConnectionState),
    Message(InboundMessage),
}

type Observer = Box<dyn FnMut(&LinkEvent) + Send>;

pub fn transition(current: ConnectionState, event: &TransportEvent) -> ConnectionState {
    match event {
        TransportEvent::Connected => ConnectionState::Connected,
        TransportEvent::Error(_) => ConnectionState::Error,
        TransportEvent::Closed => ConnectionState::Disconnected,
        TransportEvent::Message(_) => current,
    }
}

pub struct ConnectionManager<T: Transport> {
    transport: T,
    state: ConnectionState,
    handle_open: bool,
    last_message: Option<InboundMessage>,
    observers: Vec<Observer>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            handle_open: false,
            last_message: None,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_message(&self) -> Option<&InboundMessage> {
        self.last_message.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn observe(&mut self, observer: impl FnMut(&LinkEvent) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn connect(&mut self, url: &str, options: ConnectOptions) -> bool {
        if self.state == ConnectionState::Connecting {
            info!(%url, "connect ignored: already connecting");
            return false;
        }
        if self.handle_open && self.transport.is_connected() {
            info!(%url, "connect ignored: already connected");
            return false;
        }

        self.set_state(ConnectionState::Connecting);
        match self.transport.open(url, &options) {
            Ok(()) => {
                self.handle_open = true;
                true
            }
            Err(e) => {
                error!(%url, error = %e, "failed to open transport");
                self.set_state(ConnectionState::Error);
                false
            }
        }
    }

    pub fn disconnect(&mut self) {
        if !self.handle_open {
            return;
        }
        info!("manual disconnect");
        self.transport.close();
        self.handle_open = false;
        self.set_state(ConnectionState::Disconnected);
    }

    pub fn publish(&mut self, topic: &str, payload: &str) -> bool {
        if !self.state.is_connected() {
            warn!(%topic, state = %self.state, "not connected, publish dropped");
            return false;
        }
        match self.transport.publish(topic, payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(%topic, error = %e, "publish dropped");
                false
            }
        }
    }

    pub fn subscribe(&mut self, topic: &str) -> bool {
        if !self.state.is_connected() {
            warn!(%topic, state = %self.state, "not connected, subscribe dropped");
            return false;
        }
        match self.transport.subscribe(topic) {
            Ok(()) => true,
            Err(e) => {
                warn!(%topic, error = %e, "subscribe dropped");
                false
            }
        }
    }

    pub fn unsubscribe(&mut self, topic: &str) -> bool {
        if !self.state.is_connected() {
            warn!(%topic, state = %self.state, "not connected, unsubscribe dropped");
            return false;
        }
        match self.transport.unsubscribe(topic) {
            Ok(()) => true,
            Err(e) => {
                warn!(%topic, error = %e, "unsubscribe dropped");
                false
            }
        }
    }

    pub fn handle_delivery(&mut self, delivery: Delivery) -> Option<LinkEvent> {
        let current = self.transport.generation();
        if delivery.generation != current {
            debug!(
                generation = delivery.generation,
                current,
                event = ?delivery.event,
                "event from replaced transport ignored"
            );
            return None;
        }
        self.handle_event(delivery.event)
    }

    pub fn handle_event(&mut self, event: TransportEvent) -> Option<LinkEvent> {
        if !self.handle_open {
            debug!(?event, "event from closed transport ignored");
            return None;
        }

        match event {
            TransportEvent::Message(msg) => {
                self.last_message = Some(msg.clone());
                let event = LinkEvent::Message(msg);
                self.notify(&event);
                Some(event)
            }
            other => {
                if let TransportEvent::Error(e) = &other {
                    error!(error = %e, "transport error");
                }
                let next = transition(self.state, &other);
                if self.set_state(next) {
                    Some(LinkEvent::StatusChanged(next))
                } else {
                    None
                }
            }
        }
    }

    fn set_state(&mut self, next: ConnectionState) -> bool {
        if self.state == next {
            return false;
        }
        info!(from = %self.state, to = %next, "connection state");
        self.state = next;
        self.notify(&LinkEvent::StatusChanged(next));
        true
    }

    fn notify(&mut self, event: &LinkEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        if self.handle_open {
            self.transport.close();
        }
    }
}
