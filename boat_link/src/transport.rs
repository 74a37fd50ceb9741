use boat_protocol::InboundMessage;

use crate::config::ConnectOptions;
use crate::error::LinkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Error(String),
    Closed,
    Message(InboundMessage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub generation: u64,
    pub event: TransportEvent,
}

/// Requests are fire-and-forget: `Ok` means the request was handed over, not
/// that the broker acknowledged it. Events arrive out of band as [`Delivery`]
/// values stamped with the generation current when they were produced.
pub trait Transport {
    fn open(&mut self, url: &str, options: &ConnectOptions) -> Result<(), LinkError>;
    fn generation(&self) -> u64;
    fn is_connected(&self) -> bool;
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError>;
    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError>;
    fn unsubscribe(&mut self, topic: &str) -> Result<(), LinkError>;
    fn close(&mut self);
}
