use boat_protocol::{ConnectionState, Identity};

use crate::dispatcher::{Intent, Outbound};
use crate::router::TelemetryUpdate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Connect,
    Disconnect,
    Login(Identity),
    Send(Intent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Status(ConnectionState),
    Telemetry(TelemetryUpdate),
    Sent(Outbound),
    Rejected(String),
}
