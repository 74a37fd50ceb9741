pub mod actor;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod mqtt;
pub mod router;
pub mod session;
pub mod transport;
pub mod ui;

pub use actor::{spawn, LinkHandle};
pub use config::{ConnectOptions, ConnectOverrides, LinkConfig};
pub use connection::{transition, ConnectionManager, LinkEvent};
pub use dispatcher::{format_display_text, AngleControl, ControlPhase, Dispatcher, Intent, Outbound};
pub use error::{DispatchError, LinkError};
pub use mqtt::MqttTransport;
pub use router::{TelemetryRouter, TelemetrySnapshot, TelemetryUpdate};
pub use session::{SendOutcome, Session};
pub use transport::{Delivery, Transport, TransportEvent};
pub use ui::{UiCommand, UiEvent};
