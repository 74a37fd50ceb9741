use boat_link::{Outbound, TelemetrySnapshot, UiEvent};
use boat_protocol::ConnectionState;
use std::fmt::Write;

/// Console-side mirror of what the link actor reported.
#[derive(Debug, Default)]
pub struct Dashboard {
    state: ConnectionState,
    telemetry: TelemetrySnapshot,
    last_sent: Option<Outbound>,
}

impl Dashboard {
    /// Folds an event into the mirror and returns the line to print for it.
    pub fn apply(&mut self, event: UiEvent) -> String {
        match event {
            UiEvent::Status(state) => {
                self.state = state;
                format!("link: {state}")
            }
            UiEvent::Telemetry(update) => {
                self.telemetry.apply(&update);
                format!("{} = {}", update.key, update.value)
            }
            UiEvent::Sent(out) => {
                let line = format!("sent {} {:?}", out.topic, out.payload);
                self.last_sent = Some(out);
                line
            }
            UiEvent::Rejected(reason) => format!("rejected: {reason}"),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("link: {}\n", self.state);
        if let Some(status) = self.telemetry.get("status") {
            let _ = writeln!(out, "boat: {status}");
        }
        let _ = writeln!(out, "heading: {:.0}", self.telemetry.heading());

        let mut readings: Vec<(&str, &str)> = self
            .telemetry
            .iter()
            .filter(|(k, _)| !matches!(*k, "status" | "heading"))
            .collect();
        readings.sort_unstable();
        for (key, _) in readings {
            let _ = writeln!(out, "{key}: {}", self.telemetry.numeric(key));
        }

        match &self.last_sent {
            Some(sent) => {
                let _ = write!(out, "last sent: {} {:?}", sent.topic, sent.payload);
            }
            None => out.push_str("last sent: -"),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boat_link::TelemetryUpdate;

    fn reading(key: &str, value: &str) -> UiEvent {
        UiEvent::Telemetry(TelemetryUpdate {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    #[test]
    fn events_print_one_line_each() {
        let mut d = Dashboard::default();
        assert_eq!(
            d.apply(UiEvent::Status(ConnectionState::Connected)),
            "link: connected"
        );
        assert_eq!(d.apply(reading("heading", "90")), "heading = 90");
        assert_eq!(
            d.apply(UiEvent::Rejected("no boat identity set".to_string())),
            "rejected: no boat identity set"
        );
    }

    #[test]
    fn render_shows_mirror() {
        let mut d = Dashboard::default();
        d.apply(UiEvent::Status(ConnectionState::Connected));
        d.apply(reading("status", "Online"));
        d.apply(reading("heading", "-10"));
        d.apply(reading("potentiometer", "junk"));
        d.apply(UiEvent::Sent(Outbound {
            topic: "ns/boat/b/actuators/rudder".to_string(),
            payload: "15".to_string(),
        }));

        assert_eq!(
            d.render(),
            "link: connected\nboat: Online\nheading: 350\npotentiometer: 0\nlast sent: ns/boat/b/actuators/rudder \"15\""
        );
    }
}
