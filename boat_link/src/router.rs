use boat_protocol::{last_segment, InboundMessage};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    values: HashMap<String, String>,
}

impl TelemetrySnapshot {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Missing or unparseable readings are zero.
    pub fn numeric(&self, key: &str) -> f64 {
        self.get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    pub fn heading(&self) -> f64 {
        self.numeric("heading").rem_euclid(360.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn apply(&mut self, update: &TelemetryUpdate) {
        self.values.insert(update.key.clone(), update.value.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryUpdate {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct TelemetryRouter {
    snapshot: TelemetrySnapshot,
}

impl TelemetryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn route(&mut self, msg: &InboundMessage) -> Option<TelemetryUpdate> {
        let Some(key) = last_segment(&msg.topic) else {
            debug!(topic = %msg.topic, "message without key segment dropped");
            return None;
        };
        debug!(%key, payload = %msg.payload, "telemetry");
        let update = TelemetryUpdate {
            key: key.to_string(),
            value: msg.payload.clone(),
        };
        self.snapshot.apply(&update);
        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(topic: &str, payload: &str) -> InboundMessage {
        InboundMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn last_segment_becomes_key_and_others_stay() {
        let mut router = TelemetryRouter::new();
        router.route(&msg("bzh/iot/boat/b/sensors/potentiometer", "40"));
        let before = router.snapshot().clone();

        let update = router.route(&msg("bzh/iot/boat/b/sensors/heading", "271"));
        assert_eq!(
            update,
            Some(TelemetryUpdate {
                key: "heading".to_string(),
                value: "271".to_string()
            })
        );
        assert_eq!(router.snapshot().get("heading"), Some("271"));
        assert_eq!(
            router.snapshot().get("potentiometer"),
            before.get("potentiometer")
        );
        assert_eq!(router.snapshot().len(), 2);
    }

    #[test]
    fn later_values_overwrite() {
        let mut router = TelemetryRouter::new();
        router.route(&msg("x/status", "Online"));
        router.route(&msg("x/status", "Offline"));
        assert_eq!(router.snapshot().get("status"), Some("Offline"));
        assert_eq!(router.snapshot().len(), 1);
    }

    #[test]
    fn topic_without_segment_is_ignored() {
        let mut router = TelemetryRouter::new();
        assert_eq!(router.route(&msg("x/sensors/", "1")), None);
        assert!(router.snapshot().is_empty());
    }

    #[test]
    fn numeric_view_defaults_to_zero() {
        let mut router = TelemetryRouter::new();
        router.route(&msg("x/sensors/potentiometer", "not a number"));
        router.route(&msg("x/sensors/heading", "-90"));
        let snap = router.snapshot();
        assert_eq!(snap.numeric("potentiometer"), 0.0);
        assert_eq!(snap.numeric("missing"), 0.0);
        assert_eq!(snap.numeric("heading"), -90.0);
        assert_eq!(snap.heading(), 270.0);
    }
}
