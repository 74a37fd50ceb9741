use boat_protocol::{DisplayWidth, SailRig};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::LinkError;

pub const DEFAULT_BROKER_URL: &str = "wss://mqtt.dev.icam.school:443/mqtt";
pub const DEFAULT_NAMESPACE: &str = "bzh/iot";
pub const DEFAULT_THROTTLE_MS: u64 = 100;

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);
const DEFAULT_RECONNECT_PERIOD: Duration = Duration::from_millis(1000);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub client_id: String,
    pub keep_alive: Duration,
    pub clean_session: bool,
    /// Delay before the transport retries after losing or failing a connection.
    pub reconnect_period: Duration,
    pub connect_timeout: Duration,
    pub credentials: Option<(String, String)>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            client_id: random_client_id(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            clean_session: true,
            reconnect_period: DEFAULT_RECONNECT_PERIOD,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            credentials: None,
        }
    }
}

impl ConnectOptions {
    pub fn with_overrides(mut self, overrides: &ConnectOverrides) -> Self {
        if let Some(id) = overrides.client_id.as_deref() {
            self.client_id = id.to_string();
        }
        if let Some(secs) = overrides.keep_alive_secs {
            self.keep_alive = Duration::from_secs(secs);
        }
        if let Some(clean) = overrides.clean_session {
            self.clean_session = clean;
        }
        if let Some(ms) = overrides.reconnect_period_ms {
            self.reconnect_period = Duration::from_millis(ms);
        }
        if let Some(secs) = overrides.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let (Some(user), Some(pass)) = (&overrides.username, &overrides.password) {
            self.credentials = Some((user.clone(), pass.clone()));
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectOverrides {
    pub client_id: Option<String>,
    pub keep_alive_secs: Option<u64>,
    pub clean_session: Option<bool>,
    pub reconnect_period_ms: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub broker_url: String,
    pub namespace: String,
    /// Sensor names subscribed under `.../sensors/`.
    pub sensors: Vec<String>,
    pub display: DisplayWidth,
    pub sail_rig: SailRig,
    pub throttle_ms: u64,
    pub connect: ConnectOverrides,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            sensors: vec!["heading".to_string(), "potentiometer".to_string()],
            display: DisplayWidth::default(),
            sail_rig: SailRig::default(),
            throttle_ms: DEFAULT_THROTTLE_MS,
            connect: ConnectOverrides::default(),
        }
    }
}

impl LinkConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, LinkError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LinkError::Config(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| LinkError::Config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::default().with_overrides(&self.connect)
    }
}

pub fn random_client_id() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("boat-dash-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_settings() {
        let opts = ConnectOptions::default();
        assert_eq!(opts.keep_alive, Duration::from_secs(60));
        assert!(opts.clean_session);
        assert_eq!(opts.reconnect_period, Duration::from_millis(1000));
        assert_eq!(opts.connect_timeout, Duration::from_secs(30));
        assert!(opts.client_id.starts_with("boat-dash-"));
        assert_eq!(opts.client_id.len(), "boat-dash-".len() + 12);
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let overrides = ConnectOverrides {
            client_id: Some("fixed".to_string()),
            reconnect_period_ms: Some(250),
            username: Some("u".to_string()),
            ..Default::default()
        };
        let opts = ConnectOptions::default().with_overrides(&overrides);
        assert_eq!(opts.client_id, "fixed");
        assert_eq!(opts.reconnect_period, Duration::from_millis(250));
        assert_eq!(opts.keep_alive, Duration::from_secs(60));
        // password missing, so no credentials
        assert_eq!(opts.credentials, None);
    }

    #[test]
    fn partial_json_config_keeps_defaults() {
        let cfg: LinkConfig = serde_json::from_str(
            r#"{"namespace":"root","display":"narrow","sail_rig":"opening","connect":{"keep_alive_secs":5}}"#,
        )
        .unwrap();
        assert_eq!(cfg.namespace, "root");
        assert_eq!(cfg.broker_url, DEFAULT_BROKER_URL);
        assert_eq!(cfg.display, DisplayWidth::Narrow);
        assert_eq!(cfg.sail_rig, SailRig::Opening);
        assert_eq!(cfg.throttle_window(), Duration::from_millis(100));
        assert_eq!(cfg.connect_options().keep_alive, Duration::from_secs(5));
        assert_eq!(cfg.sensors, vec!["heading", "potentiometer"]);
    }
}
