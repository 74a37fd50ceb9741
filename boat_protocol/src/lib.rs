use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const ANGLE_MIN: i32 = -90;
pub const ANGLE_MAX: i32 = 90;
pub const OPENING_MIN: i32 = 0;
pub const OPENING_MAX: i32 = 100;
pub const WHEEL_SPEED_MAX: i32 = 65_535;

/// Columns per line on the boat's two-line character display.
pub const DISPLAY_COLUMNS: usize = 16;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }

    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined differential-drive command published on `.../cmd`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriveCommand {
    pub left_speed: i32,
    pub right_speed: i32,
}

impl DriveCommand {
    pub const STOP: DriveCommand = DriveCommand {
        left_speed: 0,
        right_speed: 0,
    };

    /// Builds a command with both wheels clamped to the firmware range.
    pub fn new(left_speed: i32, right_speed: i32) -> Self {
        Self {
            left_speed: left_speed.clamp(-WHEEL_SPEED_MAX, WHEEL_SPEED_MAX),
            right_speed: right_speed.clamp(-WHEEL_SPEED_MAX, WHEEL_SPEED_MAX),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Rudder,
    Sail,
    Display,
}

impl Actuator {
    pub fn name(self) -> &'static str {
        match self {
            Actuator::Rudder => "rudder",
            Actuator::Sail => "sail",
            Actuator::Display => "display",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role<'a> {
    Status,
    Sensor(&'a str),
    Actuator(Actuator),
    Command,
}

/// How the sail actuator on a given hull interprets its payload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SailRig {
    /// Servo angle in degrees, [-90, 90].
    #[default]
    Angle,
    /// Open/closed percentage, [0, 100].
    Opening,
}

impl SailRig {
    pub fn range(self) -> (i32, i32) {
        match self {
            SailRig::Angle => (ANGLE_MIN, ANGLE_MAX),
            SailRig::Opening => (OPENING_MIN, OPENING_MAX),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayWidth {
    /// One 16 character payload.
    Narrow,
    /// Two 16 character lines.
    #[default]
    Wide,
}

impl DisplayWidth {
    pub fn max_chars(self) -> usize {
        match self {
            DisplayWidth::Narrow => DISPLAY_COLUMNS,
            DisplayWidth::Wide => DISPLAY_COLUMNS * 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("boat identity is empty")]
    Empty,
    #[error("boat identity contains forbidden character {0:?}")]
    ForbiddenChar(char),
}

/// Boat identifier, one topic path segment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        if let Some(c) = id.chars().find(|c| matches!(c, '/' | '+' | '#')) {
            return Err(IdentityError::ForbiddenChar(c));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn topic_for(namespace: &str, identity: &Identity, role: Role<'_>) -> String {
    let base = format!("{}/boat/{}", namespace.trim_end_matches('/'), identity);
    match role {
        Role::Status => format!("{base}/status"),
        Role::Sensor(name) => format!("{base}/sensors/{name}"),
        Role::Actuator(actuator) => format!("{base}/actuators/{}", actuator.name()),
        Role::Command => format!("{base}/cmd"),
    }
}

/// Final path segment of a topic, `None` when it is empty.
pub fn last_segment(topic: &str) -> Option<&str> {
    topic.rsplit('/').next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boat() -> Identity {
        Identity::parse("monBateau").unwrap()
    }

    #[test]
    fn topics_follow_namespace_convention() {
        let id = boat();
        assert_eq!(topic_for("bzh/iot", &id, Role::Status), "bzh/iot/boat/monBateau/status");
        assert_eq!(
            topic_for("bzh/iot/", &id, Role::Sensor("heading")),
            "bzh/iot/boat/monBateau/sensors/heading"
        );
        assert_eq!(
            topic_for("bzh/iot", &id, Role::Actuator(Actuator::Display)),
            "bzh/iot/boat/monBateau/actuators/display"
        );
        assert_eq!(topic_for("root", &id, Role::Command), "root/boat/monBateau/cmd");
    }

    #[test]
    fn identity_is_trimmed_and_validated() {
        assert_eq!(Identity::parse("  b1 ").unwrap().as_str(), "b1");
        assert_eq!(Identity::parse("   "), Err(IdentityError::Empty));
        assert_eq!(Identity::parse("a/b"), Err(IdentityError::ForbiddenChar('/')));
        assert_eq!(Identity::parse("a#"), Err(IdentityError::ForbiddenChar('#')));
        assert!(serde_json::from_str::<Identity>("\"x+y\"").is_err());
    }

    #[test]
    fn drive_command_wire_format() {
        let json = serde_json::to_string(&DriveCommand::STOP).unwrap();
        assert_eq!(json, r#"{"leftSpeed":0,"rightSpeed":0}"#);

        let parsed: DriveCommand =
            serde_json::from_str(r#"{"leftSpeed":-1200,"rightSpeed":65535}"#).unwrap();
        assert_eq!(parsed, DriveCommand::new(-1200, 65535));
    }

    #[test]
    fn drive_command_clamps_wheels() {
        let cmd = DriveCommand::new(70_000, -70_000);
        assert_eq!(cmd.left_speed, WHEEL_SPEED_MAX);
        assert_eq!(cmd.right_speed, -WHEEL_SPEED_MAX);
    }

    #[test]
    fn last_segment_extracts_key() {
        assert_eq!(last_segment("bzh/iot/boat/b/sensors/heading"), Some("heading"));
        assert_eq!(last_segment("status"), Some("status"));
        assert_eq!(last_segment("a/b/"), None);
        assert_eq!(last_segment(""), None);
    }

    #[test]
    fn connection_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Connecting).unwrap(),
            "\"connecting\""
        );
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(DisplayWidth::Narrow.max_chars(), 16);
        assert_eq!(DisplayWidth::Wide.max_chars(), 32);
        assert_eq!(SailRig::Opening.range(), (0, 100));
    }
}
