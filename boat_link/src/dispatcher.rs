use boat_protocol::{
    topic_for, Actuator, DisplayWidth, DriveCommand, Identity, Role, SailRig, ANGLE_MAX,
    ANGLE_MIN, DISPLAY_COLUMNS,
};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleControl {
    Rudder,
    Sail,
}

impl AngleControl {
    pub fn name(self) -> &'static str {
        match self {
            AngleControl::Rudder => "rudder",
            AngleControl::Sail => "sail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Angle { control: AngleControl, value: i32 },
    // slider drag: arms the control, nothing is published
    Adjust { control: AngleControl, value: i32 },
    Commit(AngleControl),
    Recenter(AngleControl),
    Drive { left: i32, right: i32 },
    EmergencyStop,
    Display(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPhase {
    Idle,
    Armed,
    Sent,
}

#[derive(Debug, Clone)]
pub struct Control<V> {
    value: V,
    armed: bool,
    last_sent: Option<Instant>,
    window: Duration,
}

impl<V: Copy> Control<V> {
    fn new(value: V, window: Duration) -> Self {
        Self {
            value,
            armed: false,
            last_sent: None,
            window,
        }
    }

    pub fn value(&self) -> V {
        self.value
    }

    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// `Sent` lasts for one throttle window after a publish, then decays to `Idle`.
    pub fn phase(&self, now: Instant) -> ControlPhase {
        if self.armed {
            ControlPhase::Armed
        } else if self.last_sent.is_some() && !self.window_open(now) {
            ControlPhase::Sent
        } else {
            ControlPhase::Idle
        }
    }

    fn window_open(&self, now: Instant) -> bool {
        match self.last_sent {
            None => true,
            Some(at) => now.saturating_duration_since(at) > self.window,
        }
    }

    fn arm(&mut self, value: V) {
        self.value = value;
        self.armed = true;
    }

    fn mark_sent(&mut self, now: Instant) {
        self.armed = false;
        self.last_sent = Some(now);
    }
}

pub struct Dispatcher {
    namespace: String,
    identity: Option<Identity>,
    display: DisplayWidth,
    sail_rig: SailRig,
    rudder: Control<i32>,
    sail: Control<i32>,
    drive: Control<DriveCommand>,
}

impl Dispatcher {
    pub fn new(
        namespace: impl Into<String>,
        display: DisplayWidth,
        sail_rig: SailRig,
        throttle_window: Duration,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            identity: None,
            display,
            sail_rig,
            rudder: Control::new(0, throttle_window),
            sail: Control::new(0, throttle_window),
            drive: Control::new(DriveCommand::STOP, throttle_window),
        }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(
            config.namespace.clone(),
            config.display,
            config.sail_rig,
            config.throttle_window(),
        )
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub fn control(&self, control: AngleControl) -> &Control<i32> {
        match control {
            AngleControl::Rudder => &self.rudder,
            AngleControl::Sail => &self.sail,
        }
    }

    pub fn drive(&self) -> &Control<DriveCommand> {
        &self.drive
    }

    pub fn dispatch(
        &mut self,
        intent: Intent,
        now: Instant,
    ) -> Result<Option<Outbound>, DispatchError> {
        let identity = self.identity.clone().ok_or(DispatchError::NoIdentity)?;

        match intent {
            Intent::Angle { control, value } => {
                let value = self.clamp(control, value);
                self.control_mut(control).arm(value);
                Ok(Some(self.send_angle(&identity, control, now)))
            }
            Intent::Adjust { control, value } => {
                let value = self.clamp(control, value);
                self.control_mut(control).arm(value);
                Ok(None)
            }
            Intent::Commit(control) => {
                if !self.control(control).armed {
                    return Err(DispatchError::NothingArmed(control.name()));
                }
                Ok(Some(self.send_angle(&identity, control, now)))
            }
            Intent::Recenter(control) => {
                let value = self.clamp(control, 0);
                self.control_mut(control).arm(value);
                Ok(Some(self.send_angle(&identity, control, now)))
            }
            Intent::Drive { left, right } => {
                self.drive.arm(DriveCommand::new(left, right));
                if !self.drive.window_open(now) {
                    debug!(left, right, "drive intent coalesced");
                    return Ok(None);
                }
                self.send_drive(&identity, now).map(Some)
            }
            Intent::EmergencyStop => {
                self.drive.arm(DriveCommand::STOP);
                self.send_drive(&identity, now).map(Some)
            }
            Intent::Display(text) => {
                let payload = format_display_text(&text, self.display)?;
                Ok(Some(Outbound {
                    topic: self.topic(&identity, Role::Actuator(Actuator::Display)),
                    payload,
                }))
            }
        }
    }

    fn send_angle(&mut self, identity: &Identity, control: AngleControl, now: Instant) -> Outbound {
        let actuator = match control {
            AngleControl::Rudder => Actuator::Rudder,
            AngleControl::Sail => Actuator::Sail,
        };
        let topic = self.topic(identity, Role::Actuator(actuator));
        let state = self.control_mut(control);
        state.mark_sent(now);
        Outbound {
            topic,
            payload: state.value().to_string(),
        }
    }

    fn send_drive(&mut self, identity: &Identity, now: Instant) -> Result<Outbound, DispatchError> {
        let payload = serde_json::to_string(&self.drive.value())?;
        self.drive.mark_sent(now);
        Ok(Outbound {
            topic: self.topic(identity, Role::Command),
            payload,
        })
    }

    fn clamp(&self, control: AngleControl, value: i32) -> i32 {
        let (min, max) = match control {
            AngleControl::Rudder => (ANGLE_MIN, ANGLE_MAX),
            AngleControl::Sail => self.sail_rig.range(),
        };
        value.clamp(min, max)
    }

    fn control_mut(&mut self, control: AngleControl) -> &mut Control<i32> {
        match control {
            AngleControl::Rudder => &mut self.rudder,
            AngleControl::Sail => &mut self.sail,
        }
    }

    fn topic(&self, identity: &Identity, role: Role<'_>) -> String {
        topic_for(&self.namespace, identity, role)
    }
}

/// Limits display text to the configured width and splits anything longer than
/// one display line into two fixed-width lines.
pub fn format_display_text(text: &str, width: DisplayWidth) -> Result<String, DispatchError> {
    if text.is_empty() {
        return Err(DispatchError::EmptyDisplayText);
    }

    let limited: String = text.chars().take(width.max_chars()).collect();
    if limited.chars().count() <= DISPLAY_COLUMNS || limited.contains('\n') {
        return Ok(limited);
    }

    let split = limited
        .char_indices()
        .nth(DISPLAY_COLUMNS)
        .map(|(i, _)| i)
        .unwrap_or(limited.len());
    let (first, rest) = limited.split_at(split);
    Ok(format!("{first}\n{rest}"))
}
