//! Control message envelope
//!
//! Every component owns one inbound channel. Messages are addressed to a
//! [`Destination`]; consumers keep only what [`ControlMessage::is_mine`]
//! accepts, and the transport copies `Broadcast` messages into every inbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Addressable components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Every registered component
    Broadcast,
    Main,
    SensorIo,
    Console,
    Display,
    DataLogger,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Destination::Broadcast => "broadcast",
            Destination::Main => "main",
            Destination::SensorIo => "sensor_io",
            Destination::Console => "console",
            Destination::Display => "display",
            Destination::DataLogger => "data_logger",
        };
        f.write_str(name)
    }
}

/// Command codes carried on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    ToggleDemo,
    ResetLink,
    ToggleRecording,
    Shutdown,
    /// Status report, see [`StatusReport`]
    Status,
}

impl Command {
    /// Default routing used when a message is built without an explicit destination
    pub fn default_destination(self) -> Destination {
        match self {
            Command::ToggleDemo | Command::ResetLink => Destination::SensorIo,
            Command::ToggleRecording => Destination::DataLogger,
            Command::Shutdown => Destination::Broadcast,
            Command::Status => Destination::Display,
        }
    }
}

/// Press-length classification of the input that produced a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressDuration {
    #[default]
    Short,
    Medium,
    Long,
}

/// Which subsystem a status report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    EcuLink,
    WidebandLink,
    DemoMode,
    Logger,
}

/// Heartbeat / confirmation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub kind: StatusKind,
    /// Link connected, demo enabled, or logger recording
    pub ok: bool,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<f64>,
}

impl StatusReport {
    pub fn new(kind: StatusKind, ok: bool, description: impl Into<String>) -> Self {
        Self {
            kind,
            ok,
            description: description.into(),
            file_name: None,
            file_size_mb: None,
        }
    }
}

/// Opaque payload attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Status(StatusReport),
    Text { text: String },
}

/// Addressed, immutable control envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    created_at: DateTime<Utc>,
    command: Command,
    duration: Option<PressDuration>,
    destination: Destination,
    payload: Option<Payload>,
}

impl ControlMessage {
    /// Build a message routed by the default command table
    pub fn new(command: Command) -> Self {
        Self {
            created_at: Utc::now(),
            command,
            duration: None,
            destination: command.default_destination(),
            payload: None,
        }
    }

    /// Build a status message for the display consumers
    pub fn status(report: StatusReport) -> Self {
        Self::new(Command::Status).with_payload(Payload::Status(report))
    }

    /// Override the default destination
    pub fn to(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_duration(mut self, duration: PressDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Attach the payload. A payload can only be set once.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        if self.payload.is_some() {
            warn!(command = ?self.command, "Payload already set, ignoring replacement");
            return self;
        }
        self.payload = Some(payload);
        self
    }

    /// True when `recipient` should act on this message
    pub fn is_mine(&self, recipient: Destination) -> bool {
        self.destination == recipient || self.destination == Destination::Broadcast
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn duration(&self) -> Option<PressDuration> {
        self.duration
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn status_report(&self) -> Option<&StatusReport> {
        match &self.payload {
            Some(Payload::Status(report)) => Some(report),
            _ => None,
        }
    }
}
