// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Typed commands and the response envelope.
//!
//! A frame payload is a JSON document with at least a `type` field.
//! Parsing inspects the tag before deserializing the per-type fields,
//! so an unknown `type` is reported distinctly from malformed JSON, and
//! a missing numeric field is reported distinctly from an explicit zero
//! (a JSON library defaulting absent fields to 0 must never actuate
//! hardware).
//!
//! # Wire shapes
//!
//! ```json
//! {"type":"move","coordinate_system":"cartesian_abs","data":{"x":10,"y":0,"z":5}}
//! {"type":"move","coordinate_system":"polar","data":{"r":100,"theta":45,"z":5}}
//! {"type":"pipet_control","data":{"pipet_level":2.5}}
//! {"type":"ping"}
//! {"type":"request","subject":"current_pos"}
//! {"type":"home"}
//! ```
//!
//! Responses are `{"status":"success"|"error","message":"..."}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::motion::{CoordinateSystem, Position};

/// A parsed command, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Coordinate move; `(a, b, z)` is `(x, y, z)` for cartesian
    /// systems and `(r, theta, z)` for polar.
    Move {
        system: CoordinateSystem,
        a: f64,
        b: f64,
        z: f64,
    },
    /// Set the pipet actuator level.
    PipetControl { level: f64 },
    /// Keep-alive; refreshes the session's activity timestamp.
    Ping,
    /// Query the current absolute position.
    PositionRequest,
    /// Reference move to the device origin.
    Home,
}

impl Command {
    /// Parse a frame payload into a command.
    ///
    /// Pure - no side effects on failure; every malformed input maps to
    /// exactly one [`CommandError`] variant.
    pub fn parse(payload: &[u8]) -> Result<Command, CommandError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|_| CommandError::Format)?;
        let obj = value.as_object().ok_or(CommandError::Format)?;

        let command_type = match obj.get("type").and_then(Value::as_str) {
            Some(t) => t,
            None => return Err(CommandError::UnknownCommandType(type_repr(obj.get("type")))),
        };

        match command_type {
            "move" => {
                let system = match obj.get("coordinate_system").and_then(Value::as_str) {
                    Some(name) => name
                        .parse::<CoordinateSystem>()
                        .map_err(|e| CommandError::UnknownCoordinateSystem(e.0))?,
                    None => return Err(CommandError::NoCoordinateSystem),
                };

                let data = obj
                    .get("data")
                    .and_then(Value::as_object)
                    .ok_or_else(|| CommandError::MissingField("data".into()))?;

                let (a, b) = match system {
                    CoordinateSystem::CartesianAbs | CoordinateSystem::CartesianRel => {
                        (number_field(data, "x")?, number_field(data, "y")?)
                    }
                    CoordinateSystem::Polar => {
                        (number_field(data, "r")?, number_field(data, "theta")?)
                    }
                };
                let z = number_field(data, "z")?;

                Ok(Command::Move { system, a, b, z })
            }

            "pipet_control" => {
                let data = obj
                    .get("data")
                    .and_then(Value::as_object)
                    .ok_or_else(|| CommandError::MissingField("data".into()))?;

                // Absence must be an error, never a default level
                let level = number_field(data, "pipet_level")?;
                Ok(Command::PipetControl { level })
            }

            "ping" => Ok(Command::Ping),

            "request" => match obj.get("subject").and_then(Value::as_str) {
                Some("current_pos") => Ok(Command::PositionRequest),
                Some(other) => Err(CommandError::UnknownRequestSubject(other.to_string())),
                None => Err(CommandError::NoRequestSubject),
            },

            "home" => Ok(Command::Home),

            other => Err(CommandError::UnknownCommandType(other.to_string())),
        }
    }
}

/// Extract a required numeric field from a command's `data` object.
fn number_field(
    data: &serde_json::Map<String, Value>,
    name: &str,
) -> Result<f64, CommandError> {
    data.get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| CommandError::MissingField(format!("data.{}", name)))
}

fn type_repr(value: Option<&Value>) -> String {
    match value {
        None => "<missing>".to_string(),
        Some(v) => v.to_string(),
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Per-message command faults. All recoverable: the session stays open
/// and the error is reported in the response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Payload failed to parse as a JSON object
    Format,
    /// Required field absent or of the wrong type
    MissingField(String),
    /// Move command without a `coordinate_system` field
    NoCoordinateSystem,
    /// `coordinate_system` outside the recognized set
    UnknownCoordinateSystem(String),
    /// `type` tag missing, non-string, or unrecognized
    UnknownCommandType(String),
    /// Resolved move target outside the safety envelope
    OutOfBounds(Position),
    /// Request command without a `subject` field
    NoRequestSubject,
    /// `subject` outside the recognized set
    UnknownRequestSubject(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => write!(f, "invalid command format"),
            Self::MissingField(name) => write!(f, "missing or invalid field: {}", name),
            Self::NoCoordinateSystem => write!(f, "no coordinate system specified"),
            Self::UnknownCoordinateSystem(name) => {
                write!(f, "invalid coordinate system: {}", name)
            }
            Self::UnknownCommandType(name) => write!(f, "unknown command: {}", name),
            Self::OutOfBounds(p) => write!(f, "position out of safe bounds: {}", p),
            Self::NoRequestSubject => write!(f, "no request subject specified"),
            Self::UnknownRequestSubject(name) => {
                write!(f, "unknown request subject: {}", name)
            }
        }
    }
}

impl std::error::Error for CommandError {}

// ============================================================================
// Response envelope
// ============================================================================

/// Outcome of a dispatched command, serialized as the response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: ResponseStatus,
    pub message: String,
}

/// Response status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

impl Response {
    /// Success envelope with a human-readable confirmation.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
        }
    }

    /// Error envelope naming the failure.
    pub fn error(err: &CommandError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: err.to_string(),
        }
    }

    /// Serialize to the wire payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| {
            // A String-only struct cannot fail to serialize; keep a
            // well-formed frame on the wire regardless
            br#"{"status":"error","message":"internal serialization failure"}"#.to_vec()
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_cartesian_abs() {
        let cmd = Command::parse(
            br#"{"type":"move","coordinate_system":"cartesian_abs","data":{"x":10.0,"y":-5.5,"z":3}}"#,
        )
        .unwrap();

        assert_eq!(
            cmd,
            Command::Move {
                system: CoordinateSystem::CartesianAbs,
                a: 10.0,
                b: -5.5,
                z: 3.0,
            }
        );
    }

    #[test]
    fn test_parse_move_polar_field_names() {
        let cmd = Command::parse(
            br#"{"type":"move","coordinate_system":"polar","data":{"r":100,"theta":45,"z":0}}"#,
        )
        .unwrap();

        assert_eq!(
            cmd,
            Command::Move {
                system: CoordinateSystem::Polar,
                a: 100.0,
                b: 45.0,
                z: 0.0,
            }
        );

        // Polar payloads use r/theta, not x/y
        let err = Command::parse(
            br#"{"type":"move","coordinate_system":"polar","data":{"x":100,"y":45,"z":0}}"#,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::MissingField("data.r".into()));
    }

    #[test]
    fn test_parse_move_without_coordinate_system() {
        let err =
            Command::parse(br#"{"type":"move","data":{"x":1,"y":2,"z":3}}"#).unwrap_err();
        assert_eq!(err, CommandError::NoCoordinateSystem);
    }

    #[test]
    fn test_parse_move_unknown_coordinate_system() {
        let err = Command::parse(
            br#"{"type":"move","coordinate_system":"spherical","data":{"x":1,"y":2,"z":3}}"#,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::UnknownCoordinateSystem("spherical".into()));
    }

    #[test]
    fn test_parse_move_missing_axis() {
        let err = Command::parse(
            br#"{"type":"move","coordinate_system":"cartesian_abs","data":{"x":1,"y":2}}"#,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::MissingField("data.z".into()));
    }

    #[test]
    fn test_parse_pipet_control() {
        let cmd =
            Command::parse(br#"{"type":"pipet_control","data":{"pipet_level":2.5}}"#).unwrap();
        assert_eq!(cmd, Command::PipetControl { level: 2.5 });

        // Explicit zero is a valid level
        let cmd =
            Command::parse(br#"{"type":"pipet_control","data":{"pipet_level":0}}"#).unwrap();
        assert_eq!(cmd, Command::PipetControl { level: 0.0 });
    }

    #[test]
    fn test_parse_pipet_control_missing_level() {
        // Absence must surface as an error, never a default of zero
        let err = Command::parse(br#"{"type":"pipet_control","data":{}}"#).unwrap_err();
        assert_eq!(err, CommandError::MissingField("data.pipet_level".into()));

        let err = Command::parse(br#"{"type":"pipet_control"}"#).unwrap_err();
        assert_eq!(err, CommandError::MissingField("data".into()));
    }

    #[test]
    fn test_parse_pipet_control_non_numeric_level() {
        let err = Command::parse(br#"{"type":"pipet_control","data":{"pipet_level":"high"}}"#)
            .unwrap_err();
        assert_eq!(err, CommandError::MissingField("data.pipet_level".into()));
    }

    #[test]
    fn test_parse_ping_and_home() {
        assert_eq!(Command::parse(br#"{"type":"ping"}"#).unwrap(), Command::Ping);
        assert_eq!(Command::parse(br#"{"type":"home"}"#).unwrap(), Command::Home);
    }

    #[test]
    fn test_parse_request() {
        assert_eq!(
            Command::parse(br#"{"type":"request","subject":"current_pos"}"#).unwrap(),
            Command::PositionRequest
        );

        let err = Command::parse(br#"{"type":"request"}"#).unwrap_err();
        assert_eq!(err, CommandError::NoRequestSubject);

        let err =
            Command::parse(br#"{"type":"request","subject":"temperature"}"#).unwrap_err();
        assert_eq!(err, CommandError::UnknownRequestSubject("temperature".into()));
    }

    #[test]
    fn test_parse_malformed_json() {
        assert_eq!(
            Command::parse(b"{not json").unwrap_err(),
            CommandError::Format
        );
        assert_eq!(Command::parse(b"[1,2,3]").unwrap_err(), CommandError::Format);
        assert_eq!(Command::parse(b"").unwrap_err(), CommandError::Format);
    }

    #[test]
    fn test_parse_unknown_or_malformed_type() {
        assert_eq!(
            Command::parse(br#"{"type":"dance"}"#).unwrap_err(),
            CommandError::UnknownCommandType("dance".into())
        );
        assert_eq!(
            Command::parse(br#"{"type":42}"#).unwrap_err(),
            CommandError::UnknownCommandType("42".into())
        );
        assert_eq!(
            Command::parse(br#"{"data":{}}"#).unwrap_err(),
            CommandError::UnknownCommandType("<missing>".into())
        );
    }

    #[test]
    fn test_response_envelope_roundtrip() {
        let resp = Response::success("pong");
        let bytes = resp.to_bytes();
        let parsed: Response = serde_json::from_slice(&bytes).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.message, "pong");

        let resp = Response::error(&CommandError::NoCoordinateSystem);
        let parsed: Response = serde_json::from_slice(&resp.to_bytes()).unwrap();
        assert!(!parsed.is_success());
        assert_eq!(parsed.message, "no coordinate system specified");
    }
}
