// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Coordinate-system transforms.
//!
//! Every move command carries its payload in one of three coordinate
//! systems; motion is always issued in absolute cartesian coordinates.
//! Resolution is a pure function of (system, payload, current position):
//!
//! - `cartesian_abs`: payload used directly
//! - `cartesian_rel`: payload added to the current position
//! - `polar`: (r, theta in degrees, z) -> (r*cos, r*sin, z)

use std::fmt;
use std::str::FromStr;

/// Absolute cartesian position, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X={:.2} Y={:.2} Z={:.2}", self.x, self.y, self.z)
    }
}

/// Input coordinate system of a move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// Absolute cartesian target (x, y, z)
    CartesianAbs,
    /// Delta relative to the current position (dx, dy, dz)
    CartesianRel,
    /// Polar in the XY plane (r, theta in degrees), z passed through
    Polar,
}

impl CoordinateSystem {
    /// Wire name of this coordinate system.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CartesianAbs => "cartesian_abs",
            Self::CartesianRel => "cartesian_rel",
            Self::Polar => "polar",
        }
    }

    /// Resolve a payload in this system to an absolute target.
    ///
    /// `current` is only consulted for relative moves; it must be the
    /// position read at the moment of the call.
    pub fn resolve(&self, a: f64, b: f64, z: f64, current: Position) -> Position {
        match self {
            Self::CartesianAbs => Position::new(a, b, z),
            Self::CartesianRel => {
                Position::new(current.x + a, current.y + b, current.z + z)
            }
            Self::Polar => {
                let theta_rad = b.to_radians();
                Position::new(a * theta_rad.cos(), a * theta_rad.sin(), z)
            }
        }
    }
}

impl FromStr for CoordinateSystem {
    type Err = UnknownCoordinateSystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cartesian_abs" => Ok(Self::CartesianAbs),
            "cartesian_rel" => Ok(Self::CartesianRel),
            "polar" => Ok(Self::Polar),
            other => Err(UnknownCoordinateSystem(other.to_string())),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a coordinate-system name outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCoordinateSystem(pub String);

impl fmt::Display for UnknownCoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown coordinate system: {}", self.0)
    }
}

impl std::error::Error for UnknownCoordinateSystem {}

// ============================================================================
// Tests
// ============================================================================
