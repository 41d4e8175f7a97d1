// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Safety envelope for motion targets.
//!
//! Every move is checked against the configured bounds *after* the
//! target has been resolved to absolute cartesian coordinates - raw
//! relative or polar input is never bounds-checked directly.

use serde::{Deserialize, Serialize};

use super::transform::Position;

/// Axis-aligned safe operating envelope, inclusive on all six limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default = "default_min_xy")]
    pub min_x: f64,
    #[serde(default = "default_max_xy")]
    pub max_x: f64,
    #[serde(default = "default_min_xy")]
    pub min_y: f64,
    #[serde(default = "default_max_xy")]
    pub max_y: f64,
    #[serde(default)]
    pub min_z: f64,
    #[serde(default = "default_max_z")]
    pub max_z: f64,
}

fn default_min_xy() -> f64 {
    -300.0
}

fn default_max_xy() -> f64 {
    300.0
}

fn default_max_z() -> f64 {
    200.0
}

impl Default for Bounds {
    /// Default envelope of the reference gantry:
    /// x, y in [-300, 300] mm, z in [0, 200] mm.
    fn default() -> Self {
        Self {
            min_x: default_min_xy(),
            max_x: default_max_xy(),
            min_y: default_min_xy(),
            max_y: default_max_xy(),
            min_z: 0.0,
            max_z: default_max_z(),
        }
    }
}

impl Bounds {
    /// Check whether a resolved absolute target lies inside the envelope.
    pub fn is_safe(&self, p: &Position) -> bool {
        self.min_x <= p.x
            && p.x <= self.max_x
            && self.min_y <= p.y
            && p.y <= self.max_y
            && self.min_z <= p.z
            && p.z <= self.max_z
    }

    /// Validate that the envelope is well-formed (min <= max per axis).
    pub fn validate(&self) -> Result<(), String> {
        if self.min_x > self.max_x {
            return Err(format!("min_x {} > max_x {}", self.min_x, self.max_x));
        }
        if self.min_y > self.max_y {
            return Err(format!("min_y {} > max_y {}", self.min_y, self.max_y));
        }
        if self.min_z > self.max_z {
            return Err(format!("min_z {} > max_z {}", self.min_z, self.max_z));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
