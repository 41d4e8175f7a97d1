// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Robot actuation seam.
//!
//! The protocol engine never talks to hardware directly: motion,
//! pipetting, and position readback go through this trait. Production
//! wires in a motor-driver implementation; tests wire in a recording
//! mock. The engine guarantees at most one actuator call per command,
//! issued only after validation (and, for moves, the safety gate)
//! passes.

use crate::motion::Position;

/// Capability interface consumed by the command dispatcher.
///
/// Implementations are not required to be reentrant: the engine is
/// single-threaded and never issues overlapping calls.
pub trait Robot {
    /// Current absolute position. Reflects completed motion; a
    /// `move_to` becomes visible here once the hardware has acted on it.
    fn current_position(&self) -> Position;

    /// Drive the gantry to an absolute target. The target has already
    /// passed the safety gate.
    fn move_to(&mut self, target: Position);

    /// Drive the pipet actuator to a level (ml).
    fn set_pipet_level(&mut self, level: f64);

    /// Reference move to the device origin.
    fn home(&mut self) {
        self.move_to(Position::ORIGIN);
    }
}

/// Stand-in robot used until a motor driver is wired in: tracks the
/// commanded state and logs every actuation.
#[derive(Debug, Default)]
pub struct StubRobot {
    position: Position,
    pipet_level: f64,
}

impl StubRobot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub starting at a fixed position (the bench rig parks at
    /// (10, 10, 10) after power-on).
    pub fn parked() -> Self {
        Self {
            position: Position::new(10.0, 10.0, 10.0),
            pipet_level: 0.0,
        }
    }

    pub fn pipet_level(&self) -> f64 {
        self.pipet_level
    }
}

impl Robot for StubRobot {
    fn current_position(&self) -> Position {
        self.position
    }

    fn move_to(&mut self, target: Position) {
        log::info!("[ROBOT] moving to {}", target);
        self.position = target;
    }

    fn set_pipet_level(&mut self, level: f64) {
        log::info!("[ROBOT] pipet level set to {}", level);
        self.pipet_level = level;
    }
}

// ============================================================================
// Tests
// ============================================================================
