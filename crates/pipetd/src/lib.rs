// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! # pipetd - Networked motion-control endpoint for a pipetting robot
//!
//! A single-threaded TCP server that accepts framed JSON commands,
//! validates them against a safety envelope, and drives a robot
//! actuator through a pluggable trait. Built for a bench-top pipetting
//! gantry, but the protocol engine is hardware-agnostic.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipetd::config::ServerConfig;
//! use pipetd::robot::StubRobot;
//! use pipetd::server::RobotServer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let mut server = RobotServer::new(config, Box::new(StubRobot::parked()))?;
//!
//!     let shutdown = server.shutdown_handle();
//!     ctrlc::set_handler(move || shutdown.shutdown())?;
//!
//!     server.run()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                        Session Manager                        |
//! |   mio poll loop | fixed slot table | keep-alive expiry        |
//! +---------------------------------------------------------------+
//! |                        Wire Protocol                          |
//! |   10-byte length header | JSON commands | response envelope   |
//! +---------------------------------------------------------------+
//! |                           Motion                              |
//! |   coordinate transforms (abs/rel/polar) | safety bounds       |
//! +---------------------------------------------------------------+
//! |                          Actuation                            |
//! |   Robot trait | StubRobot (logging stand-in)                  |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`server::RobotServer`] | Listener, slot table, and dispatch loop |
//! | [`protocol::FrameCodec`] | Incremental length-prefix frame codec |
//! | [`protocol::Command`] | Parsed wire command, ready for dispatch |
//! | [`motion::Bounds`] | Inclusive safety envelope for move targets |
//! | [`robot::Robot`] | Actuator seam between protocol and hardware |

pub mod config;
pub mod motion;
pub mod protocol;
pub mod robot;
pub mod server;

pub use config::ServerConfig;
pub use motion::{Bounds, CoordinateSystem, Position};
pub use protocol::{Command, CommandError, FrameCodec, Response, ResponseStatus};
pub use robot::{Robot, StubRobot};
pub use server::{RobotServer, ServerError, ShutdownHandle};
