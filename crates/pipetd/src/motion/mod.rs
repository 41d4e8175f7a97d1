// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Coordinate handling: target resolution and the safety envelope.

pub mod bounds;
pub mod transform;

pub use bounds::Bounds;
pub use transform::{CoordinateSystem, Position};
