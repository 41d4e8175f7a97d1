// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Wire protocol: length-prefix framing and the JSON command layer.

pub mod command;
pub mod frame;

pub use command::{Command, CommandError, Response, ResponseStatus};
pub use frame::{FrameCodec, FRAME_HEADER_SIZE};
